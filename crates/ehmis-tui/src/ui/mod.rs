//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, status bar and overlays
//! - `input`: keyboard handling
//! - `styles`: palette and indicator colour mapping
//! - `tabs`: one renderer per dashboard tab

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
