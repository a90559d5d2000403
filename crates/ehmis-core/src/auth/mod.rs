//! Authentication state for DHIS2.
//!
//! - `Session`: who is logged in, to which instance, and since when
//! - `CredentialStore`: the password, kept in the OS keychain
//!
//! DHIS2 uses Basic auth on every request, so the session file never holds
//! a secret. Sessions lapse after 8 hours and the user logs in again.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
