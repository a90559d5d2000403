use ratatui::style::{Color, Modifier, Style};

use ehmis_core::analytics::BurdenClass;
use ehmis_core::models::{ColorCategory, DropoutStatus};

// Color palette
pub const PRIMARY: Color = Color::Rgb(64, 128, 192);
pub const SECONDARY: Color = Color::Rgb(96, 160, 96);
pub const ACCENT: Color = Color::Rgb(192, 160, 64);
pub const ERROR: Color = Color::Rgb(192, 64, 64);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const HIGHLIGHT: Color = Color::Rgb(48, 48, 64);

// Indicator bands
pub const BAND_GREEN: Color = Color::Rgb(76, 175, 80);
pub const BAND_YELLOW: Color = Color::Rgb(230, 190, 50);
pub const BAND_RED: Color = Color::Rgb(220, 70, 60);
pub const BAND_BLUE: Color = Color::Rgb(70, 140, 230);

// Styles
pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn success_style() -> Style {
    Style::default().fg(SECONDARY)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(PRIMARY)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}

// Indicator colours

pub fn band_color(category: ColorCategory) -> Color {
    match category {
        ColorCategory::Green => BAND_GREEN,
        ColorCategory::Yellow => BAND_YELLOW,
        ColorCategory::Red => BAND_RED,
        ColorCategory::Blue => BAND_BLUE,
        ColorCategory::Gray => MUTED,
    }
}

/// Foreground for a value cell in its band
pub fn band_style(category: ColorCategory) -> Style {
    let style = Style::default().fg(band_color(category));
    if category == ColorCategory::Red {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

pub fn dropout_style(status: DropoutStatus) -> Style {
    match status {
        DropoutStatus::Acceptable => Style::default().fg(BAND_GREEN),
        DropoutStatus::High => Style::default().fg(BAND_RED).add_modifier(Modifier::BOLD),
        DropoutStatus::Negative => Style::default().fg(BAND_YELLOW),
        DropoutStatus::NotAvailable => muted_style(),
    }
}

/// Darker red for each step up in malaria burden
pub fn burden_style(class: BurdenClass) -> Style {
    match class {
        BurdenClass::Q1 | BurdenClass::BelowMedian => Style::default().fg(BAND_GREEN),
        BurdenClass::Q2 => Style::default().fg(BAND_YELLOW),
        BurdenClass::Q3 => Style::default().fg(Color::Rgb(230, 130, 50)),
        BurdenClass::Q4 | BurdenClass::AboveMedian => {
            Style::default().fg(BAND_RED).add_modifier(Modifier::BOLD)
        }
        BurdenClass::NoData => muted_style(),
    }
}

pub fn outlier_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_colors_are_distinct() {
        let colors = [
            band_color(ColorCategory::Green),
            band_color(ColorCategory::Yellow),
            band_color(ColorCategory::Red),
            band_color(ColorCategory::Blue),
            band_color(ColorCategory::Gray),
        ];
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_not_available_is_muted() {
        assert_eq!(band_color(ColorCategory::Gray), MUTED);
        assert_eq!(dropout_style(DropoutStatus::NotAvailable), muted_style());
        assert_eq!(burden_style(BurdenClass::NoData), muted_style());
    }

    #[test]
    fn test_red_band_is_bold() {
        assert!(band_style(ColorCategory::Red).add_modifier.contains(Modifier::BOLD));
        assert!(!band_style(ColorCategory::Green).add_modifier.contains(Modifier::BOLD));
    }
}
