//! Per-tab content renderers.

pub mod coverage;
pub mod dropout;
pub mod malaria;
pub mod maternal;
pub mod reporting;
pub mod trends;
pub mod wash;

use ratatui::{
    layout::Constraint,
    widgets::{Block, Borders, Cell, Row, Table},
};

use ehmis_core::catalog::RateScale;
use ehmis_core::models::CellValue;
use ehmis_core::utils::format_cell;

use crate::ui::styles;

/// Bordered block with the standard title styling.
pub(crate) fn panel(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused))
}

/// Table with a title-styled header row and the selection highlight.
pub(crate) fn data_table<'a>(
    header: &[&'a str],
    rows: Vec<Row<'a>>,
    widths: &[Constraint],
    block: Block<'a>,
) -> Table<'a> {
    let header = Row::new(header.iter().map(|h| Cell::from(*h)))
        .style(styles::title_style())
        .height(1);
    Table::new(rows, widths.to_vec())
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style())
}

/// `12.50%`, `3.20 per 1,000` or `N/A`
pub(crate) fn rate_display(cell: CellValue, scale: RateScale) -> String {
    match scale {
        RateScale::Percent => format_cell(cell, "%"),
        _ if cell.is_available() => format!("{} {}", cell, scale.unit()),
        _ => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_display() {
        assert_eq!(rate_display(CellValue::Value(dec!(12.5)), RateScale::Percent), "12.50%");
        assert_eq!(
            rate_display(CellValue::Value(dec!(3.2)), RateScale::PerThousand),
            "3.20 per 1,000"
        );
        assert_eq!(rate_display(CellValue::NotAvailable, RateScale::PerHundredThousand), "N/A");
    }
}
