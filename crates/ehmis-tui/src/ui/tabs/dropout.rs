use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Cell, Row, TableState},
    Frame,
};

use ehmis_core::models::DropoutStatus;
use ehmis_core::utils::{format_cell, format_decimal_count};
use ehmis_core::EpiReport;

use super::{data_table, panel};
use crate::app::App;
use crate::ui::styles;

fn status_label(status: DropoutStatus) -> &'static str {
    match status {
        DropoutStatus::Acceptable => "OK",
        DropoutStatus::High => "High",
        DropoutStatus::Negative => "Negative (check data)",
        DropoutStatus::NotAvailable => "N/A",
    }
}

pub fn render(frame: &mut Frame, app: &App, report: &EpiReport, area: Rect) {
    let rows: Vec<Row> = report
        .dropouts
        .iter()
        .map(|d| {
            let style = styles::dropout_style(d.status);
            Row::new(vec![
                Cell::from(d.label.clone()),
                Cell::from(format_decimal_count(d.first_count)),
                Cell::from(format_decimal_count(d.last_count)),
                Cell::from(format_cell(d.percentage, "%")).style(style),
                Cell::from(status_label(d.status)).style(style),
            ])
        })
        .collect();

    let high = report
        .dropouts
        .iter()
        .filter(|d| d.status == DropoutStatus::High)
        .count();
    let title = format!(" Dropout rates ({}, {} above 10%) ", report.period, high);

    let table = data_table(
        &["Series", "First dose", "Last dose", "Dropout", "Status"],
        rows,
        &[
            Constraint::Min(18),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(22),
        ],
        panel(title, true),
    );

    let mut state = TableState::default();
    state.select(Some(app.selection));
    frame.render_stateful_widget(table, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(DropoutStatus::High), "High");
        assert_eq!(status_label(DropoutStatus::NotAvailable), "N/A");
    }
}
