use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Cell, Row, TableState},
    Frame,
};

use ehmis_core::utils::format_cell;
use ehmis_core::WashReport;

use super::{data_table, panel};
use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, report: &WashReport, area: Rect) {
    let rows: Vec<Row> = report
        .indicators
        .iter()
        .map(|w| {
            Row::new(vec![
                Cell::from(w.display_name.clone()),
                Cell::from(format_cell(w.value, "%")).style(styles::band_style(w.color)),
                Cell::from(format!("{}%", w.target)).style(styles::muted_style()),
                Cell::from(w.reported_months.to_string()),
            ])
        })
        .collect();

    let title = format!(" WASH households ({}, {}) ", report.org_unit_name, report.period);
    let table = data_table(
        &["Indicator", "Value", "Target", "Months"],
        rows,
        &[
            Constraint::Min(30),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
        panel(title, true),
    );

    let mut state = TableState::default();
    state.select(Some(app.selection));
    frame.render_stateful_widget(table, area, &mut state);
}
