use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, TableState},
    Frame,
};

use ehmis_core::analytics::ReportingSummary;
use ehmis_core::utils::format_cell;
use ehmis_core::ReportingReport;

use super::{data_table, panel};
use crate::app::App;
use crate::ui::styles;

fn summary_line(summary: &ReportingSummary) -> Line<'static> {
    Line::from(vec![
        Span::styled(" Average ", styles::muted_style()),
        Span::styled(format_cell(summary.average, "%"), styles::highlight_style()),
        Span::styled(
            format!(
                "  {}/{} weeks reported, {} at 90%+, {} below 70%",
                summary.reported_weeks,
                summary.total_weeks,
                summary.weeks_at_or_above_90,
                summary.weeks_below_70
            ),
            styles::muted_style(),
        ),
    ])
}

pub fn render(frame: &mut Frame, app: &App, report: &ReportingReport, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(5)])
        .split(area);

    frame.render_widget(Paragraph::new(summary_line(&report.summary)), chunks[0]);

    let rows: Vec<Row> = report
        .weeks
        .iter()
        .map(|w| {
            Row::new(vec![
                Cell::from(w.week.to_string()),
                Cell::from(w.label.clone()).style(styles::muted_style()),
                Cell::from(format_cell(w.rate, "%")).style(styles::band_style(w.color)),
            ])
        })
        .collect();

    let title = format!(" {} ({}, {}) ", report.indicator, report.org_unit_name, report.period);
    let table = data_table(
        &["Week", "Starting", "Rate"],
        rows,
        &[
            Constraint::Length(10),
            Constraint::Min(20),
            Constraint::Length(10),
        ],
        panel(title, true),
    );

    let mut state = TableState::default();
    state.select(Some(app.selection));
    frame.render_stateful_widget(table, chunks[1], &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ehmis_core::models::CellValue;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_line() {
        let summary = ReportingSummary {
            average: CellValue::Value(dec!(84)),
            reported_weeks: 3,
            total_weeks: 4,
            weeks_at_or_above_90: 2,
            weeks_below_70: 1,
        };
        let text: String = summary_line(&summary)
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(text, " Average 84.00%  3/4 weeks reported, 2 at 90%+, 1 below 70%");
    }
}
