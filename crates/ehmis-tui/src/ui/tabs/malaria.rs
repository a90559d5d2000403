use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, TableState},
    Frame,
};

use ehmis_core::analytics::BurdenThresholds;
use ehmis_core::utils::{format_cell, format_count, format_decimal_count, truncate_string};
use ehmis_core::BurdenReport;

use super::{data_table, panel};
use crate::app::App;
use crate::ui::styles;

fn thresholds_line(thresholds: &BurdenThresholds) -> String {
    match thresholds {
        BurdenThresholds::Quartiles { q25, q50, q75 } => {
            format!(" Quartiles per 1,000: Q1 ≤ {:.2}, Q2 ≤ {:.2}, Q3 ≤ {:.2}", q25, q50, q75)
        }
        BurdenThresholds::Median { median } => {
            format!(" Too few areas for quartiles; median {:.2} per 1,000", median)
        }
        BurdenThresholds::None => " No area has both cases and a population".to_string(),
    }
}

pub fn render(frame: &mut Frame, app: &App, report: &BurdenReport, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(5)])
        .split(area);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            thresholds_line(&report.thresholds),
            styles::muted_style(),
        ))),
        chunks[0],
    );

    let rows: Vec<Row> = report
        .entries
        .iter()
        .map(|e| {
            let population = e
                .population
                .map(format_count)
                .unwrap_or_else(|| "N/A".to_string());
            Row::new(vec![
                Cell::from(truncate_string(&e.name, 30)),
                Cell::from(format_decimal_count(e.cases)),
                Cell::from(population),
                Cell::from(format_cell(e.incidence, "")),
                Cell::from(e.class.label()).style(styles::burden_style(e.class)),
            ])
        })
        .collect();

    let title = format!(
        " Malaria burden under {} ({}) [Enter] open ",
        app.current_unit().map(|u| u.name.as_str()).unwrap_or(&report.parent),
        report.period
    );
    let table = data_table(
        &["Area", "Cases", "Population", "Per 1,000", "Burden"],
        rows,
        &[
            Constraint::Min(20),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(16),
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

    #[test]
    fn test_thresholds_line() {
        let line = thresholds_line(&BurdenThresholds::Quartiles { q25: 1.75, q50: 2.5, q75: 3.25 });
        assert!(line.contains("Q1 ≤ 1.75"));
        assert!(line.contains("Q3 ≤ 3.25"));
        assert!(thresholds_line(&BurdenThresholds::Median { median: 2.0 }).contains("median 2.00"));
    }
}
