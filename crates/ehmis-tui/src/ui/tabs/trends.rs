use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Sparkline},
    Frame,
};

use ehmis_core::pipeline::IndicatorCoverage;
use ehmis_core::utils::truncate_string;
use ehmis_core::EpiReport;

use super::panel;
use crate::app::App;
use crate::ui::styles;

/// Sparkline heights; negative values clamp to zero.
fn spark_values(row: &IndicatorCoverage) -> Vec<u64> {
    row.trend
        .points
        .iter()
        .map(|p| p.value.max(0.0).round() as u64)
        .collect()
}

pub fn render(frame: &mut Frame, app: &App, report: &EpiReport, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(40)])
        .split(area);

    let items: Vec<ListItem> = report
        .coverage
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let outliers = row.trend.outliers().count();
            let marker = if outliers > 0 { " !" } else { "" };
            let style = if i == app.selection {
                styles::selected_style()
            } else if outliers > 0 {
                styles::outlier_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(format!(
                " {}{}",
                truncate_string(&row.display_name, 28),
                marker
            )))
            .style(style)
        })
        .collect();

    let title = format!(" Trends ({} outliers) ", report.outlier_count());
    let list = List::new(items).block(panel(title, true));
    let mut state = ListState::default();
    state.select(Some(app.selection));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    match report.coverage.get(app.selection) {
        Some(row) => render_series(frame, row, chunks[1]),
        None => frame.render_widget(
            Paragraph::new(Span::styled("No indicator selected", styles::muted_style()))
                .block(panel(" Series ".to_string(), false)),
            chunks[1],
        ),
    }
}

fn render_series(frame: &mut Frame, row: &IndicatorCoverage, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(5)])
        .split(area);

    let values = spark_values(row);
    let sparkline = Sparkline::default()
        .block(panel(format!(" {} monthly coverage % ", row.key), false))
        .data(&values)
        .style(styles::success_style());
    frame.render_widget(sparkline, chunks[0]);

    let mut lines = Vec::new();
    for point in &row.trend.points {
        let z = point
            .z_score
            .map(|z| format!("z {:+.2}", z))
            .unwrap_or_else(|| "z -".to_string());
        let (flag, style) = if point.outlier {
            ("  outlier", styles::outlier_style())
        } else {
            ("", styles::list_item_style())
        };
        lines.push(Line::from(vec![
            Span::raw(format!(" {:<10}", point.period.label())),
            Span::styled(format!("{:>8.2}%", point.value), style),
            Span::styled(format!("  {}", z), styles::muted_style()),
            Span::styled(flag, style),
        ]));
    }
    if row.trend.is_empty() {
        lines.push(Line::from(Span::styled(
            " No month has a coverage value",
            styles::muted_style(),
        )));
    }

    if let Some(ref forecast) = row.forecast {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" Forecast", styles::highlight_style())));
        for point in &forecast.points {
            lines.push(Line::from(vec![
                Span::raw(format!(" {:<10}", point.period.label())),
                Span::styled(format!("{:>8.2}%", point.value), styles::muted_style()),
            ]));
        }
    }

    frame.render_widget(
        Paragraph::new(lines).block(panel(format!(" {} ", row.display_name), false)),
        chunks[1],
    );
}
