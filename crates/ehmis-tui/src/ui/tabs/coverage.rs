use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, TableState},
    Frame,
};

use ehmis_core::utils::{format_cell, format_count, format_decimal_count, truncate_string};
use ehmis_core::EpiReport;

use super::{data_table, panel};
use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, report: &EpiReport, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);

    render_table(frame, app, report, chunks[0]);
    render_detail(frame, app, report, chunks[1]);
}

fn render_table(frame: &mut Frame, app: &App, report: &EpiReport, area: Rect) {
    let rows: Vec<Row> = report
        .coverage
        .iter()
        .map(|row| {
            let total = &row.total;
            Row::new(vec![
                Cell::from(truncate_string(&row.display_name, 28)),
                Cell::from(format_decimal_count(total.numerator)),
                Cell::from(format_decimal_count(total.denominator)),
                Cell::from(format_cell(total.percentage, "%")).style(styles::band_style(total.color)),
            ])
        })
        .collect();

    let title = format!(
        " EPI coverage ({}, pop. {}) ",
        report.period,
        format_count(report.population)
    );
    let table = data_table(
        &["Indicator", "Doses", "Target", "Coverage"],
        rows,
        &[
            Constraint::Min(20),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
        panel(title, true),
    );

    let mut state = TableState::default();
    state.select(Some(app.selection));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_detail(frame: &mut Frame, app: &App, report: &EpiReport, area: Rect) {
    let Some(row) = report.coverage.get(app.selection) else {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled("No indicator selected", styles::muted_style())))
                .block(panel(" Detail ".to_string(), false)),
            area,
        );
        return;
    };

    let total = &row.total;
    let mut lines = vec![
        Line::from(Span::styled(row.display_name.clone(), styles::title_style())),
        Line::from(Span::styled(total.indicator_code.clone(), styles::muted_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Coverage:   ", styles::highlight_style()),
            Span::styled(format_cell(total.percentage, "%"), styles::band_style(total.color)),
            Span::styled(format!("  ({})", total.color.name()), styles::muted_style()),
        ]),
        Line::from(vec![
            Span::styled("Doses:      ", styles::highlight_style()),
            Span::raw(format_decimal_count(total.numerator)),
        ]),
        Line::from(vec![
            Span::styled("Target pop: ", styles::highlight_style()),
            Span::raw(format_decimal_count(total.denominator)),
        ]),
        Line::from(""),
    ];

    let outliers = row.trend.outliers().count();
    lines.push(Line::from(vec![
        Span::styled("Months:     ", styles::highlight_style()),
        Span::raw(format!("{} with coverage", row.trend.len())),
    ]));
    if outliers > 0 {
        lines.push(Line::from(Span::styled(
            format!("            {} outlier month(s), see Trends", outliers),
            styles::outlier_style(),
        )));
    }

    match row.forecast {
        Some(ref forecast) => {
            let next = forecast
                .points
                .first()
                .map(|p| format!("{:.1}% in {}", p.value, p.period.label()))
                .unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled("Forecast:   ", styles::highlight_style()),
                Span::raw(next),
            ]));
            lines.push(Line::from(Span::styled(
                format!("            slope {:+.2} pts/month", forecast.slope),
                styles::muted_style(),
            )));
        }
        None => lines.push(Line::from(vec![
            Span::styled("Forecast:   ", styles::highlight_style()),
            Span::styled("not enough history", styles::muted_style()),
        ])),
    }

    frame.render_widget(
        Paragraph::new(lines).block(panel(format!(" {} ", row.key), false)),
        area,
    );
}
