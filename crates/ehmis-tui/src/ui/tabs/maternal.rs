use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use ehmis_core::catalog::{IndicatorCatalog, RateScale};
use ehmis_core::utils::{format_cell, format_count, format_decimal_count, truncate_string};
use ehmis_core::MaternalReport;

use super::{panel, rate_display};
use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, report: Option<&MaternalReport>, area: Rect) {
    let Some(report) = report else {
        frame.render_widget(
            Paragraph::new(Span::styled("No maternal data", styles::muted_style()))
                .block(panel(" Maternal ".to_string(), false)),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(40)])
        .split(area);

    render_quarters(frame, app, report, chunks[0]);
    render_quarter_detail(frame, app, report, chunks[1]);
}

fn render_quarters(frame: &mut Frame, app: &App, report: &MaternalReport, area: Rect) {
    let items: Vec<ListItem> = report
        .quarters
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let style = if i == app.selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(format!(" {}", q.label))).style(style)
        })
        .collect();

    let title = format!(" {} ({}) ", report.category.name(), report.quarters.len());
    let list = List::new(items).block(panel(title, true));

    let mut state = ListState::default();
    state.select(Some(app.selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_quarter_detail(frame: &mut Frame, app: &App, report: &MaternalReport, area: Rect) {
    let Some(quarter) = report.quarters.get(app.selection) else {
        frame.render_widget(
            Paragraph::new(Span::styled("No quarter selected", styles::muted_style()))
                .block(panel(" Detail ".to_string(), false)),
            area,
        );
        return;
    };

    let mut lines = vec![Line::from(Span::styled(
        format!(
            "Population {}, annual target / {}",
            format_count(report.population),
            quarter.divisor
        ),
        styles::muted_style(),
    ))];

    if !quarter.coverage.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Coverage", styles::highlight_style())));
        for c in &quarter.coverage {
            lines.push(Line::from(vec![
                Span::raw(format!("  {:<34}", truncate_string(&c.display_name, 34))),
                Span::raw(format!("{:>9}  ", format_decimal_count(c.count))),
                Span::styled(format!("{:>8}", format_cell(c.percentage, "%")), styles::band_style(c.color)),
                Span::styled(format!("  target {}%", c.target), styles::muted_style()),
            ]));
        }
    }

    if !quarter.rates.is_empty() {
        let catalog = IndicatorCatalog::global();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Rates", styles::highlight_style())));
        for r in &quarter.rates {
            let scale = catalog
                .rate(&r.key)
                .map(|d| d.scale)
                .unwrap_or(RateScale::Percent);
            lines.push(Line::from(vec![
                Span::raw(format!("  {:<34}", truncate_string(&r.display_name, 34))),
                Span::raw(format!(
                    "{:>9}/{:<9}",
                    format_decimal_count(r.numerator),
                    format_decimal_count(r.denominator)
                )),
                Span::styled(format!("{:>16}", rate_display(r.value, scale)), styles::band_style(r.color)),
            ]));
        }
    }

    frame.render_widget(
        Paragraph::new(lines).block(panel(format!(" {} ", quarter.label), false)),
        area,
    );
}
