use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, LoginFocus, MaternalView, Tab};

use super::styles;
use super::tabs::{coverage, dropout, malaria, maternal, reporting, trends, wash};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Uganda eHMIS";
    let location = format!("  {}", app.org_unit_label());
    let period = match app.reports {
        Some(ref reports) => format!("[p] {} ", reports.period.label()),
        None => format!("[p] {} ", app.period_preset().keyword()),
    };
    let used = title.chars().count() + location.chars().count() + period.chars().count();

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::styled(location, styles::list_item_style()),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used + 2))),
        Span::styled(period, styles::highlight_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        if *tab == app.current_tab {
            spans.push(Span::styled(label, styles::tab_style(true)));
        } else {
            spans.push(Span::styled(label, styles::muted_style()));
        }
    }

    if app.current_tab == Tab::Maternal {
        let views = [
            ("[a]nc", MaternalView::Anc),
            ("[i]ntrapartum", MaternalView::Intrapartum),
            ("p[n]c", MaternalView::Pnc),
        ];
        let main_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let views_width: usize =
            views.iter().map(|(l, _)| l.len()).sum::<usize>() + (views.len() - 1) * 3;
        spans.push(Span::raw(
            " ".repeat((area.width as usize).saturating_sub(main_width + views_width + 2)),
        ));
        for (i, (label, view)) in views.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", styles::muted_style()));
            }
            let style = if app.maternal_view == *view {
                styles::tab_style(true)
            } else {
                styles::muted_style()
            };
            spans.push(Span::styled(*label, style));
        }
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref reports) = app.reports else {
        render_placeholder(frame, app, area);
        return;
    };

    match app.current_tab {
        Tab::Coverage => coverage::render(frame, app, &reports.epi, area),
        Tab::Dropout => dropout::render(frame, app, &reports.epi, area),
        Tab::Maternal => maternal::render(frame, app, reports.maternal(app.maternal_view), area),
        Tab::Wash => wash::render(frame, app, &reports.wash, area),
        Tab::Malaria => malaria::render(frame, app, &reports.malaria, area),
        Tab::Trends => trends::render(frame, app, &reports.epi, area),
        Tab::Reporting => reporting::render(frame, app, &reports.reporting, area),
    }
}

/// Shown until the first report arrives.
fn render_placeholder(frame: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref error) = app.report_error {
        Line::from(Span::styled(format!(" {}", error), styles::error_style()))
    } else if app.loading {
        Line::from(Span::styled(" Loading from DHIS2...", styles::muted_style()))
    } else if app.org_unit.is_none() {
        Line::from(Span::styled(
            " No org unit assigned to this account. Set root_org_unit in the config file.",
            styles::muted_style(),
        ))
    } else {
        Line::from(Span::styled(" Press [u] to load data", styles::muted_style()))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(line).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[u]pdate | [p]eriod | [Bksp] up | [q]uit";

    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else {
        format!(" Updated {} ", app.cache_ages.last_updated())
    };
    let right_text = format!(" {} ", shortcuts);

    let center_text = app
        .session
        .data
        .as_ref()
        .filter(|d| d.needs_refresh() && !d.is_expired())
        .map(|d| format!("Session expires in {} min", d.minutes_until_expiry()))
        .unwrap_or_default();

    let width = area.width as usize;
    let left_len = left_text.chars().count();
    let right_len = right_text.chars().count();
    let center_start = (width.saturating_sub(center_text.len())) / 2;
    let left_pad = center_start.saturating_sub(left_len);
    let right_pad = width
        .saturating_sub(left_len + left_pad + center_text.len())
        .saturating_sub(right_len);

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(left_pad)),
        Span::styled(center_text, styles::highlight_style()),
        Span::raw(" ".repeat(right_pad)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 25, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Uganda eHMIS dashboard", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("1-7", "Switch tabs"),
        help_line("←/→", "Prev/next tab"),
        help_line("↑/↓", "Navigate rows"),
        help_line("PgUp/PgDn", "Scroll a page"),
        help_line("Enter", "Open selected area (Malaria tab)"),
        help_line("Bksp", "Back to the parent org unit"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("p", "Cycle reporting period"),
        help_line("u", "Update data from DHIS2"),
        help_line("L", "Log out and clear cache"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled(" Maternal Tab", styles::highlight_style())),
        help_line("a/i/n", "ANC / intrapartum / PNC"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn field_style(focused: bool) -> Style {
    if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    }
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(50, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Sign in to DHIS2", styles::title_style())),
        Line::from(Span::styled(
            format!("  {}", app.client.base_url()),
            styles::muted_style(),
        )),
        Line::from(""),
    ];

    let username_focused = app.login_focus == LoginFocus::Username;
    let cursor = if username_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("    "),
        Span::styled("Username: [", styles::muted_style()),
        Span::styled(
            format!("{:<20}{}", app.login_username, cursor),
            field_style(username_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let cursor = if password_focused { "▌" } else { "" };
    let masked = "*".repeat(app.login_password.chars().count().min(20));
    lines.push(Line::from(vec![
        Span::raw("    "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{:<20}{}", masked, cursor), field_style(password_focused)),
        Span::styled("]", styles::muted_style()),
    ]));

    let button_focused = app.login_focus == LoginFocus::Button;
    let label = if button_focused { " ▶ Login ◀ " } else { "   Login   " };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("              ["),
        Span::styled(label, field_style(button_focused)),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed_centers() {
        let rect = centered_rect_fixed(40, 10, Rect::new(0, 0, 100, 30));
        assert_eq!(rect, Rect::new(30, 10, 40, 10));
    }

    #[test]
    fn test_centered_rect_fixed_clamps_to_screen() {
        let rect = centered_rect_fixed(80, 40, Rect::new(0, 0, 60, 20));
        assert_eq!(rect, Rect::new(0, 0, 60, 20));
    }
}
