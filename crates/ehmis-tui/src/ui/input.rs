//! Keyboard input handling for the TUI.
//!
//! Overlay states (login, help, quit confirmation) take every key first;
//! otherwise keys drive tab switching, row selection, period cycling and
//! org unit drill-down.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use tracing::debug;

use crate::app::{
    can_add_password_char, can_add_username_char, App, AppState, LoginFocus, MaternalView, Tab,
    PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if matches!(app.state, AppState::LoggingIn) {
        return handle_login_input(app, key).await;
    }

    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('u') => app.refresh().await,
        KeyCode::Char('p') => {
            app.cycle_period();
            app.refresh().await;
        }
        KeyCode::Char('L') => app.logout(),

        KeyCode::Char(c @ '1'..='7') => {
            if let Some(tab) = Tab::from_digit(c) {
                switch_tab(app, tab);
            }
        }
        KeyCode::Right => switch_tab(app, app.current_tab.next()),
        KeyCode::Left => switch_tab(app, app.current_tab.prev()),

        KeyCode::Char('a') if app.current_tab == Tab::Maternal => {
            set_maternal_view(app, MaternalView::Anc)
        }
        KeyCode::Char('i') if app.current_tab == Tab::Maternal => {
            set_maternal_view(app, MaternalView::Intrapartum)
        }
        KeyCode::Char('n') if app.current_tab == Tab::Maternal => {
            set_maternal_view(app, MaternalView::Pnc)
        }
        KeyCode::Tab if app.current_tab == Tab::Maternal => {
            set_maternal_view(app, app.maternal_view.next())
        }

        KeyCode::Down | KeyCode::Char('j') => app.select_next(1),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(1),
        KeyCode::PageDown => app.select_next(PAGE_SCROLL_SIZE),
        KeyCode::PageUp => app.select_prev(PAGE_SCROLL_SIZE),
        KeyCode::Home => app.selection = 0,
        KeyCode::End => app.select_next(usize::MAX / 2),

        KeyCode::Enter if app.current_tab == Tab::Malaria => {
            let child = app
                .reports
                .as_ref()
                .and_then(|r| r.malaria.entries.get(app.selection))
                .map(|e| e.org_unit.clone());
            if let Some(child) = child {
                debug!(org_unit = %child, "Drilling down");
                app.drill_down(child).await;
            }
        }
        KeyCode::Backspace | KeyCode::Esc => app.drill_up().await,
        _ => {}
    }

    Ok(false)
}

fn switch_tab(app: &mut App, tab: Tab) {
    if app.current_tab != tab {
        app.current_tab = tab;
        app.selection = 0;
    }
}

fn set_maternal_view(app: &mut App, view: MaternalView) {
    app.maternal_view = view;
    app.selection = 0;
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => {
                if app.attempt_login().await.is_ok() {
                    app.refresh().await;
                }
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}
