//! eHMIS TUI - a terminal dashboard over Uganda's DHIS2 instance.
//!
//! Shows EPI coverage and dropout, maternal indicators, WASH household
//! figures, malaria burden and monthly trends for any org unit the account
//! can see. `--export` prints the reports as JSON instead.

mod app;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ehmis_core::api::{DataLoader, Dhis2Client};
use ehmis_core::auth::CredentialStore;
use ehmis_core::cache::CacheManager;
use ehmis_core::{
    BurdenReport, Config, EpiReport, MaternalReport, PeriodSpec, ReportingReport, WashReport,
};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file written under the instance cache directory while the TUI runs
const LOG_FILE_NAME: &str = "ehmis.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr; used by `--export` where the terminal is not taken over.
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Log to a file so output does not tear the alternate screen. The guard
/// must live until exit to flush buffered lines.
fn init_file_tracing(config: &Config) -> Option<WorkerGuard> {
    let log_dir = config.cache_dir().ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Some(guard)
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config ({:#}), using defaults", e);
        Config::default()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--export" {
        init_stderr_tracing();
        let (Some(org_unit), Some(period)) = (args.get(2), args.get(3)) else {
            anyhow::bail!("Usage: ehmis --export <org_unit_id> <period>");
        };
        return export_reports(load_config(), org_unit, period).await;
    }

    let config = load_config();
    let _guard = init_file_tracing(&config);
    info!("eHMIS TUI starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = match App::new(config) {
        Ok(mut app) => {
            if app.session.is_valid() && app.resume_session() {
                app.refresh().await;
            } else {
                app.start_login();
            }
            run_app(&mut terminal, &mut app).await
        }
        Err(e) => Err(e),
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
    }

    info!("eHMIS TUI shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        app.check_background_tasks().await;

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// Export mode
// ============================================================================

#[derive(Serialize)]
struct ExportBundle {
    period: String,
    epi: EpiReport,
    maternal: Vec<MaternalReport>,
    wash: WashReport,
    malaria: BurdenReport,
    reporting: ReportingReport,
}

/// Username and password from the environment, then the keychain, then a
/// prompt.
fn export_credentials(config: &Config) -> Result<(String, String)> {
    let username = std::env::var("DHIS2_USERNAME")
        .ok()
        .or_else(|| config.last_username.clone())
        .context("Set DHIS2_USERNAME or log in through the TUI first")?;

    if let Ok(password) = std::env::var("DHIS2_PASSWORD") {
        return Ok((username, password));
    }
    if let Ok(password) = CredentialStore::new(&config.instance_key()).get_password(&username) {
        return Ok((username, password));
    }
    let password = rpassword::prompt_password(format!("DHIS2 password for {}: ", username))
        .context("Failed to read password")?;
    Ok((username, password))
}

/// Fetch one org unit and period and print every report as JSON.
async fn export_reports(config: Config, org_unit: &str, period: &str) -> Result<()> {
    let spec = PeriodSpec::parse(period, Local::now().date_naive())?;
    let period = spec.resolve()?;

    let (username, password) = export_credentials(&config)?;
    let client = Dhis2Client::new(&config.base_url, config.timeout_secs)?;
    client
        .authenticate(&username, &password)
        .await
        .context("DHIS2 login failed")?;

    let mut cache = CacheManager::new(config.cache_dir()?)?;
    cache.unlock(&password)?;
    let loader = DataLoader::new(client.with_credentials(&username, &password), Arc::new(cache));

    eprintln!("Fetching {} for {}...", period.label(), org_unit);
    let inputs = loader.load_report_inputs(org_unit, &period).await?;
    let registry = config.population_registry();
    let reports = app::build_reports(&inputs, &registry, &config, org_unit, &period)?;

    let bundle = ExportBundle {
        period: reports.period.label(),
        epi: reports.epi,
        maternal: reports.maternal,
        wash: reports.wash,
        malaria: reports.malaria,
        reporting: reports.reporting,
    };
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}
