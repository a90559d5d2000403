//! Application state management for the eHMIS dashboard.
//!
//! `App` owns the session, the DHIS2 loader and the reports for the org
//! unit and period on screen. Fetching runs in a spawned task and reports
//! back over an mpsc channel; report assembly happens on the UI thread once
//! the inputs arrive.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use ehmis_core::analytics::OutlierConfig;
use ehmis_core::api::{ApiError, DataLoader, Dhis2Client, ReportInputs};
use ehmis_core::auth::{CredentialStore, Session};
use ehmis_core::cache::{CacheAges, CacheManager};
use ehmis_core::catalog::{Category, IndicatorCatalog, PopulationRegistry};
use ehmis_core::models::{OrgUnit, OrgUnitTree};
use ehmis_core::{
    build_burden_report, build_epi_report, build_maternal_report, build_reporting_report,
    build_wash_report, BurdenReport, Config, EpiReport, MaternalReport, PeriodSpec, RelativePeriod,
    ReportingReport, ResolvedPeriod, WashReport,
};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 64;

/// Maximum length for password input.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of rows to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Period presets offered by the `p` key, in cycling order.
pub const PERIOD_PRESETS: [RelativePeriod; 5] = [
    RelativePeriod::Last12Months,
    RelativePeriod::ThisMonth,
    RelativePeriod::LastMonth,
    RelativePeriod::ThisQuarter,
    RelativePeriod::ThisYear,
];

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Coverage,
    Dropout,
    Maternal,
    Wash,
    Malaria,
    Trends,
    Reporting,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Coverage,
        Tab::Dropout,
        Tab::Maternal,
        Tab::Wash,
        Tab::Malaria,
        Tab::Trends,
        Tab::Reporting,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Coverage => "Coverage",
            Tab::Dropout => "Dropout",
            Tab::Maternal => "Maternal",
            Tab::Wash => "WASH",
            Tab::Malaria => "Malaria",
            Tab::Trends => "Trends",
            Tab::Reporting => "033b",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Tab for a `1`-`7` key press
    pub fn from_digit(c: char) -> Option<Self> {
        let index = c.to_digit(10)? as usize;
        index.checked_sub(1).and_then(|i| Self::ALL.get(i)).copied()
    }
}

/// Maternal tab sub-view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaternalView {
    Anc,
    Intrapartum,
    Pnc,
}

impl MaternalView {
    pub fn category(&self) -> Category {
        match self {
            MaternalView::Anc => Category::Anc,
            MaternalView::Intrapartum => Category::Intrapartum,
            MaternalView::Pnc => Category::Pnc,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            MaternalView::Anc => MaternalView::Intrapartum,
            MaternalView::Intrapartum => MaternalView::Pnc,
            MaternalView::Pnc => MaternalView::Anc,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    LoggingIn,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

/// Everything shown for one (org unit, period).
#[derive(Debug, Clone)]
pub struct Reports {
    pub period: ResolvedPeriod,
    pub epi: EpiReport,
    pub maternal: Vec<MaternalReport>,
    pub wash: WashReport,
    pub malaria: BurdenReport,
    pub reporting: ReportingReport,
}

impl Reports {
    pub fn maternal(&self, view: MaternalView) -> Option<&MaternalReport> {
        self.maternal.iter().find(|r| r.category == view.category())
    }
}

/// Assemble every tab's report from fetched inputs.
pub fn build_reports(
    inputs: &ReportInputs,
    registry: &PopulationRegistry,
    config: &Config,
    org_unit: &str,
    period: &ResolvedPeriod,
) -> Result<Reports, ehmis_core::AnalyticsError> {
    let ctx = ehmis_core::ReportContext {
        tree: &inputs.tree,
        registry,
        catalog: IndicatorCatalog::global(),
        outliers: OutlierConfig::epi(config.outlier_threshold),
        horizon: config.forecast_horizon,
    };
    let maternal = [Category::Anc, Category::Intrapartum, Category::Pnc]
        .into_iter()
        .map(|category| build_maternal_report(&ctx, org_unit, period, &inputs.maternal, category))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Reports {
        period: period.clone(),
        epi: build_epi_report(&ctx, org_unit, period, &inputs.epi)?,
        maternal,
        wash: build_wash_report(&ctx, org_unit, period, &inputs.wash)?,
        malaria: build_burden_report(&ctx, org_unit, period, &inputs.malaria_by_child)?,
        reporting: build_reporting_report(&ctx, org_unit, period, &inputs.reporting)?,
    })
}

// ============================================================================
// Background Task Results
// ============================================================================

enum RefreshResult {
    Loaded {
        org_unit: String,
        period: ResolvedPeriod,
        inputs: Box<ReportInputs>,
    },
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: Session,
    pub client: Dhis2Client,
    cache_dir: PathBuf,
    cache: Option<Arc<CacheManager>>,
    loader: Option<DataLoader>,
    pub registry: PopulationRegistry,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub maternal_view: MaternalView,
    pub selection: usize,
    pub period_preset: usize,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Navigation
    pub org_unit: Option<String>,
    org_history: Vec<String>,
    pub tree: OrgUnitTree,

    // Data
    pub reports: Option<Reports>,
    pub report_error: Option<String>,
    pub loading: bool,

    // Background task communication
    refresh_rx: mpsc::Receiver<RefreshResult>,
    refresh_tx: mpsc::Sender<RefreshResult>,

    pub status_message: Option<String>,
    pub cache_ages: CacheAges,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));

        let mut session = Session::new(cache_dir.clone());
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to load session");
        }

        let client = Dhis2Client::new(&config.base_url, config.timeout_secs)?;
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_username = std::env::var("DHIS2_USERNAME")
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();
        let login_password = std::env::var("DHIS2_PASSWORD").unwrap_or_default();
        let registry = config.population_registry();

        Ok(Self {
            config,
            session,
            client,
            cache_dir,
            cache: None,
            loader: None,
            registry,

            state: AppState::Normal,
            current_tab: Tab::Coverage,
            maternal_view: MaternalView::Anc,
            selection: 0,
            period_preset: 0,

            login_username,
            login_password,
            login_focus: LoginFocus::Username,
            login_error: None,

            org_unit: None,
            org_history: Vec::new(),
            tree: OrgUnitTree::new(),

            reports: None,
            report_error: None,
            loading: false,

            refresh_rx: rx,
            refresh_tx: tx,

            status_message: None,
            cache_ages: CacheAges::default(),
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    fn credentials(&self) -> CredentialStore {
        CredentialStore::new(&self.config.instance_key())
    }

    /// Resume a saved session with the password from the keychain.
    pub fn resume_session(&mut self) -> bool {
        let Some(username) = self.session.username().map(str::to_string) else {
            return false;
        };
        match self.credentials().get_password(&username) {
            Ok(password) => match self.connect(&username, &password) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Failed to open cache for saved session");
                    false
                }
            },
            Err(e) => {
                info!(error = %e, "No stored password, login required");
                false
            }
        }
    }

    /// Build the loader for an authenticated user.
    fn connect(&mut self, username: &str, password: &str) -> Result<()> {
        let mut cache = CacheManager::new(self.cache_dir.clone())?;
        cache.unlock(password)?;
        let cache = Arc::new(cache);
        let client = self.client.with_credentials(username, password);
        self.loader = Some(DataLoader::new(client, Arc::clone(&cache)));
        self.cache = Some(cache);

        if self.org_unit.is_none() {
            self.org_unit = self.config.root_org_unit.clone().or_else(|| {
                self.session
                    .data
                    .as_ref()
                    .and_then(|d| d.root_org_unit())
                    .map(str::to_string)
            });
        }
        Ok(())
    }

    pub async fn attempt_login(&mut self) -> Result<()> {
        let username = self.login_username.trim().to_string();
        let password = self.login_password.clone();

        if username.is_empty() || password.is_empty() {
            self.login_error = Some("Username and password required".to_string());
            return Err(anyhow::anyhow!("Username and password required"));
        }
        self.login_error = None;

        match self.client.authenticate(&username, &password).await {
            Ok(session_data) => {
                if let Err(e) = self.credentials().store(&username, &password) {
                    warn!(error = %e, "Failed to store credentials");
                }
                self.config.last_username = Some(username.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.session.update(session_data);
                if let Err(e) = self.session.save() {
                    warn!(error = %e, "Failed to save session");
                }

                self.connect(&username, &password)?;
                self.login_password.clear();
                self.state = AppState::Normal;
                info!("Login successful");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(login_message(&e));
                Err(e)
            }
        }
    }

    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    // =========================================================================
    // Period and navigation
    // =========================================================================

    pub fn period_preset(&self) -> RelativePeriod {
        PERIOD_PRESETS[self.period_preset % PERIOD_PRESETS.len()]
    }

    pub fn period_spec(&self, today: NaiveDate) -> PeriodSpec {
        self.period_preset().resolve(today)
    }

    pub fn cycle_period(&mut self) {
        self.period_preset = (self.period_preset + 1) % PERIOD_PRESETS.len();
    }

    pub fn current_unit(&self) -> Option<&OrgUnit> {
        self.org_unit.as_deref().and_then(|id| self.tree.get(id).ok())
    }

    pub fn org_unit_label(&self) -> String {
        match self.org_unit.as_deref() {
            Some(id) => self.tree.path_display(id),
            None => "No org unit".to_string(),
        }
    }

    /// Children of the org unit on screen, sorted by name.
    pub fn children(&self) -> Vec<&OrgUnit> {
        self.org_unit
            .as_deref()
            .map(|id| self.tree.children(id))
            .unwrap_or_default()
    }

    /// Open `child` and remember where we came from.
    pub async fn drill_down(&mut self, child: String) {
        if let Some(current) = self.org_unit.replace(child) {
            self.org_history.push(current);
        }
        self.selection = 0;
        self.refresh().await;
    }

    /// Return to the previous org unit, or the parent when there is no history.
    pub async fn drill_up(&mut self) {
        let parent = self
            .org_history
            .pop()
            .or_else(|| self.current_unit().and_then(|u| u.parent.clone()));
        if let Some(parent) = parent {
            self.org_unit = Some(parent);
            self.selection = 0;
            self.refresh().await;
        }
    }

    /// Number of selectable rows on the current tab.
    pub fn row_count(&self) -> usize {
        let Some(ref reports) = self.reports else {
            return 0;
        };
        match self.current_tab {
            Tab::Coverage | Tab::Trends => reports.epi.coverage.len(),
            Tab::Dropout => reports.epi.dropouts.len(),
            Tab::Maternal => reports
                .maternal(self.maternal_view)
                .map(|r| r.quarters.len())
                .unwrap_or(0),
            Tab::Wash => reports.wash.indicators.len(),
            Tab::Malaria => reports.malaria.entries.len(),
            Tab::Reporting => reports.reporting.weeks.len(),
        }
    }

    pub fn select_next(&mut self, step: usize) {
        let count = self.row_count();
        if count > 0 {
            self.selection = (self.selection + step).min(count - 1);
        }
    }

    pub fn select_prev(&mut self, step: usize) {
        self.selection = self.selection.saturating_sub(step);
    }

    // =========================================================================
    // Background Data Refresh
    // =========================================================================

    /// Fetch the current view in the background.
    pub async fn refresh(&mut self) {
        let (Some(loader), Some(org_unit)) = (self.loader.clone(), self.org_unit.clone()) else {
            warn!("Refresh requested without a session or org unit");
            return;
        };
        let period = match self.period_spec(Local::now().date_naive()).resolve() {
            Ok(period) => period,
            Err(e) => {
                self.status_message = Some(e.to_string());
                return;
            }
        };

        let tx = self.refresh_tx.clone();
        self.loading = true;
        self.status_message = Some(format!("Loading {}...", period.label()));
        info!(org_unit = %org_unit, period = %period.label(), "Starting background refresh");

        tokio::spawn(async move {
            let result = match loader.load_report_inputs(&org_unit, &period).await {
                Ok(inputs) => RefreshResult::Loaded {
                    org_unit,
                    period,
                    inputs: Box::new(inputs),
                },
                Err(e) => {
                    error!(error = %e, "Background refresh failed");
                    RefreshResult::Error(format!("{:#}", e))
                }
            };
            if let Err(e) = tx.send(result).await {
                error!(error = %e, "Failed to send refresh result - channel closed");
            }
        });
    }

    pub async fn check_background_tasks(&mut self) {
        while let Ok(result) = self.refresh_rx.try_recv() {
            self.process_refresh_result(result);
        }
    }

    fn process_refresh_result(&mut self, result: RefreshResult) {
        self.loading = false;
        match result {
            RefreshResult::Loaded {
                org_unit,
                period,
                inputs,
            } => {
                // A slower request for a unit we have since left
                if self.org_unit.as_deref() != Some(org_unit.as_str()) {
                    return;
                }
                self.tree.extend(inputs.tree.units().cloned());
                match build_reports(&inputs, &self.registry, &self.config, &org_unit, &period) {
                    Ok(reports) => {
                        self.reports = Some(reports);
                        self.report_error = None;
                        self.status_message = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to build reports");
                        self.report_error = Some(e.to_string());
                        self.status_message = None;
                    }
                }
                self.selection = self.selection.min(self.row_count().saturating_sub(1));
                if let Some(ref cache) = self.cache {
                    let key = CacheManager::analytics_key(&org_unit, &period, "epi");
                    self.cache_ages = cache.get_cache_ages(&org_unit, &key);
                }
            }
            RefreshResult::Error(message) => {
                if message.contains("Invalid username or password") {
                    self.start_login();
                }
                self.status_message = Some(message);
            }
        }
    }

    /// Forget the session, stored password and cache.
    pub fn logout(&mut self) {
        if let Some(username) = self.session.username().map(str::to_string) {
            if let Err(e) = self.credentials().delete(&username) {
                warn!(error = %e, "Failed to delete stored credentials");
            }
        }
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        if let Err(e) = CacheManager::new(self.cache_dir.clone()).and_then(|mut c| c.clear()) {
            warn!(error = %e, "Failed to clear cache");
        }
        self.cache = None;
        self.loader = None;
        self.reports = None;
        self.org_unit = None;
        self.org_history.clear();
        self.start_login();
    }
}

/// Short, user-facing wording for a login failure.
fn login_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ApiError>() {
        Some(ApiError::Unauthorized) => "Invalid username or password".to_string(),
        Some(ApiError::NetworkError(inner)) if inner.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        Some(ApiError::NetworkError(_)) => {
            "Unable to reach DHIS2. Check your internet connection.".to_string()
        }
        _ => format!("Login failed: {}", e),
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ehmis_core::models::OrgUnitLevel;

    #[test]
    fn test_tab_next() {
        assert_eq!(Tab::Coverage.next(), Tab::Dropout);
        assert_eq!(Tab::Malaria.next(), Tab::Trends);
        assert_eq!(Tab::Trends.next(), Tab::Reporting);
        assert_eq!(Tab::Reporting.next(), Tab::Coverage);
    }

    #[test]
    fn test_tab_prev() {
        assert_eq!(Tab::Coverage.prev(), Tab::Reporting);
        assert_eq!(Tab::Wash.prev(), Tab::Maternal);
    }

    #[test]
    fn test_tab_from_digit() {
        assert_eq!(Tab::from_digit('1'), Some(Tab::Coverage));
        assert_eq!(Tab::from_digit('6'), Some(Tab::Trends));
        assert_eq!(Tab::from_digit('0'), None);
        assert_eq!(Tab::from_digit('7'), Some(Tab::Reporting));
        assert_eq!(Tab::from_digit('8'), None);
        assert_eq!(Tab::from_digit('x'), None);
    }

    #[test]
    fn test_maternal_view_cycle() {
        assert_eq!(MaternalView::Anc.next(), MaternalView::Intrapartum);
        assert_eq!(MaternalView::Pnc.next(), MaternalView::Anc);
        assert_eq!(MaternalView::Pnc.category(), Category::Pnc);
    }

    #[test]
    fn test_can_add_username_char() {
        assert!(can_add_username_char(0, 'a'));
        assert!(!can_add_username_char(MAX_USERNAME_LENGTH, 'a'));
        assert!(!can_add_username_char(0, '\n'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(10, '!'));
        assert!(!can_add_password_char(MAX_PASSWORD_LENGTH, 'a'));
        assert!(!can_add_password_char(0, '\t'));
    }

    #[test]
    fn test_build_reports_for_district() {
        let mut inputs = ReportInputs::default();
        inputs.tree.extend([
            OrgUnit::new("ACH", "Acholi Region", OrgUnitLevel::Region, None),
            OrgUnit::new("GUL", "Gulu District", OrgUnitLevel::District, Some("ACH")),
            OrgUnit::new("BUN", "Bungatira Subcounty", OrgUnitLevel::SubCounty, Some("GUL")),
        ]);
        let period = PeriodSpec::Year { year: 2024 }.resolve().unwrap();
        let reports = build_reports(
            &inputs,
            &PopulationRegistry::new(),
            &Config::default(),
            "GUL",
            &period,
        )
        .unwrap();

        assert_eq!(reports.epi.population, 135_373);
        assert_eq!(reports.maternal.len(), 3);
        assert_eq!(reports.maternal(MaternalView::Pnc).map(|r| r.quarters.len()), Some(4));
        assert_eq!(reports.malaria.entries.len(), 1);
        assert_eq!(reports.wash.indicators.len(), 5);
        // Every Monday of 2024, the last one opening 2025W1
        assert_eq!(reports.reporting.weeks.len(), 53);
        assert_eq!(reports.reporting.summary.reported_weeks, 0);
    }

    #[test]
    fn test_build_reports_rejects_unknown_unit() {
        let period = PeriodSpec::Year { year: 2024 }.resolve().unwrap();
        let result = build_reports(
            &ReportInputs::default(),
            &PopulationRegistry::new(),
            &Config::default(),
            "NOPE",
            &period,
        );
        assert!(result.is_err());
    }
}
