use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Sessions last one working day.
const SESSION_LIFETIME_HOURS: i64 = 8;

/// Warn the user this long before the session lapses.
const SESSION_WARNING_MINUTES: i64 = 15;

/// The logged-in DHIS2 user, as reported by `/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub username: String,
    pub user_id: String,
    pub display_name: String,
    pub base_url: String,
    /// Org units the account is assigned to; the first is the default root.
    pub org_units: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(SESSION_LIFETIME_HOURS)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// True once the session is inside its final warning window
    pub fn needs_refresh(&self) -> bool {
        Utc::now() > self.expires_at() - Duration::minutes(SESSION_WARNING_MINUTES)
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at() - Utc::now()
    }

    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }

    pub fn root_org_unit(&self) -> Option<&str> {
        self.org_units.first().map(String::as_str)
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir, data: None }
    }

    /// Load session from disk. Returns false when absent or expired.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData = serde_json::from_str(&contents).context("Failed to parse session file")?;

        if data.is_expired() {
            debug!(username = %data.username, "Stored session expired");
            return Ok(false);
        }
        self.data = Some(data);
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    pub fn username(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.username.as_str())
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn data(created_at: DateTime<Utc>) -> SessionData {
        SessionData {
            username: "dhis_user".to_string(),
            user_id: "xE7jOejl9FI".to_string(),
            display_name: "District Biostatistician".to_string(),
            base_url: "https://hmis.health.go.ug/api".to_string(),
            org_units: vec!["akV6429SUqu".to_string()],
            created_at,
        }
    }

    #[test]
    fn test_expiry_windows() {
        let fresh = data(Utc::now());
        assert!(!fresh.is_expired());
        assert!(!fresh.needs_refresh());
        assert!(fresh.minutes_until_expiry() > 470);

        let closing = data(Utc::now() - Duration::hours(8) + Duration::minutes(10));
        assert!(!closing.is_expired());
        assert!(closing.needs_refresh());

        let stale = data(Utc::now() - Duration::hours(9));
        assert!(stale.is_expired());
        assert_eq!(stale.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(data(Utc::now()));
        session.save().unwrap();

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.username(), Some("dhis_user"));
        assert_eq!(reloaded.data.as_ref().and_then(|d| d.root_org_unit()), Some("akV6429SUqu"));

        reloaded.clear().unwrap();
        assert!(!reloaded.is_valid());
        assert!(!Session::new(dir.path().to_path_buf()).load().unwrap());
    }

    #[test]
    fn test_expired_session_is_not_loaded() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(data(Utc::now() - Duration::hours(9)));
        session.save().unwrap();

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(!reloaded.load().unwrap());
        assert!(reloaded.data.is_none());
    }
}
