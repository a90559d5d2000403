//! Application configuration management.
//!
//! Configuration lives at `~/.config/ehmis/config.json` and holds the DHIS2
//! instance, the last username, analysis settings and any facility
//! catchment overrides. `DHIS2_BASE_URL` and `DHIS2_TIMEOUT` in the
//! environment take precedence over the file.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analytics::{DEFAULT_HORIZON, DEFAULT_Z_THRESHOLD};
use crate::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::catalog::PopulationRegistry;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "ehmis";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const BASE_URL_ENV: &str = "DHIS2_BASE_URL";
const TIMEOUT_ENV: &str = "DHIS2_TIMEOUT";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_threshold() -> f64 {
    DEFAULT_Z_THRESHOLD
}

fn default_horizon() -> usize {
    DEFAULT_HORIZON
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub last_username: Option<String>,
    /// Org unit opened at startup; defaults to the account's first.
    #[serde(default)]
    pub root_org_unit: Option<String>,
    #[serde(default = "default_threshold")]
    pub outlier_threshold: f64,
    #[serde(default = "default_horizon")]
    pub forecast_horizon: usize,
    /// Facility id to catchment population.
    #[serde(default)]
    pub catchments: HashMap<String, u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            last_username: None,
            root_org_unit: None,
            outlier_threshold: default_threshold(),
            forecast_horizon: default_horizon(),
            catchments: HashMap::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay environment overrides; bad values are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", TIMEOUT_ENV),
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Filesystem-safe name of the DHIS2 instance, e.g. `hmis.health.go.ug_api`.
    pub fn instance_key(&self) -> String {
        self.base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
            .collect()
    }

    /// Per-instance cache directory, so two DHIS2 servers never share data.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(self.instance_key()))
    }

    pub fn population_registry(&self) -> PopulationRegistry {
        PopulationRegistry::with_catchments(self.catchments.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "https://hmis.health.go.ug/api");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.outlier_threshold, 2.0);
        assert_eq!(config.forecast_horizon, 3);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"last_username": "biostat"}"#).unwrap();
        assert_eq!(config.last_username.as_deref(), Some("biostat"));
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            "DHIS2_BASE_URL" => Some(" https://play.dhis2.org/api ".to_string()),
            "DHIS2_TIMEOUT" => Some("90".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://play.dhis2.org/api");
        assert_eq!(config.timeout_secs, 90);

        config.apply_env(|name| (name == "DHIS2_TIMEOUT").then(|| "soon".to_string()));
        assert_eq!(config.timeout_secs, 90);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = Config::default();
        config.catchments.insert("FAC".to_string(), 12_000);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.population_registry().custom_catchment("FAC"), Some(12_000));
    }

    #[test]
    fn test_cache_dir_is_per_instance() {
        let config = Config::default();
        let dir = config.cache_dir().unwrap();
        assert!(dir.ends_with("ehmis/hmis.health.go.ug_api"));

        let mut play = Config::default();
        play.base_url = "https://play.dhis2.org/40.4.0/api/".to_string();
        assert_eq!(play.instance_key(), "play.dhis2.org_40.4.0_api");
    }
}
