use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::api::{DataElement, IndicatorRef};
use crate::models::{OrgUnit, RawCounts};
use crate::period::{MonthBucket, ResolvedPeriod, WeekBucket};

use super::crypto::CacheCipher;

/// What a cache entry holds; each kind goes stale on its own schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    OrgUnits,
    DataElements,
    Analytics,
    Search,
}

impl CacheKind {
    /// Minutes before an entry of this kind is refetched.
    pub fn ttl_minutes(&self) -> i64 {
        match self {
            CacheKind::OrgUnits => 60,
            CacheKind::DataElements => 60,
            CacheKind::Analytics => 5,
            CacheKind::Search => 10,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            CacheKind::OrgUnits => "org_unit",
            CacheKind::DataElements => "data_elements",
            CacheKind::Analytics => "analytics",
            CacheKind::Search => "search",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Includes clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self, kind: CacheKind) -> bool {
        self.age_minutes() >= kind.ttl_minutes()
    }
}

/// File name safe form of a cache key.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

pub struct CacheManager {
    cache_dir: PathBuf,
    cipher: Option<CacheCipher>,
}

impl CacheManager {
    /// A plaintext cache; call [`CacheManager::unlock`] to encrypt entries.
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            cipher: None,
        })
    }

    /// Derive the cache key from the user's password.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        let salt = CacheCipher::load_or_create_salt(&self.cache_dir)?;
        self.cipher = Some(CacheCipher::from_password(password, &salt)?);
        Ok(())
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    fn cache_path(&self, kind: CacheKind, key: &str) -> PathBuf {
        let extension = if self.cipher.is_some() { "bin" } else { "json" };
        self.cache_dir
            .join(format!("{}_{}.{}", kind.prefix(), sanitize_key(key), extension))
    }

    fn load<T: DeserializeOwned>(&self, kind: CacheKind, key: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(kind, key);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&path).with_context(|| format!("Failed to read cache file: {}", key))?;
        let plaintext = match self.cipher {
            Some(ref cipher) => cipher.decrypt(&bytes)?,
            None => bytes,
        };
        let cached: CachedData<T> = serde_json::from_slice(&plaintext)
            .with_context(|| format!("Failed to parse cache file: {}", key))?;
        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, kind: CacheKind, key: &str, data: &T) -> Result<()> {
        let contents = serde_json::to_vec(&CachedData::new(data))?;
        let bytes = match self.cipher {
            Some(ref cipher) => cipher.encrypt(&contents)?,
            None => contents,
        };
        std::fs::write(self.cache_path(kind, key), bytes)?;
        Ok(())
    }

    /// A fresh entry, or None when it is missing, stale or unreadable.
    fn load_fresh<T: DeserializeOwned>(&self, kind: CacheKind, key: &str) -> Option<T> {
        match self.load::<T>(kind, key) {
            Ok(Some(cached)) if !cached.is_stale(kind) => Some(cached.data),
            Ok(_) => None,
            Err(e) => {
                debug!(cache = key, error = %e, "Treating unreadable cache entry as a miss");
                None
            }
        }
    }

    // ===== Org units =====

    pub fn load_org_unit(&self, id: &str) -> Option<Vec<OrgUnit>> {
        self.load_fresh(CacheKind::OrgUnits, id)
    }

    pub fn save_org_unit(&self, id: &str, units: &[OrgUnit]) -> Result<()> {
        self.save(CacheKind::OrgUnits, id, &units)
    }

    // ===== Data elements =====

    pub fn load_data_elements(&self, pattern: &str) -> Option<Vec<DataElement>> {
        self.load_fresh(CacheKind::DataElements, pattern)
    }

    pub fn save_data_elements(&self, pattern: &str, elements: &[DataElement]) -> Result<()> {
        self.save(CacheKind::DataElements, pattern, &elements)
    }

    // ===== Indicator search =====

    pub fn load_search(&self, pattern: &str) -> Option<Vec<IndicatorRef>> {
        self.load_fresh(CacheKind::Search, pattern)
    }

    pub fn save_search(&self, pattern: &str, results: &[IndicatorRef]) -> Result<()> {
        self.save(CacheKind::Search, pattern, &results)
    }

    // ===== Analytics =====

    pub fn analytics_key(org_unit: &str, period: &ResolvedPeriod, group: &str) -> String {
        let bound = |b: Option<MonthBucket>| b.map(|m| m.to_string()).unwrap_or_default();
        format!("{}_{}-{}_{}", org_unit, bound(period.first()), bound(period.last()), group)
    }

    pub fn load_counts(&self, key: &str) -> Option<RawCounts> {
        self.load_fresh(CacheKind::Analytics, key)
    }

    pub fn save_counts(&self, key: &str, counts: &RawCounts) -> Result<()> {
        self.save(CacheKind::Analytics, key, counts)
    }

    pub fn load_totals(&self, key: &str) -> Option<HashMap<String, Decimal>> {
        self.load_fresh(CacheKind::Analytics, key)
    }

    pub fn save_totals(&self, key: &str, totals: &HashMap<String, Decimal>) -> Result<()> {
        self.save(CacheKind::Analytics, key, totals)
    }

    pub fn load_weekly(&self, key: &str) -> Option<BTreeMap<WeekBucket, Decimal>> {
        self.load_fresh(CacheKind::Analytics, key)
    }

    pub fn save_weekly(&self, key: &str, values: &BTreeMap<WeekBucket, Decimal>) -> Result<()> {
        self.save(CacheKind::Analytics, key, values)
    }

    // ===== Cache age information =====

    fn load_age<T: DeserializeOwned>(&self, kind: CacheKind, key: &str) -> Option<String> {
        match self.load::<T>(kind, key) {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = key, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn get_cache_ages(&self, org_unit: &str, analytics_key: &str) -> CacheAges {
        CacheAges {
            org_unit: self.load_age::<Vec<OrgUnit>>(CacheKind::OrgUnits, org_unit),
            analytics: self.load_age::<RawCounts>(CacheKind::Analytics, analytics_key),
        }
    }

    /// Delete every cached entry and the salt, e.g. on logout.
    pub fn clear(&mut self) -> Result<()> {
        self.cipher = None;
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let is_cache_file = path
                .extension()
                .map(|ext| ext == "json" || ext == "bin")
                .unwrap_or(false)
                || path.file_name().map(|n| n == ".salt").unwrap_or(false);
            if is_cache_file && !path.ends_with("session.json") {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub org_unit: Option<String>,
    pub analytics: Option<String>,
}

impl CacheAges {
    /// Age of the figures on screen
    pub fn last_updated(&self) -> String {
        self.analytics
            .clone()
            .or_else(|| self.org_unit.clone())
            .unwrap_or_else(|| "never".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
