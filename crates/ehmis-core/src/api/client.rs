//! HTTP client for the DHIS2 web API.
//!
//! Every request carries Basic auth. Rate-limit and gateway failures are
//! retried with exponential backoff; other failures map to [`ApiError`].

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::SessionData;
use crate::models::{OrgUnit, RawCounts};
use crate::catalog::REPORTING_RATE_ID;
use crate::period::{weekly_dimension, ResolvedPeriod, WeekBucket};

use super::types::{
    AnalyticsResponse, DataElement, DataElementsResponse, IndicatorRef, IndicatorsResponse,
    MeResponse, OrgUnitResponse,
};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Uganda national eHMIS instance.
pub const DEFAULT_BASE_URL: &str = "https://hmis.health.go.ug/api";

/// HTTP request timeout in seconds. Analytics queries over a full year of
/// district data are slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of retries for 429 and 5xx gateway responses.
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 1000;

const ORG_UNIT_FIELDS: &str =
    "id,displayName,level,parent[id],ancestors[id,displayName,level],children[id,displayName,level]";

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct Dhis2Client {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl Dhis2Client {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A client for the same instance that authenticates as `username`,
    /// sharing the connection pool.
    pub fn with_credentials(&self, username: &str, password: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            credentials: Some((username.to_string(), password.to_string())),
        }
    }

    /// Check credentials against `/me` and start a session.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<SessionData> {
        let me: MeResponse = self
            .with_credentials(username, password)
            .get("me", &[("fields", "id,username,displayName,organisationUnits[id]".to_string())])
            .await
            .context("DHIS2 login failed")?;

        debug!(user_id = %me.id, org_units = me.organisation_units.len(), "Authenticated");

        Ok(SessionData {
            username: me.username.unwrap_or_else(|| username.to_string()),
            user_id: me.id,
            display_name: me.display_name,
            base_url: self.base_url.clone(),
            org_units: me.organisation_units.into_iter().map(|o| o.id).collect(),
            created_at: Utc::now(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Ok(Some) on success, Ok(None) when the status is worth a retry.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        let status = response.status();
        if status.is_success() {
            Ok(Some(response))
        } else if ApiError::is_retryable_status(status) {
            Ok(None)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self.client.get(&url).query(query);
            if let Some((ref username, ref password)) = self.credentials {
                request = request.basic_auth(username, Some(password));
            }
            let response = request
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "DHIS2 busy, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    // ===== Org units =====

    /// The unit with its ancestors and direct children.
    pub async fn fetch_org_unit(&self, id: &str) -> Result<Vec<OrgUnit>> {
        let response: OrgUnitResponse = self
            .get(&format!("organisationUnits/{}", id), &[("fields", ORG_UNIT_FIELDS.to_string())])
            .await
            .with_context(|| format!("Failed to fetch org unit {}", id))?;
        Ok(response.into_org_units())
    }

    // ===== Metadata =====

    /// Data elements whose code matches `pattern`, e.g. `105-CL`.
    pub async fn fetch_data_elements(&self, pattern: &str) -> Result<Vec<DataElement>> {
        let response: DataElementsResponse = self
            .get(
                "dataElements",
                &[
                    ("filter", format!("code:like:{}", pattern)),
                    ("fields", "id,code,displayName".to_string()),
                    ("paging", "false".to_string()),
                ],
            )
            .await
            .with_context(|| format!("Failed to fetch data elements matching {}", pattern))?;
        debug!(pattern, count = response.data_elements.len(), "Fetched data elements");
        Ok(response.data_elements)
    }

    /// Indicators whose display name contains `pattern`, case-insensitive.
    pub async fn search_indicators(&self, pattern: &str) -> Result<Vec<IndicatorRef>> {
        let response: IndicatorsResponse = self
            .get(
                "indicators",
                &[
                    ("filter", format!("displayName:ilike:{}", pattern)),
                    ("fields", "id,displayName".to_string()),
                    ("paging", "false".to_string()),
                ],
            )
            .await
            .with_context(|| format!("Failed to search indicators for {}", pattern))?;
        Ok(response.indicators)
    }

    // ===== Analytics =====

    async fn analytics(&self, dx_ids: &[&str], pe: &str, org_units: &[&str]) -> Result<AnalyticsResponse> {
        let query = [
            ("dimension", format!("dx:{}", dx_ids.join(";"))),
            ("dimension", format!("pe:{}", pe)),
            ("dimension", format!("ou:{}", org_units.join(";"))),
            ("displayProperty", "NAME".to_string()),
            ("skipMeta", "true".to_string()),
        ];
        self.get("analytics", &query).await
    }

    pub async fn fetch_analytics(
        &self,
        dx_ids: &[&str],
        period: &ResolvedPeriod,
        org_units: &[&str],
    ) -> Result<AnalyticsResponse> {
        self.analytics(dx_ids, &period.dhis2_dimension(), org_units)
            .await
            .with_context(|| format!("Failed to fetch analytics for {}", period.label()))
    }

    /// HMIS 033b reporting rate per week at one org unit.
    pub async fn fetch_reporting_rates(
        &self,
        org_unit: &str,
        weeks: &[WeekBucket],
    ) -> Result<BTreeMap<WeekBucket, Decimal>> {
        if weeks.is_empty() {
            return Ok(BTreeMap::new());
        }
        let response = self
            .analytics(&[REPORTING_RATE_ID], &weekly_dimension(weeks), &[org_unit])
            .await
            .with_context(|| format!("Failed to fetch reporting rates for {}", org_unit))?;
        Ok(response.weekly_values()?)
    }

    /// Monthly counts for `elements` at one org unit, keyed by element code.
    pub async fn fetch_raw_counts(
        &self,
        org_unit: &str,
        period: &ResolvedPeriod,
        elements: &[DataElement],
    ) -> Result<RawCounts> {
        if elements.is_empty() {
            return Ok(RawCounts::new());
        }
        let ids: Vec<&str> = elements.iter().map(|e| e.id.as_str()).collect();
        let codes: HashMap<String, String> =
            elements.iter().map(|e| (e.id.clone(), e.code.clone())).collect();
        let response = self.fetch_analytics(&ids, period, &[org_unit]).await?;
        Ok(response.to_raw_counts(&codes)?)
    }

    /// Monthly values for indicators found by name, keyed by `key`.
    pub async fn fetch_indicator_values(
        &self,
        org_unit: &str,
        period: &ResolvedPeriod,
        indicators: &[(String, IndicatorRef)],
    ) -> Result<RawCounts> {
        if indicators.is_empty() {
            return Ok(RawCounts::new());
        }
        let ids: Vec<&str> = indicators.iter().map(|(_, i)| i.id.as_str()).collect();
        let keys: HashMap<String, String> =
            indicators.iter().map(|(key, i)| (i.id.clone(), key.clone())).collect();
        let response = self.fetch_analytics(&ids, period, &[org_unit]).await?;
        Ok(response.to_raw_counts(&keys)?)
    }

    /// One element summed over the period for each of `org_units`.
    pub async fn fetch_totals_by_org_unit(
        &self,
        org_units: &[&str],
        period: &ResolvedPeriod,
        element: &DataElement,
    ) -> Result<HashMap<String, Decimal>> {
        if org_units.is_empty() {
            return Ok(HashMap::new());
        }
        let response = self.fetch_analytics(&[element.id.as_str()], period, org_units).await?;
        Ok(response.totals_by_org_unit()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let client = Dhis2Client::new("https://hmis.health.go.ug/api/", DEFAULT_TIMEOUT_SECS).unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert_eq!(client.url("/me"), "https://hmis.health.go.ug/api/me");
        assert_eq!(client.url("analytics"), "https://hmis.health.go.ug/api/analytics");
    }

    #[test]
    fn test_with_credentials_keeps_instance() {
        let client = Dhis2Client::new(DEFAULT_BASE_URL, 5).unwrap();
        let authed = client.with_credentials("user", "secret");
        assert_eq!(authed.base_url(), client.base_url());
        assert_eq!(authed.credentials, Some(("user".to_string(), "secret".to_string())));
        assert!(client.credentials.is_none());
    }
}
