//! Cached, concurrent fetching of everything one dashboard view needs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::cache::CacheManager;
use crate::catalog::{
    IndicatorCatalog, ANC_CODE_PREFIX, DELIVERY_CODE_PREFIX, EPI_CODE_PREFIX, MALARIA_CASES_CODE,
    PNC_CODE_PREFIX,
};
use crate::models::{OrgUnit, OrgUnitTree, RawCounts};
use crate::period::{ResolvedPeriod, WeekBucket};

use super::{DataElement, Dhis2Client, IndicatorRef};

/// Fetched data for one (org unit, period) view.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    pub tree: OrgUnitTree,
    pub epi: RawCounts,
    pub maternal: RawCounts,
    pub wash: RawCounts,
    /// Confirmed malaria cases per child org unit.
    pub malaria_by_child: HashMap<String, Decimal>,
    /// HMIS 033b reporting rate per ISO week.
    pub reporting: BTreeMap<WeekBucket, Decimal>,
}

#[derive(Clone)]
pub struct DataLoader {
    client: Dhis2Client,
    cache: Arc<CacheManager>,
    catalog: &'static IndicatorCatalog,
}

impl DataLoader {
    pub fn new(client: Dhis2Client, cache: Arc<CacheManager>) -> Self {
        Self {
            client,
            cache,
            catalog: IndicatorCatalog::global(),
        }
    }

    fn store<E: std::fmt::Display>(what: &str, result: std::result::Result<(), E>) {
        if let Err(e) = result {
            warn!(cache = what, error = %e, "Failed to write cache entry");
        }
    }

    async fn org_units(&self, org_unit: &str) -> Result<Vec<OrgUnit>> {
        if let Some(units) = self.cache.load_org_unit(org_unit) {
            return Ok(units);
        }
        let units = self.client.fetch_org_unit(org_unit).await?;
        Self::store(org_unit, self.cache.save_org_unit(org_unit, &units));
        Ok(units)
    }

    /// The org unit's neighbourhood: itself, its ancestors and children.
    /// Above region level the children's districts are loaded too, so each
    /// region can sum its district populations.
    pub async fn org_tree(&self, org_unit: &str) -> Result<OrgUnitTree> {
        let mut tree = OrgUnitTree::new();
        tree.extend(self.org_units(org_unit).await?);

        let pending: Vec<String> = tree
            .unexpanded_children(org_unit)
            .into_iter()
            .map(|child| child.id.clone())
            .collect();
        if !pending.is_empty() {
            debug!(org_unit, children = pending.len(), "Loading districts below children");
            let nested = try_join_all(pending.iter().map(|id| self.org_units(id))).await?;
            tree.extend(nested.into_iter().flatten());
        }
        Ok(tree)
    }

    /// Data elements under a code prefix that the catalog knows about.
    pub async fn data_elements(&self, pattern: &str) -> Result<Vec<DataElement>> {
        let elements = match self.cache.load_data_elements(pattern) {
            Some(elements) => elements,
            None => {
                let elements = self.client.fetch_data_elements(pattern).await?;
                Self::store(pattern, self.cache.save_data_elements(pattern, &elements));
                elements
            }
        };
        Ok(elements
            .into_iter()
            .filter(|e| self.catalog.get(&e.code).is_ok())
            .collect())
    }

    /// The DHIS2 indicator behind each WASH key, first search hit wins.
    pub async fn wash_indicators(&self) -> Result<Vec<(String, IndicatorRef)>> {
        let searches = self.catalog.wash_indicators().iter().map(|w| async move {
            let hits = match self.cache.load_search(w.search_pattern) {
                Some(hits) => hits,
                None => {
                    let hits = self.client.search_indicators(w.search_pattern).await?;
                    Self::store(w.key, self.cache.save_search(w.search_pattern, &hits));
                    hits
                }
            };
            if hits.is_empty() {
                debug!(indicator = w.key, "No DHIS2 indicator matches");
            }
            Ok::<_, anyhow::Error>(hits.into_iter().next().map(|hit| (w.key.to_string(), hit)))
        });
        Ok(try_join_all(searches).await?.into_iter().flatten().collect())
    }

    async fn element_counts(
        &self,
        org_unit: &str,
        period: &ResolvedPeriod,
        group: &str,
        patterns: &[&str],
    ) -> Result<RawCounts> {
        let key = CacheManager::analytics_key(org_unit, period, group);
        if let Some(counts) = self.cache.load_counts(&key) {
            return Ok(counts);
        }
        let elements: Vec<DataElement> = try_join_all(patterns.iter().map(|p| self.data_elements(p)))
            .await?
            .into_iter()
            .flatten()
            .collect();
        let counts = self.client.fetch_raw_counts(org_unit, period, &elements).await?;
        Self::store(&key, self.cache.save_counts(&key, &counts));
        Ok(counts)
    }

    async fn wash_values(&self, org_unit: &str, period: &ResolvedPeriod) -> Result<RawCounts> {
        let key = CacheManager::analytics_key(org_unit, period, "wash");
        if let Some(counts) = self.cache.load_counts(&key) {
            return Ok(counts);
        }
        let indicators = self.wash_indicators().await?;
        let counts = self.client.fetch_indicator_values(org_unit, period, &indicators).await?;
        Self::store(&key, self.cache.save_counts(&key, &counts));
        Ok(counts)
    }

    async fn malaria_by_child(
        &self,
        tree: &OrgUnitTree,
        org_unit: &str,
        period: &ResolvedPeriod,
    ) -> Result<HashMap<String, Decimal>> {
        let key = CacheManager::analytics_key(org_unit, period, "malaria");
        if let Some(totals) = self.cache.load_totals(&key) {
            return Ok(totals);
        }
        let children: Vec<&str> = tree.children(org_unit).into_iter().map(|c| c.id.as_str()).collect();
        let element = self
            .data_elements(MALARIA_CASES_CODE)
            .await?
            .into_iter()
            .find(|e| e.code == MALARIA_CASES_CODE);
        let Some(element) = element else {
            warn!(code = MALARIA_CASES_CODE, "Malaria case element not found");
            return Ok(HashMap::new());
        };
        let totals = self
            .client
            .fetch_totals_by_org_unit(&children, period, &element)
            .await?;
        Self::store(&key, self.cache.save_totals(&key, &totals));
        Ok(totals)
    }

    async fn reporting_rates(
        &self,
        org_unit: &str,
        period: &ResolvedPeriod,
    ) -> Result<BTreeMap<WeekBucket, Decimal>> {
        let key = CacheManager::analytics_key(org_unit, period, "reporting");
        if let Some(values) = self.cache.load_weekly(&key) {
            return Ok(values);
        }
        let values = self.client.fetch_reporting_rates(org_unit, &period.weeks()).await?;
        Self::store(&key, self.cache.save_weekly(&key, &values));
        Ok(values)
    }

    /// Fetch every input for a view, running the independent requests
    /// concurrently.
    pub async fn load_report_inputs(&self, org_unit: &str, period: &ResolvedPeriod) -> Result<ReportInputs> {
        let tree = self
            .org_tree(org_unit)
            .await
            .with_context(|| format!("Failed to load org unit {}", org_unit))?;

        let (epi, maternal, wash, malaria_by_child, reporting) = tokio::try_join!(
            self.element_counts(org_unit, period, "epi", &[EPI_CODE_PREFIX]),
            self.element_counts(
                org_unit,
                period,
                "maternal",
                &[ANC_CODE_PREFIX, DELIVERY_CODE_PREFIX, PNC_CODE_PREFIX],
            ),
            self.wash_values(org_unit, period),
            self.malaria_by_child(&tree, org_unit, period),
            self.reporting_rates(org_unit, period),
        )?;

        info!(
            org_unit,
            period = %period.label(),
            children = tree.children(org_unit).len(),
            "Loaded report inputs"
        );

        Ok(ReportInputs {
            tree,
            epi,
            maternal,
            wash,
            malaria_by_child,
            reporting,
        })
    }
}
