//! Paginated work harvesting through the `/works` endpoint.
//!
//! Several filters can identify APHRC works. Each [`SearchStrategy`] is
//! probed with a tiny page first; the first one reporting a plausible
//! number of matches is paged to the end.

use std::fmt;
use std::time::Duration;

use aphrc_core::work::OpenAlexWork;

use crate::api::OpenAlexApi;
use crate::institution::APHRC_NAME;

/// A `/works` filter that selects the institution's works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStrategy {
    InstitutionId(String),
    InstitutionName(String),
    AffiliationText(String),
}

impl SearchStrategy {
    /// Value of the `filter` query parameter.
    pub fn filter(&self) -> String {
        match self {
            Self::InstitutionId(id) => format!("institutions.id:{id}"),
            Self::InstitutionName(name) => format!("institutions.display_name:{name}"),
            Self::AffiliationText(text) => format!("authorships.institutions.display_name:{text}"),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstitutionId(_) => f.write_str("institution id"),
            Self::InstitutionName(_) => f.write_str("institution name"),
            Self::AffiliationText(_) => f.write_str("affiliation text"),
        }
    }
}

/// Strategies in the order they are tried.
pub fn default_strategies(institution_id: &str) -> Vec<SearchStrategy> {
    vec![
        SearchStrategy::InstitutionId(institution_id.to_string()),
        SearchStrategy::InstitutionName(APHRC_NAME.to_string()),
        SearchStrategy::AffiliationText("APHRC".to_string()),
    ]
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Page size for the full fetch (200 is the OpenAlex maximum).
    pub per_page: u32,
    /// Page size for the probe request.
    pub probe_per_page: u32,
    /// A strategy matching this many works or more is considered too
    /// broad to be institution-specific.
    pub max_plausible_count: u64,
    /// Pause between page requests.
    pub page_delay: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            per_page: 200,
            probe_per_page: 5,
            max_plausible_count: 10_000,
            page_delay: Duration::from_millis(500),
        }
    }
}

/// Result of [`harvest_works`].
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    /// Strategy that was paged, if any matched.
    pub strategy: Option<SearchStrategy>,
    /// `meta.count` reported by the probe of that strategy.
    pub reported_count: u64,
    pub works: Vec<OpenAlexWork>,
}

/// True when another page should be requested after receiving
/// `received` results for `page`.
pub fn has_more_pages(page: u32, per_page: u32, received: usize, total: u64) -> bool {
    received >= per_page as usize && u64::from(page) * u64::from(per_page) < total
}

/// Probe `strategies` in order and page through the first plausible one.
///
/// A failed probe moves on to the next strategy. A failed page stops
/// paging and keeps the works already collected.
pub async fn harvest_works(
    api: &OpenAlexApi,
    strategies: &[SearchStrategy],
    config: &HarvestConfig,
) -> Harvest {
    for strategy in strategies {
        let filter = strategy.filter();
        let total = match api.list_works(&filter, 1, config.probe_per_page).await {
            Ok(probe) => probe.meta.count,
            Err(e) => {
                tracing::warn!(%strategy, error = %e, "Probe request failed");
                continue;
            }
        };

        if total == 0 {
            tracing::info!(%strategy, "Strategy matched no works");
            continue;
        }
        if total >= config.max_plausible_count {
            tracing::info!(%strategy, total, "Strategy matched too many works to be institution-specific");
            continue;
        }

        tracing::info!(%strategy, total, "Paging through works");
        let works = fetch_all_pages(api, &filter, total, config).await;
        return Harvest {
            strategy: Some(strategy.clone()),
            reported_count: total,
            works,
        };
    }

    tracing::warn!("No search strategy returned works");
    Harvest::default()
}

async fn fetch_all_pages(
    api: &OpenAlexApi,
    filter: &str,
    total: u64,
    config: &HarvestConfig,
) -> Vec<OpenAlexWork> {
    let mut works = Vec::new();
    let mut page = 1u32;

    loop {
        tracing::debug!(page, "Fetching works page");
        let result = match api.list_works(filter, page, config.per_page).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(page, error = %e, "Page request failed, keeping works fetched so far");
                break;
            }
        };

        let received = result.results.len();
        works.extend(result.results);

        if !has_more_pages(page, config.per_page, received, total) {
            break;
        }
        page += 1;
        tokio::time::sleep(config.page_delay).await;
    }

    tracing::info!(fetched = works.len(), total, "Finished paging");
    works
}
