use std::time::Duration;

use dealproxy_core::{AppConfig, StorePriority};
use dealproxy_upstream::BackoffPolicy;

use crate::aggregator::AggregateConfig;
use crate::enricher::EnrichConfig;

const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Everything the pipeline needs to build its clients and components.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub deals_api_url: String,
    pub metadata_api_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub metadata_timeout_ms: u64,
    pub metadata_locale: String,
    pub metadata_region: String,
    pub currencies: Vec<String>,
    pub cache_ttl: Duration,
    pub aggregate: AggregateConfig,
    pub enrich: EnrichConfig,
    pub priority: StorePriority,
    /// Pending enrichment passes beyond which new submissions are dropped.
    pub queue_capacity: usize,
}

impl PipelineConfig {
    /// Defaults matching the production settings, pointed at the given
    /// upstream base URLs.
    #[must_use]
    pub fn new(deals_api_url: &str, metadata_api_url: &str) -> Self {
        Self {
            deals_api_url: deals_api_url.to_owned(),
            metadata_api_url: metadata_api_url.to_owned(),
            user_agent: "dealproxy/0.1 (deal-cache)".to_owned(),
            request_timeout_secs: 30,
            metadata_timeout_ms: 6000,
            metadata_locale: "english".to_owned(),
            metadata_region: "us".to_owned(),
            currencies: vec!["usd".to_owned()],
            cache_ttl: Duration::from_secs(3600),
            aggregate: AggregateConfig::default(),
            enrich: EnrichConfig::default(),
            priority: StorePriority::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            deals_api_url: config.deals_api_url.clone(),
            metadata_api_url: config.metadata_api_url.clone(),
            user_agent: config.user_agent.clone(),
            request_timeout_secs: config.request_timeout_secs,
            metadata_timeout_ms: config.metadata_timeout_ms,
            metadata_locale: config.metadata_locale.clone(),
            metadata_region: config.metadata_region.clone(),
            currencies: config.currencies.clone(),
            cache_ttl: config.cache_ttl(),
            aggregate: AggregateConfig {
                page_size: config.page_size,
                target_unique_games: config.target_unique_games,
                max_pages: config.max_pages,
            },
            enrich: EnrichConfig {
                policy: BackoffPolicy::new(
                    config.metadata_max_attempts,
                    Duration::from_millis(config.metadata_backoff_base_ms),
                    Duration::from_millis(config.metadata_backoff_cap_ms),
                ),
                item_delay: Duration::from_millis(config.metadata_delay_ms),
            },
            priority: StorePriority::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
