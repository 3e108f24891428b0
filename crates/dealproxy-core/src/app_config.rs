use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub user_agent: String,
    pub deals_api_url: String,
    pub metadata_api_url: String,
    /// Tracked currency codes, lowercase, in configuration order.
    pub currencies: Vec<String>,
    pub default_currency: String,
    pub cache_ttl_secs: u64,
    pub status_interval_secs: u64,
    pub full_enrich_interval_secs: u64,
    pub page_size: u32,
    pub target_unique_games: usize,
    pub max_pages: u32,
    pub request_timeout_secs: u64,
    pub metadata_timeout_ms: u64,
    pub metadata_locale: String,
    pub metadata_region: String,
    pub metadata_max_attempts: u32,
    pub metadata_backoff_base_ms: u64,
    pub metadata_backoff_cap_ms: u64,
    pub metadata_delay_ms: u64,
}

impl AppConfig {
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    #[must_use]
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    #[must_use]
    pub fn full_enrich_interval(&self) -> Duration {
        Duration::from_secs(self.full_enrich_interval_secs)
    }
}
