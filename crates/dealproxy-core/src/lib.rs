pub mod app_config;
pub mod config;
pub mod deals;
pub mod stores;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use deals::{Deal, Metadata, MetadataSlot, MetadataState};
pub use stores::{normalize_store_name, Store, StorePriority, DEFAULT_STORE_PRIORITY};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
