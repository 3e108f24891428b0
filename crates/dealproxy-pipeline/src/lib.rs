//! Deal aggregation, metadata enrichment and per-currency caching.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod directory;
pub mod enricher;
pub mod error;
pub mod metadata_store;
pub mod queue;
pub mod service;

pub use aggregator::{AggregateConfig, Aggregator};
pub use cache::{is_expired, CacheEntry, CurrencyCache};
pub use config::PipelineConfig;
pub use directory::{StoreDirectory, StoreSnapshot};
pub use enricher::{EnrichConfig, EnrichMode, EnrichReport, Enricher};
pub use error::PipelineError;
pub use metadata_store::{MetadataCounts, MetadataStore};
pub use queue::{EnrichQueue, EnrichWorker};
pub use service::{CurrencyStatus, DealService, DealsResponse, ServiceStatus};
