pub mod appdetails;
pub mod deals;
pub mod error;
pub mod parse;
pub mod rate_limit;
pub mod types;

pub use appdetails::AppDetailsClient;
pub use deals::DealsClient;
pub use error::UpstreamError;
pub use parse::{extract_release_year, parse_metadata};
pub use rate_limit::{retry_throttled, BackoffPolicy};
pub use types::{AppData, RawDeal, RawStore};
