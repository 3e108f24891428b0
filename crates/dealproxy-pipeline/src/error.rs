use dealproxy_upstream::UpstreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Nothing to request: no accepted store ids. Never retried automatically.
    #[error("no accepted store ids to aggregate {currency} deals from")]
    EmptyStoreSet { currency: String },

    #[error("a refresh of {currency} is already running")]
    RefreshInProgress { currency: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
