use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// 429 or 403: the upstream wants us to slow down (or has blocked us for now).
    #[error("throttled by upstream (HTTP {status}) at {url}")]
    Throttled { status: u16, url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl UpstreamError {
    /// Returns `true` for responses that call for a backoff-and-retry.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, UpstreamError::Throttled { .. })
    }

    /// Classifies a non-success status: 429 and 403 are throttling,
    /// everything else is unexpected.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
        let code = status.as_u16();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            UpstreamError::Throttled {
                status: code,
                url: url.to_owned(),
            }
        } else {
            UpstreamError::UnexpectedStatus {
                status: code,
                url: url.to_owned(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn too_many_requests_is_throttled() {
        let err = UpstreamError::from_status(StatusCode::TOO_MANY_REQUESTS, "http://x/");
        assert!(err.is_throttled());
    }

    #[test]
    fn forbidden_is_throttled() {
        let err = UpstreamError::from_status(StatusCode::FORBIDDEN, "http://x/");
        assert!(matches!(err, UpstreamError::Throttled { status: 403, .. }));
    }

    #[test]
    fn server_error_is_not_throttled() {
        let err = UpstreamError::from_status(StatusCode::BAD_GATEWAY, "http://x/");
        assert!(!err.is_throttled());
        assert!(matches!(err, UpstreamError::UnexpectedStatus { status: 502, .. }));
    }
}
