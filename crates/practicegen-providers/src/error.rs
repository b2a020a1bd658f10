//! Provider error types.

use thiserror::Error;

/// Errors that can occur when interacting with an LLM provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ProviderError {
    /// Whether retrying the same request cannot help.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_)
                | ProviderError::ModelNotFound(_)
                | ProviderError::Client(_)
        )
    }

    pub(crate) fn from_send(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(timeout_secs)
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    }
}

/// Build the shared HTTP client used by the remote providers.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::Client(e.to_string()))
}

/// Seconds from a `retry-after` header, as milliseconds. Defaults to 5s.
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(5)
        * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_errors() {
        assert!(ProviderError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(ProviderError::ModelNotFound("x".into()).is_permanent());
        assert!(!ProviderError::Timeout(30).is_permanent());
        assert!(!ProviderError::RateLimited { retry_after_ms: 1000 }.is_permanent());
    }

    #[test]
    fn retry_after_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(retry_after_ms(&headers), 5000);
        headers.insert("retry-after", "12".parse().unwrap());
        assert_eq!(retry_after_ms(&headers), 12_000);
    }
}
