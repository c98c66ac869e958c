//! Remote fetch capability

use async_trait::async_trait;
use thiserror::Error;

/// Opaque failure reported by a [`SecretFetcher`]
///
/// Network, authentication and service errors all collapse into this type;
/// the resolver reports them as [`SecretError::BackendUnavailable`](crate::SecretError::BackendUnavailable).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
}

impl FetchError {
    /// Create a fetch error with the given message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Fetches the raw serialized payload of a remote secret document.
///
/// Implementations own authentication, transport and any timeouts. The
/// engine never retries a failed fetch on its own.
#[async_trait]
pub trait SecretFetcher: Send + Sync {
    /// Fetch the document stored at `path`.
    async fn fetch(&self, path: &str) -> Result<String, FetchError>;
}
