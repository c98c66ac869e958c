//! Remote secret document resolver

use crate::{
    DocumentCache, KeyRequirement, ProviderResolver, SecretDocument, SecretError, SecretFetcher,
    SecretReference, SecureSecret,
};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Resolves `@<provider>:<path>:<key>` against JSON documents held by a
/// remote secret manager.
///
/// The document at `path` is fetched through the [`SecretFetcher`] on first
/// use and kept in the shared [`DocumentCache`]; further keys from the same
/// document are served without another fetch.
#[derive(Clone)]
pub struct DocumentResolver {
    provider: &'static str,
    fetcher: Arc<dyn SecretFetcher>,
    cache: Arc<DocumentCache>,
}

impl DocumentResolver {
    /// Create a resolver registered under `provider`.
    #[must_use]
    pub fn new(
        provider: &'static str,
        fetcher: Arc<dyn SecretFetcher>,
        cache: Arc<DocumentCache>,
    ) -> Self {
        Self {
            provider,
            fetcher,
            cache,
        }
    }

    /// The cache this resolver reads and fills
    #[must_use]
    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }
}

impl std::fmt::Debug for DocumentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentResolver")
            .field("provider", &self.provider)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderResolver for DocumentResolver {
    fn provider_name(&self) -> &'static str {
        self.provider
    }

    fn key_requirement(&self) -> KeyRequirement {
        KeyRequirement::Required
    }

    async fn resolve(&self, reference: &SecretReference) -> Result<SecureSecret, SecretError> {
        let path = reference.path.as_str();
        let key = reference
            .key
            .as_deref()
            .ok_or_else(|| SecretError::invalid_format(reference.to_string(), "missing secret key"))?;

        let raw = self
            .cache
            .get_or_fetch(path, || async {
                tracing::debug!(provider = self.provider, path, "Fetching secret document");
                self.fetcher.fetch(path).await
            })
            .await
            .map_err(|e| {
                tracing::warn!(provider = self.provider, path, error = %e, "Secret fetch failed");
                SecretError::BackendUnavailable {
                    provider: self.provider.to_string(),
                    path: path.to_string(),
                    message: e.to_string(),
                }
            })?;

        SecretDocument::decode(path, raw.expose_secret())?.field(path, key)
    }
}
