//! Secret document cache
//!
//! Holds the raw payload of each fetched remote document, keyed by path, for
//! the lifetime of the cache. There is no TTL and no eviction: the set of
//! distinct paths is bounded by configuration, not by request volume.
//!
//! Each path has its own [`OnceCell`], so concurrent lookups of an unfetched
//! path share a single in-flight fetch. A failed fetch leaves the cell empty
//! and the next lookup fetches again.

use crate::fetch::FetchError;
use secrecy::SecretString;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<SecretString>>>;

/// Write-once cache of raw secret documents
#[derive(Default)]
pub struct DocumentCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl DocumentCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached payload for `path`, running `fetch` to populate it
    /// if this is the first successful lookup.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error unchanged. Nothing is cached in that case.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        path: &str,
        fetch: F,
    ) -> Result<Arc<SecretString>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, FetchError>>,
    {
        let slot = self.slot(path);

        if let Some(document) = slot.get() {
            tracing::debug!(path, "Secret document served from cache");
            return Ok(Arc::clone(document));
        }

        let document = slot
            .get_or_try_init(|| async {
                tracing::debug!(path, "Secret document not cached, fetching");
                let raw = fetch().await?;
                Ok::<_, FetchError>(Arc::new(SecretString::from(raw)))
            })
            .await?;

        Ok(Arc::clone(document))
    }

    /// Whether a payload for `path` has been stored
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.lock()
            .get(path)
            .is_some_and(|slot| slot.initialized())
    }

    /// Number of stored payloads
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Whether no payload has been stored yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths with a stored payload, sorted
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    fn slot(&self, path: &str) -> Slot {
        Arc::clone(self.lock().entry(path.to_string()).or_default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("paths", &self.paths())
            .finish()
    }
}
