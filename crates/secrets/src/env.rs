//! Public lookup facade

use crate::config::ResolverConfig;
use crate::resolvers::{DocumentResolver, EnvResolver, read_var};
use crate::{
    DocumentCache, EnvStore, ProcessEnv, ProviderRegistry, ProviderResolver, SecretError,
    SecretFetcher, SecretReference, SecureSecret,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolves lookup keys that are either plain variable names or provider
/// references.
///
/// Owns its provider registry, its environment store and the document cache
/// shared by its remote providers. Build one with [`SecretEnv::builder`] and
/// keep it for the life of the process so the cache is reused.
pub struct SecretEnv {
    config: ResolverConfig,
    store: Arc<dyn EnvStore>,
    registry: ProviderRegistry,
    cache: Arc<DocumentCache>,
}

impl SecretEnv {
    /// Start building a resolver
    #[must_use]
    pub fn builder() -> SecretEnvBuilder {
        SecretEnvBuilder::default()
    }

    /// Resolver over the process environment with only the `env` provider
    #[must_use]
    pub fn from_env() -> Self {
        Self::builder().build()
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Registered providers
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Document cache shared by the remote providers
    #[must_use]
    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    /// Resolve one lookup key.
    ///
    /// Keys starting with the sentinel are parsed as references and
    /// dispatched to their provider; anything else is read from the local
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns the classified [`SecretError`] for the first failing step:
    /// an empty or malformed key, an unregistered provider, a backend or
    /// decoding failure, a missing document field, or an unset variable.
    pub async fn resolve(&self, raw_key: &str) -> Result<SecureSecret, SecretError> {
        if raw_key.is_empty() {
            return Err(SecretError::invalid_format(raw_key, "lookup key is empty"));
        }

        if SecretReference::is_reference(raw_key, self.config.sentinel) {
            let reference = SecretReference::parse(raw_key, self.config.sentinel)?;
            tracing::debug!(
                provider = %reference.provider,
                path = %reference.path,
                key = ?reference.key,
                "Resolving secret reference"
            );
            return self.registry.dispatch(&reference).await;
        }

        read_var(self.store.as_ref(), raw_key, self.config.empty_values)
    }

    /// Resolve several lookup keys concurrently.
    ///
    /// Duplicate keys are resolved once. Documents shared between keys are
    /// fetched once thanks to the cache.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; no partial map is returned.
    pub async fn resolve_all<I, S>(
        &self,
        keys: I,
    ) -> Result<BTreeMap<String, SecureSecret>, SecretError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        use futures::future::try_join_all;

        let mut unique: Vec<String> = keys.into_iter().map(Into::into).collect();
        unique.sort();
        unique.dedup();

        let futures = unique.into_iter().map(|key| async move {
            let value = self.resolve(&key).await?;
            Ok::<_, SecretError>((key, value))
        });

        Ok(try_join_all(futures).await?.into_iter().collect())
    }

    /// Resolve one lookup key from synchronous code.
    ///
    /// Drives [`resolve`](Self::resolve) on a fresh current-thread runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Runtime`] when called from inside an async
    /// runtime or when the runtime cannot be created; otherwise the same
    /// errors as [`resolve`](Self::resolve).
    pub fn resolve_blocking(&self, raw_key: &str) -> Result<SecureSecret, SecretError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(SecretError::Runtime {
                message: "resolve_blocking called from within an async runtime; use resolve"
                    .to_string(),
            });
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SecretError::Runtime {
                message: e.to_string(),
            })?;

        runtime.block_on(self.resolve(raw_key))
    }
}

impl Default for SecretEnv {
    fn default() -> Self {
        Self::from_env()
    }
}

impl std::fmt::Debug for SecretEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEnv")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

enum PendingProvider {
    Resolver(Arc<dyn ProviderResolver>),
    Document(&'static str, Arc<dyn SecretFetcher>),
}

/// Builder for [`SecretEnv`]
///
/// The `env` provider is always registered first, over the configured
/// store; providers added here are registered after it in order, so a
/// custom `env` resolver replaces the built-in one.
#[derive(Default)]
pub struct SecretEnvBuilder {
    config: ResolverConfig,
    store: Option<Arc<dyn EnvStore>>,
    cache: Option<Arc<DocumentCache>>,
    providers: Vec<PendingProvider>,
}

impl SecretEnvBuilder {
    /// Use the given configuration
    #[must_use]
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Read local variables from `store` instead of the process environment
    #[must_use]
    pub fn env_store(mut self, store: Arc<dyn EnvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share an existing document cache
    #[must_use]
    pub fn cache(mut self, cache: Arc<DocumentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Register a custom resolver
    #[must_use]
    pub fn provider(mut self, resolver: Arc<dyn ProviderResolver>) -> Self {
        self.providers.push(PendingProvider::Resolver(resolver));
        self
    }

    /// Register a [`DocumentResolver`] for `provider` backed by `fetcher`
    /// and the engine's document cache
    #[must_use]
    pub fn document_provider(
        mut self,
        provider: &'static str,
        fetcher: Arc<dyn SecretFetcher>,
    ) -> Self {
        self.providers
            .push(PendingProvider::Document(provider, fetcher));
        self
    }

    /// Build the resolver
    #[must_use]
    pub fn build(self) -> SecretEnv {
        let store = self.store.unwrap_or_else(|| Arc::new(ProcessEnv));
        let cache = self.cache.unwrap_or_default();

        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(EnvResolver::new(
            Arc::clone(&store),
            self.config.empty_values,
        )));

        for provider in self.providers {
            match provider {
                PendingProvider::Resolver(resolver) => registry.register(resolver),
                PendingProvider::Document(name, fetcher) => registry.register(Arc::new(
                    DocumentResolver::new(name, fetcher, Arc::clone(&cache)),
                )),
            }
        }

        tracing::debug!(providers = ?registry.providers(), "Secret resolver ready");

        SecretEnv {
            config: self.config,
            store,
            registry,
            cache,
        }
    }
}
