//! Provider registry
//!
//! Maps provider tags to [`ProviderResolver`]s. A new provider is added by
//! registering another resolver; dispatch itself never changes. References
//! to tags with no registered resolver fail closed.

use crate::{KeyRequirement, ProviderResolver, SecretError, SecretReference, SecureSecret};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of provider resolvers
///
/// # Example
///
/// ```ignore
/// use envsecrets::{EnvResolver, ProviderRegistry, SecretReference};
///
/// let mut registry = ProviderRegistry::new();
/// registry.register(Arc::new(EnvResolver::from_process()));
///
/// let reference = SecretReference::parse("@env:HOME", '@')?;
/// let home = registry.dispatch(&reference).await?;
/// ```
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    resolvers: HashMap<&'static str, Arc<dyn ProviderResolver>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// Register a resolver
    ///
    /// The resolver's `provider_name()` is used as the key. If a resolver
    /// with the same name already exists, it is replaced.
    pub fn register(&mut self, resolver: Arc<dyn ProviderResolver>) {
        self.resolvers.insert(resolver.provider_name(), resolver);
    }

    /// Get a resolver by provider tag
    #[must_use]
    pub fn get(&self, provider: &str) -> Option<Arc<dyn ProviderResolver>> {
        self.resolvers.get(provider).cloned()
    }

    /// Check if a resolver is registered for the given provider tag
    #[must_use]
    pub fn has(&self, provider: &str) -> bool {
        self.resolvers.contains_key(provider)
    }

    /// Registered provider tags, sorted
    #[must_use]
    pub fn providers(&self) -> Vec<&'static str> {
        let mut providers: Vec<&'static str> = self.resolvers.keys().copied().collect();
        providers.sort_unstable();
        providers
    }

    /// Route a parsed reference to its provider.
    ///
    /// # Errors
    ///
    /// - [`SecretError::ProviderNotImplemented`] if no resolver is
    ///   registered for the tag; no resolver is invoked.
    /// - [`SecretError::InvalidFormat`] if the reference's key segment does
    ///   not fit the provider's [`KeyRequirement`].
    /// - Whatever the resolver itself returns.
    pub async fn dispatch(&self, reference: &SecretReference) -> Result<SecureSecret, SecretError> {
        let resolver =
            self.get(&reference.provider)
                .ok_or_else(|| SecretError::ProviderNotImplemented {
                    provider: reference.provider.clone(),
                })?;

        match (resolver.key_requirement(), &reference.key) {
            (KeyRequirement::Required, None) => {
                return Err(SecretError::invalid_format(
                    reference.to_string(),
                    "missing secret key",
                ));
            }
            (KeyRequirement::Forbidden, Some(key)) => {
                return Err(SecretError::invalid_format(
                    reference.to_string(),
                    format!(
                        "provider '{}' does not take a secret key (got '{key}')",
                        reference.provider
                    ),
                ));
            }
            _ => {}
        }

        resolver.resolve(reference).await
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmptyValuePolicy;
    use crate::resolvers::EnvResolver;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct KeyedProbe {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProviderResolver for KeyedProbe {
        fn provider_name(&self) -> &'static str {
            "probe"
        }

        fn key_requirement(&self) -> KeyRequirement {
            KeyRequirement::Required
        }

        async fn resolve(&self, reference: &SecretReference) -> Result<SecureSecret, SecretError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SecureSecret::new(format!(
                "{}#{}",
                reference.path,
                reference.key.clone().unwrap_or_default()
            )))
        }
    }

    struct Unkeyed;

    #[async_trait]
    impl ProviderResolver for Unkeyed {
        fn provider_name(&self) -> &'static str {
            "plain"
        }

        fn key_requirement(&self) -> KeyRequirement {
            KeyRequirement::Forbidden
        }

        async fn resolve(&self, reference: &SecretReference) -> Result<SecureSecret, SecretError> {
            Ok(SecureSecret::new(reference.path.clone()))
        }
    }

    fn env_resolver() -> Arc<EnvResolver> {
        let store = std::collections::HashMap::from([("HOST".to_string(), "localhost".to_string())]);
        Arc::new(EnvResolver::new(Arc::new(store), EmptyValuePolicy::Allow))
    }

    #[test]
    fn test_registry_new() {
        let registry = ProviderRegistry::new();
        assert!(registry.providers().is_empty());
    }

    #[test]
    fn test_registry_register() {
        let mut registry = ProviderRegistry::new();
        registry.register(env_resolver());
        registry.register(Arc::new(KeyedProbe::default()));

        assert!(registry.has("env"));
        assert!(registry.has("probe"));
        assert!(!registry.has("vault"));
        assert_eq!(registry.providers(), vec!["env", "probe"]);
    }

    #[test]
    fn test_registry_replace() {
        let mut registry = ProviderRegistry::new();
        registry.register(env_resolver());
        registry.register(env_resolver());

        assert_eq!(registry.providers().len(), 1);
    }

    #[test]
    fn test_registry_debug() {
        let mut registry = ProviderRegistry::new();
        registry.register(env_resolver());

        let debug = format!("{registry:?}");
        assert!(debug.contains("ProviderRegistry"));
        assert!(debug.contains("env"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_provider() {
        let registry = ProviderRegistry::new();
        let reference = SecretReference::new("azure", "dev/app", Some("x".to_string()));

        let err = registry.dispatch(&reference).await.unwrap_err();
        assert!(matches!(err, SecretError::ProviderNotImplemented { provider } if provider == "azure"));
    }

    #[tokio::test]
    async fn test_dispatch_env() {
        let mut registry = ProviderRegistry::new();
        registry.register(env_resolver());

        let reference = SecretReference::new("env", "HOST", None);
        let value = registry.dispatch(&reference).await.unwrap();
        assert_eq!(value.expose(), "localhost");
    }

    #[tokio::test]
    async fn test_dispatch_missing_required_key() {
        let probe = Arc::new(KeyedProbe::default());
        let mut registry = ProviderRegistry::new();
        registry.register(probe.clone());

        let reference = SecretReference::new("probe", "dev/secret", None);
        let err = registry.dispatch(&reference).await.unwrap_err();
        assert!(err.to_string().contains("missing secret key"));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_env_ignores_key() {
        let mut registry = ProviderRegistry::new();
        registry.register(env_resolver());

        let reference = SecretReference::new("env", "HOST", Some("port".to_string()));
        let value = registry.dispatch(&reference).await.unwrap();
        assert_eq!(value.expose(), "localhost");
    }

    #[tokio::test]
    async fn test_dispatch_forbidden_key() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Unkeyed));

        let reference = SecretReference::new("plain", "HOST", Some("port".to_string()));
        let err = registry.dispatch(&reference).await.unwrap_err();
        assert!(matches!(err, SecretError::InvalidFormat { .. }));
        assert!(err.to_string().contains("does not take a secret key"));

        let reference = SecretReference::new("plain", "HOST", None);
        assert_eq!(registry.dispatch(&reference).await.unwrap().expose(), "HOST");
    }

    #[tokio::test]
    async fn test_dispatch_keyed_provider() {
        let probe = Arc::new(KeyedProbe::default());
        let mut registry = ProviderRegistry::new();
        registry.register(probe.clone());

        let reference = SecretReference::new("probe", "dev/app", Some("user".to_string()));
        let value = registry.dispatch(&reference).await.unwrap();
        assert_eq!(value.expose(), "dev/app#user");
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }
}
