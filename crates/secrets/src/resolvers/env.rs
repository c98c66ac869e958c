//! Environment variable resolver

use crate::config::EmptyValuePolicy;
use crate::{
    EnvStore, KeyRequirement, ProcessEnv, ProviderResolver, SecretError, SecretReference,
    SecureSecret,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves `@env:NAME` by reading `NAME` from an [`EnvStore`]
///
/// The reference path is the variable name; a key segment is rejected.
#[derive(Clone)]
pub struct EnvResolver {
    store: Arc<dyn EnvStore>,
    empty_values: EmptyValuePolicy,
}

impl EnvResolver {
    /// Create a resolver over the given store
    #[must_use]
    pub fn new(store: Arc<dyn EnvStore>, empty_values: EmptyValuePolicy) -> Self {
        Self {
            store,
            empty_values,
        }
    }

    /// Create a resolver over the process environment with default policy
    #[must_use]
    pub fn from_process() -> Self {
        Self::new(Arc::new(ProcessEnv), EmptyValuePolicy::default())
    }
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self::from_process()
    }
}

impl std::fmt::Debug for EnvResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvResolver")
            .field("empty_values", &self.empty_values)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderResolver for EnvResolver {
    fn provider_name(&self) -> &'static str {
        "env"
    }

    fn key_requirement(&self) -> KeyRequirement {
        KeyRequirement::Optional
    }

    // A trailing key segment is accepted and ignored
    async fn resolve(&self, reference: &SecretReference) -> Result<SecureSecret, SecretError> {
        read_var(self.store.as_ref(), &reference.path, self.empty_values)
    }
}

/// Read one local variable, applying the empty value policy.
pub(crate) fn read_var(
    store: &dyn EnvStore,
    name: &str,
    empty_values: EmptyValuePolicy,
) -> Result<SecureSecret, SecretError> {
    let not_set = || SecretError::EnvVarNotSet {
        name: name.to_string(),
    };

    match store.var(name) {
        None => Err(not_set()),
        Some(value) if value.is_empty() && empty_values == EmptyValuePolicy::TreatAsUnset => {
            Err(not_set())
        }
        Some(value) => Ok(SecureSecret::new(value)),
    }
}
