//! Secret-aware environment lookups
//!
//! Resolves environment variable lookups whose key is either a plain
//! variable name or a provider reference such as `@aws:dev/app:password`
//! or `@env:RABBITMQ_HOST`. References are decoded, dispatched to the
//! registered provider, and the resolved value is returned as a
//! [`SecureSecret`]. Remote secret documents are fetched once per path and
//! served from an owned [`DocumentCache`] afterwards.
//!
//! # Example
//!
//! ```ignore
//! use envsecrets::SecretEnv;
//!
//! let env = SecretEnv::builder()
//!     .document_provider("aws", fetcher)
//!     .build();
//!
//! let password = env.resolve("@aws:dev/app:password").await?;
//! let host = env.resolve("RABBITMQ_HOST").await?;
//! ```

mod cache;
pub mod config;
mod document;
mod env;
mod fetch;
pub mod loader;
mod reference;
mod registry;
pub mod resolvers;
mod store;
mod types;

pub use cache::DocumentCache;
pub use config::{EmptyValuePolicy, ResolverConfig};
pub use document::SecretDocument;
pub use env::{SecretEnv, SecretEnvBuilder};
pub use fetch::{FetchError, SecretFetcher};
pub use reference::{DEFAULT_SENTINEL, SecretReference};
pub use registry::ProviderRegistry;
pub use resolvers::{DocumentResolver, EnvResolver};
pub use store::{EnvStore, ProcessEnv};
pub use types::SecureSecret;

use async_trait::async_trait;
use thiserror::Error;

/// Error types for secret resolution
#[derive(Debug, Error)]
pub enum SecretError {
    /// Lookup key starts with the sentinel but is not a valid reference,
    /// or the reference does not fit the provider's key arity
    #[error("Invalid secret reference '{reference}': {reason}")]
    InvalidFormat {
        /// The raw lookup key
        reference: String,
        /// Why the reference was rejected
        reason: String,
    },

    /// Reference names a provider that is not registered
    #[error("Secrets provider '{provider}' not implemented")]
    ProviderNotImplemented {
        /// Lowercased provider tag
        provider: String,
    },

    /// The remote fetch capability failed
    #[error("Secrets backend '{provider}' unavailable for '{path}': {message}")]
    BackendUnavailable {
        /// Provider tag
        provider: String,
        /// Remote document path
        path: String,
        /// Error reported by the fetcher
        message: String,
    },

    /// Fetched payload is not a field/value mapping
    #[error("Failed to decode secret document '{path}': {message}")]
    DocumentDecodeFailure {
        /// Remote document path
        path: String,
        /// Decoder error
        message: String,
    },

    /// Document was decoded but has no such field
    #[error("Secret key '{key}' not found in secret '{path}'")]
    SecretKeyNotFound {
        /// Requested field
        key: String,
        /// Remote document path
        path: String,
    },

    /// Local environment variable is not set
    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet {
        /// Variable name
        name: String,
    },

    /// A configuration setting has an unusable value
    #[error("Invalid setting '{setting}': {message}")]
    Configuration {
        /// Setting name
        setting: String,
        /// What is wrong with it
        message: String,
    },

    /// A blocking lookup could not drive its async runtime
    #[error("Async runtime error: {message}")]
    Runtime {
        /// Error message
        message: String,
    },

    /// Loading an env file into the process environment failed
    #[error("Failed to load env file '{path}': {message}")]
    EnvFile {
        /// Path of the env file
        path: String,
        /// Loader error
        message: String,
    },
}

impl SecretError {
    pub(crate) fn invalid_format(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Whether a provider expects a `key` segment in its references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRequirement {
    /// A key must be present (`@aws:dev/app:password`)
    Required,
    /// A key must not be present (`@env:HOME`)
    Forbidden,
    /// Either form is accepted
    Optional,
}

/// Trait for resolving provider references.
///
/// Implementors are registered in a [`ProviderRegistry`] under
/// [`provider_name`](ProviderResolver::provider_name). The registry checks
/// [`key_requirement`](ProviderResolver::key_requirement) before calling
/// [`resolve`](ProviderResolver::resolve), so `resolve` may assume the
/// reference already has the right shape.
#[async_trait]
pub trait ProviderResolver: Send + Sync {
    /// Provider tag this resolver answers to, lowercase.
    ///
    /// Examples: `"env"`, `"aws"`
    fn provider_name(&self) -> &'static str;

    /// Key arity accepted by this provider.
    fn key_requirement(&self) -> KeyRequirement;

    /// Resolve a parsed reference to its value.
    async fn resolve(&self, reference: &SecretReference) -> Result<SecureSecret, SecretError>;
}
