//! AWS Secrets Manager backend for envsecrets
//!
//! Provides [`AwsSecretsFetcher`], which fetches secret documents for
//! `@aws:<secret-id>:<key>` references, and [`AwsSecretEnvExt`] to register
//! it on a [`SecretEnvBuilder`](envsecrets::SecretEnvBuilder).

pub mod secrets;

// Re-export main types for convenience
pub use secrets::{AwsFetcherConfig, AwsSecretEnvExt, AwsSecretsFetcher, PROVIDER};
