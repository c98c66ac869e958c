//! Resolver configuration
//!
//! Settings can be built in code, deserialized (camelCase keys), or read
//! from `ENVSECRETS_*` variables with [`ResolverConfig::from_store`].

use crate::reference::DEFAULT_SENTINEL;
use crate::{EnvStore, ProcessEnv, SecretError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Variable overriding the reference sentinel
pub const SENTINEL_VAR: &str = "ENVSECRETS_SENTINEL";
/// Variable selecting the [`EmptyValuePolicy`] (`allow` or `unset`)
pub const EMPTY_VALUES_VAR: &str = "ENVSECRETS_EMPTY_VALUES";

/// How a local variable that is set to the empty string is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyValuePolicy {
    /// Return the empty string; only absent variables are errors
    #[default]
    Allow,
    /// Report empty variables as [`SecretError::EnvVarNotSet`]
    TreatAsUnset,
}

impl FromStr for EmptyValuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "unset" | "treat-as-unset" | "treatasunset" => Ok(Self::TreatAsUnset),
            _ => Err(format!(
                "Unknown empty value policy: {s} (expected 'allow' or 'unset')"
            )),
        }
    }
}

/// Configuration for a [`SecretEnv`](crate::SecretEnv)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Leading character that marks a provider reference
    pub sentinel: char,
    /// Treatment of variables set to the empty string
    pub empty_values: EmptyValuePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL,
            empty_values: EmptyValuePolicy::default(),
        }
    }
}

impl ResolverConfig {
    /// [`from_store`](Self::from_store) over the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_store`](Self::from_store).
    pub fn from_env() -> Result<Self, SecretError> {
        Self::from_store(&ProcessEnv)
    }

    /// Read overrides from `ENVSECRETS_SENTINEL` and `ENVSECRETS_EMPTY_VALUES`,
    /// falling back to defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Configuration`] if a variable is set to an
    /// unusable value.
    pub fn from_store(store: &dyn EnvStore) -> Result<Self, SecretError> {
        let mut config = Self::default();

        if let Some(sentinel) = store.var(SENTINEL_VAR) {
            let mut chars = sentinel.chars();
            config.sentinel = match (chars.next(), chars.next()) {
                (Some(c), None) if !c.is_ascii_alphanumeric() => c,
                _ => {
                    return Err(SecretError::Configuration {
                        setting: SENTINEL_VAR.to_string(),
                        message: format!(
                            "expected a single non-alphanumeric character, got '{sentinel}'"
                        ),
                    });
                }
            };
        }

        if let Some(policy) = store.var(EMPTY_VALUES_VAR) {
            config.empty_values =
                policy
                    .parse()
                    .map_err(|message| SecretError::Configuration {
                        setting: EMPTY_VALUES_VAR.to_string(),
                        message,
                    })?;
        }

        Ok(config)
    }
}
