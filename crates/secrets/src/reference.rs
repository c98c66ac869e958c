//! Provider reference grammar
//!
//! A reference is `<sentinel><provider>:<path>[:<key>]`, for example
//! `@aws:dev/app:serviceaccount` or `@env:RABBITMQ_HOST`. Provider and key
//! segments use `[A-Za-z0-9_-]`; paths additionally allow `/` so they can
//! address hierarchical secret names. Because paths absorb `/`, a key is
//! only split off by a trailing `:` segment.

use crate::SecretError;
use serde::Serialize;
use std::fmt;

/// Leading character marking a lookup key as a provider reference
pub const DEFAULT_SENTINEL: char = '@';

const ALLOWED_CHARACTERS: &str = "allowed: a-z A-Z 0-9 _ - and / in paths";

/// A decoded provider reference.
///
/// `Display` renders the canonical form with the sentinel the reference was
/// parsed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretReference {
    /// Lowercased provider tag (`aws`, `env`, ...)
    pub provider: String,
    /// Remote document locator, or local variable name for `env`
    pub path: String,
    /// Field within the document, if the reference carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Sentinel the reference was written with
    #[serde(skip)]
    sentinel: char,
}

impl SecretReference {
    /// Create a reference from already-validated parts, written with
    /// [`DEFAULT_SENTINEL`].
    #[must_use]
    pub fn new(provider: impl Into<String>, path: impl Into<String>, key: Option<String>) -> Self {
        Self {
            provider: provider.into().to_ascii_lowercase(),
            path: path.into(),
            key,
            sentinel: DEFAULT_SENTINEL,
        }
    }

    /// Use `sentinel` when the reference is displayed
    #[must_use]
    pub const fn with_sentinel(mut self, sentinel: char) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Sentinel the reference is displayed with
    #[must_use]
    pub const fn sentinel(&self) -> char {
        self.sentinel
    }

    /// Whether `raw` should be treated as a reference rather than a plain
    /// variable name.
    #[must_use]
    pub fn is_reference(raw: &str, sentinel: char) -> bool {
        raw.starts_with(sentinel)
    }

    /// Parse a full reference including its sentinel.
    ///
    /// The whole string must match the grammar. Per-provider key arity is
    /// not checked here; see [`ProviderRegistry::dispatch`](crate::ProviderRegistry::dispatch).
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::InvalidFormat`] when the sentinel is missing,
    /// a segment is empty, or a segment contains a disallowed character.
    pub fn parse(raw: &str, sentinel: char) -> Result<Self, SecretError> {
        let invalid = || {
            SecretError::invalid_format(
                raw,
                format!("invalid characters ({ALLOWED_CHARACTERS}) or structure"),
            )
        };

        let body = raw.strip_prefix(sentinel).ok_or_else(|| {
            SecretError::invalid_format(raw, format!("reference must start with '{sentinel}'"))
        })?;

        let (provider, rest) = body.split_once(':').ok_or_else(invalid)?;
        if !is_segment(provider, false) {
            return Err(invalid());
        }

        let (path, key) = match rest.rsplit_once(':') {
            Some((path, key)) => (path, Some(key)),
            None => (rest, None),
        };

        if !is_segment(path, true) {
            return Err(invalid());
        }
        if let Some(key) = key
            && !is_segment(key, false)
        {
            return Err(invalid());
        }

        Ok(Self::new(provider, path, key.map(str::to_string)).with_sentinel(sentinel))
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", self.sentinel, self.provider, self.path)?;
        if let Some(key) = &self.key {
            write!(f, ":{key}")?;
        }
        Ok(())
    }
}

fn is_segment(segment: &str, allow_slash: bool) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || (allow_slash && c == '/'))
}
