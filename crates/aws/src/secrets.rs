//! AWS Secrets Manager fetcher with auto-negotiating dual-mode (HTTP + CLI)

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use envsecrets::{FetchError, SecretEnvBuilder, SecretFetcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::process::Command;

/// Provider tag for AWS references (`@aws:dev/app:password`)
pub const PROVIDER: &str = "aws";

/// Version stage requested when none is configured
pub const DEFAULT_VERSION_STAGE: &str = "AWSCURRENT";

/// Configuration for AWS Secrets Manager fetches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsFetcherConfig {
    /// Region to query (falls back to the SDK/CLI default chain)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Version stage (AWSCURRENT unless a version ID is pinned)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_stage: Option<String>,

    /// Pin a specific version ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl AwsFetcherConfig {
    /// Read the region from `AWS_REGION`, leaving everything else default
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION").ok().filter(|r| !r.is_empty()),
            ..Self::default()
        }
    }

    /// Use the given region
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Use the given version stage
    #[must_use]
    pub fn with_version_stage(mut self, stage: impl Into<String>) -> Self {
        self.version_stage = Some(stage.into());
        self
    }

    /// The version stage to request, if any
    ///
    /// An explicit stage is always sent. Otherwise `AWSCURRENT` is requested
    /// only when no version ID is pinned, since Secrets Manager rejects a
    /// stage that does not label the pinned version.
    #[must_use]
    pub fn version_stage(&self) -> Option<&str> {
        self.version_stage.as_deref().or_else(|| {
            self.version_id
                .is_none()
                .then_some(DEFAULT_VERSION_STAGE)
        })
    }
}

/// Fetches secret documents from AWS Secrets Manager
///
/// Mode is auto-negotiated based on environment:
/// - If `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` are set → HTTP mode
/// - Otherwise → CLI mode (uses `aws` CLI)
///
/// The reference path is passed as the secret ID, so it may be a secret
/// name (`dev/app`) or an ARN-free hierarchical name.
pub struct AwsSecretsFetcher {
    config: AwsFetcherConfig,
    http_client: Option<Client>,
}

impl std::fmt::Debug for AwsSecretsFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsFetcher")
            .field("mode", &if self.can_use_http() { "http" } else { "cli" })
            .field("config", &self.config)
            .finish()
    }
}

impl AwsSecretsFetcher {
    /// Create a new fetcher with auto-detected mode
    ///
    /// If AWS credentials are available in environment, initializes the SDK
    /// client. Otherwise, CLI mode will be used.
    pub async fn new(config: AwsFetcherConfig) -> Self {
        let http_client = if Self::http_credentials_available() {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = &config.region {
                loader = loader.region(aws_config::Region::new(region.clone()));
            }
            Some(Client::new(&loader.load().await))
        } else {
            None
        };

        tracing::debug!(
            mode = if http_client.is_some() { "http" } else { "cli" },
            region = ?config.region,
            "AWS Secrets Manager fetcher ready"
        );

        Self {
            config,
            http_client,
        }
    }

    /// Create a fetcher that always shells out to the `aws` CLI
    #[must_use]
    pub const fn cli_only(config: AwsFetcherConfig) -> Self {
        Self {
            config,
            http_client: None,
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &AwsFetcherConfig {
        &self.config
    }

    /// Check if HTTP credentials are available in environment
    fn http_credentials_available() -> bool {
        std::env::var("AWS_ACCESS_KEY_ID").is_ok() && std::env::var("AWS_SECRET_ACCESS_KEY").is_ok()
    }

    /// Check if this fetcher can use HTTP mode
    const fn can_use_http(&self) -> bool {
        self.http_client.is_some()
    }

    /// Fetch using the AWS SDK (HTTP mode)
    async fn fetch_http(&self, client: &Client, secret_id: &str) -> Result<String, FetchError> {
        let mut request = client.get_secret_value().secret_id(secret_id);

        if let Some(stage) = self.config.version_stage() {
            request = request.version_stage(stage);
        }

        if let Some(version_id) = &self.config.version_id {
            request = request.version_id(version_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::new(format!("AWS Secrets Manager error: {e}")))?;

        response
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| FetchError::new("Secret has no string value (may be binary)"))
    }

    /// Arguments for `aws secretsmanager get-secret-value`
    fn cli_args(&self, secret_id: &str) -> Vec<String> {
        let mut args = vec![
            "secretsmanager".to_string(),
            "get-secret-value".to_string(),
            "--secret-id".to_string(),
            secret_id.to_string(),
            "--query".to_string(),
            "SecretString".to_string(),
            "--output".to_string(),
            "text".to_string(),
        ];

        if let Some(stage) = self.config.version_stage() {
            args.push("--version-stage".to_string());
            args.push(stage.to_string());
        }

        if let Some(version_id) = &self.config.version_id {
            args.push("--version-id".to_string());
            args.push(version_id.clone());
        }

        if let Some(region) = &self.config.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }

        args
    }

    /// Fetch using the AWS CLI
    async fn fetch_cli(&self, secret_id: &str) -> Result<String, FetchError> {
        let output = Command::new("aws")
            .args(self.cli_args(secret_id))
            .output()
            .await
            .map_err(|e| FetchError::new(format!("Failed to execute aws CLI: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::new(format!("aws CLI failed: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl SecretFetcher for AwsSecretsFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        // Try HTTP mode if available
        if let Some(client) = &self.http_client {
            return self.fetch_http(client, path).await;
        }

        // Fallback to CLI
        self.fetch_cli(path).await
    }
}

/// Registers AWS Secrets Manager on a [`SecretEnvBuilder`]
pub trait AwsSecretEnvExt {
    /// Serve `@aws:` references through `fetcher`
    #[must_use]
    fn aws(self, fetcher: AwsSecretsFetcher) -> Self;
}

impl AwsSecretEnvExt for SecretEnvBuilder {
    fn aws(self, fetcher: AwsSecretsFetcher) -> Self {
        self.document_provider(PROVIDER, Arc::new(fetcher))
    }
}
