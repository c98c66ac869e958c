//! Subcommand execution

use crate::cli::{Cli, CliError, Commands, EXIT_OK, EXIT_RESOLVE, OkEnvelope};
use envsecrets::loader::load_env_file;
use envsecrets::{ResolverConfig, SecretEnv, SecretReference, SecureSecret};
use envsecrets_aws::{AwsFetcherConfig, AwsSecretEnvExt, AwsSecretsFetcher};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What a command wants written to stdout, and the process exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Text for stdout
    pub stdout: String,
    /// Process exit code
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: EXIT_OK,
        }
    }
}

/// Outcome of one key in `check`
#[derive(Debug, Clone, Serialize)]
struct CheckResult {
    key: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Load the env file chosen on the command line, unless `--no-env-file`.
///
/// Returns the path that was loaded, if any.
///
/// # Errors
///
/// Returns a configuration error if the env file cannot be read or parsed.
pub fn apply_env_file(cli: &Cli) -> Result<Option<PathBuf>, CliError> {
    if cli.no_env_file {
        return Ok(None);
    }
    Ok(load_env_file(cli.env_file.as_deref())?)
}

/// Build the resolver used by the CLI: `ENVSECRETS_*` settings from the
/// environment, plus AWS Secrets Manager under `@aws:`.
///
/// # Errors
///
/// Returns a configuration error if an `ENVSECRETS_*` setting is invalid.
pub async fn build_secret_env(cli: &Cli) -> Result<SecretEnv, CliError> {
    let config = ResolverConfig::from_env()?;
    let aws_config = AwsFetcherConfig {
        region: cli.region.clone(),
        version_stage: cli.version_stage.clone(),
        version_id: None,
    };
    let fetcher = AwsSecretsFetcher::new(aws_config).await;

    Ok(SecretEnv::builder().config(config).aws(fetcher).build())
}

/// Execute the parsed command line.
///
/// # Errors
///
/// Returns the first error that aborts the command. `check` reports
/// per-key failures in its output instead.
pub async fn execute(cli: &Cli) -> Result<CommandOutput, CliError> {
    if let Commands::Parse { reference } = &cli.command {
        let config = ResolverConfig::from_env()?;
        return parse_reference(reference, config.sentinel, cli.json);
    }

    let env = build_secret_env(cli).await?;
    run_with_env(&env, &cli.command, cli.json).await
}

/// Execute a command against an existing resolver.
///
/// # Errors
///
/// See [`execute`].
pub async fn run_with_env(
    env: &SecretEnv,
    command: &Commands,
    json: bool,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Get { keys } => get(env, keys, json).await,
        Commands::Check { keys } => check(env, keys, json).await,
        Commands::Parse { reference } => parse_reference(reference, env.config().sentinel, json),
        Commands::Providers => providers(env, json),
    }
}

async fn get(env: &SecretEnv, keys: &[String], json: bool) -> Result<CommandOutput, CliError> {
    let values = env.resolve_all(keys.iter().cloned()).await?;
    tracing::debug!(count = values.len(), "Resolved keys");

    if json {
        let data: BTreeMap<&str, &str> = values
            .iter()
            .map(|(key, value)| (key.as_str(), value.expose()))
            .collect();
        return Ok(CommandOutput::ok(to_json(&OkEnvelope::new(data))?));
    }

    let stdout = keys
        .iter()
        .map(|key| values.get(key).map_or("", SecureSecret::expose))
        .map(|value| format!("{value}\n"))
        .collect();
    Ok(CommandOutput::ok(stdout))
}

async fn check(env: &SecretEnv, keys: &[String], json: bool) -> Result<CommandOutput, CliError> {
    let lookups = keys.iter().map(|key| async move {
        match env.resolve(key).await {
            Ok(_) => CheckResult {
                key: key.clone(),
                ok: true,
                error: None,
            },
            Err(e) => CheckResult {
                key: key.clone(),
                ok: false,
                error: Some(e.to_string()),
            },
        }
    });
    let results = futures::future::join_all(lookups).await;

    let failed = results.iter().filter(|r| !r.ok).count();
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "Some keys did not resolve");
    }

    let stdout = if json {
        to_json(&OkEnvelope::new(&results))?
    } else {
        results
            .iter()
            .map(|result| match &result.error {
                None => format!("ok     {}\n", result.key),
                Some(error) => format!("error  {}: {error}\n", result.key),
            })
            .collect()
    };

    Ok(CommandOutput {
        stdout,
        exit_code: if failed > 0 { EXIT_RESOLVE } else { EXIT_OK },
    })
}

fn parse_reference(raw: &str, sentinel: char, json: bool) -> Result<CommandOutput, CliError> {
    let reference = SecretReference::parse(raw, sentinel)?;

    if json {
        return Ok(CommandOutput::ok(to_json(&OkEnvelope::new(&reference))?));
    }

    let mut stdout = format!(
        "provider: {}\npath:     {}\n",
        reference.provider, reference.path
    );
    if let Some(key) = &reference.key {
        stdout.push_str(&format!("key:      {key}\n"));
    }
    Ok(CommandOutput::ok(stdout))
}

fn providers(env: &SecretEnv, json: bool) -> Result<CommandOutput, CliError> {
    let providers = env.registry().providers();

    if json {
        return Ok(CommandOutput::ok(to_json(&OkEnvelope::new(providers))?));
    }

    Ok(CommandOutput::ok(
        providers.iter().map(|p| format!("{p}\n")).collect(),
    ))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string(value)
        .map(|json| json + "\n")
        .map_err(|e| CliError::config(format!("Failed to serialize output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EXIT_CLI;
    use async_trait::async_trait;
    use envsecrets::{FetchError, SecretFetcher};
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FixedFetcher;

    #[async_trait]
    impl SecretFetcher for FixedFetcher {
        async fn fetch(&self, path: &str) -> Result<String, FetchError> {
            match path {
                "dev/app" => Ok(r#"{"serviceaccount":"marcel","secretkey":"supersecret"}"#.to_string()),
                _ => Err(FetchError::new("ResourceNotFoundException")),
            }
        }
    }

    fn secret_env() -> SecretEnv {
        let store = HashMap::from([("RABBITMQ_HOST".to_string(), "localhost".to_string())]);
        SecretEnv::builder()
            .env_store(Arc::new(store))
            .document_provider("aws", Arc::new(FixedFetcher))
            .build()
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| (*k).to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_text_keeps_argument_order() {
        let command = Commands::Get {
            keys: keys(&["RABBITMQ_HOST", "@aws:dev/app:serviceaccount"]),
        };
        let output = run_with_env(&secret_env(), &command, false).await.unwrap();

        assert_eq!(output.stdout, "localhost\nmarcel\n");
        assert_eq!(output.exit_code, EXIT_OK);
    }

    #[tokio::test]
    async fn test_get_json() {
        let command = Commands::Get {
            keys: keys(&["@aws:dev/app:secretkey"]),
        };
        let output = run_with_env(&secret_env(), &command, true).await.unwrap();

        assert_eq!(
            output.stdout,
            "{\"status\":\"ok\",\"data\":{\"@aws:dev/app:secretkey\":\"supersecret\"}}\n"
        );
    }

    #[tokio::test]
    async fn test_get_fails_on_first_error() {
        let command = Commands::Get {
            keys: keys(&["RABBITMQ_HOST", "@azure:dev/app:x"]),
        };
        let err = run_with_env(&secret_env(), &command, false)
            .await
            .unwrap_err();

        assert_eq!(crate::cli::exit_code_for(&err), EXIT_CLI);
        assert!(err.to_string().contains("azure"));
    }

    #[tokio::test]
    async fn test_check_reports_each_key_without_values() {
        let command = Commands::Check {
            keys: keys(&["@aws:dev/app:secretkey", "NOTINENV"]),
        };
        let output = run_with_env(&secret_env(), &command, false).await.unwrap();

        assert_eq!(output.exit_code, EXIT_RESOLVE);
        assert!(output.stdout.contains("ok     @aws:dev/app:secretkey"));
        assert!(output.stdout.contains("error  NOTINENV: Environment variable 'NOTINENV' not set"));
        assert!(!output.stdout.contains("supersecret"));
    }

    #[tokio::test]
    async fn test_check_json() {
        let command = Commands::Check {
            keys: keys(&["RABBITMQ_HOST"]),
        };
        let output = run_with_env(&secret_env(), &command, true).await.unwrap();

        assert_eq!(output.exit_code, EXIT_OK);
        assert_eq!(
            output.stdout,
            "{\"status\":\"ok\",\"data\":[{\"key\":\"RABBITMQ_HOST\",\"ok\":true}]}\n"
        );
    }

    #[test]
    fn test_parse_reference_text() {
        let output = parse_reference("@AWS:dev/app:password", '@', false).unwrap();
        assert_eq!(
            output.stdout,
            "provider: aws\npath:     dev/app\nkey:      password\n"
        );
    }

    #[test]
    fn test_parse_reference_json() {
        let output = parse_reference("@env:HOME", '@', true).unwrap();
        assert_eq!(
            output.stdout,
            "{\"status\":\"ok\",\"data\":{\"provider\":\"env\",\"path\":\"HOME\"}}\n"
        );
    }

    #[test]
    fn test_parse_reference_invalid() {
        let err = parse_reference("@env:RABBITMQ=HOST", '@', false).unwrap_err();
        assert_eq!(crate::cli::exit_code_for(&err), EXIT_CLI);
    }

    fn parse_cli(args: &[&str]) -> Cli {
        use clap::Parser;

        temp_env::with_vars(
            [
                ("AWS_REGION", None::<&str>),
                ("ENVSECRETS_ENV_FILE", None),
                ("ENVSECRETS_AWS_VERSION_STAGE", None),
            ],
            || Cli::try_parse_from(args.iter().copied()).unwrap(),
        )
    }

    #[test]
    fn test_apply_env_file_skipped() {
        let cli = parse_cli(&["envsecrets", "--no-env-file", "providers"]);
        assert_eq!(apply_env_file(&cli).unwrap(), None);
    }

    #[test]
    fn test_apply_env_file_missing_explicit_path() {
        let cli = parse_cli(&[
            "envsecrets",
            "--env-file",
            "/nonexistent/envsecrets/test.env",
            "providers",
        ]);
        let err = apply_env_file(&cli).unwrap_err();
        assert_eq!(crate::cli::exit_code_for(&err), EXIT_CLI);
        assert!(err.to_string().contains("test.env"));
    }

    #[test]
    fn test_providers() {
        let output = providers(&secret_env(), false).unwrap();
        assert_eq!(output.stdout, "aws\nenv\n");
    }
}
