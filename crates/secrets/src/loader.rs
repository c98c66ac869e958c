//! Env file loading
//!
//! Populates the process environment from a dotenv file before lookups run.
//! Parsing is delegated to `dotenvy`; variables already present in the
//! environment are never overridden.

use crate::SecretError;
use std::path::{Path, PathBuf};

/// Default env file name, searched for in the current directory and its
/// ancestors
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Load an env file into the process environment.
///
/// With `Some(path)` the file must exist. With `None` the nearest `.env` is
/// loaded if there is one; its absence is not an error.
///
/// Returns the path that was loaded, if any.
///
/// # Errors
///
/// Returns [`SecretError::EnvFile`] if an explicit file is missing, or if
/// any file cannot be read or parsed.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, SecretError> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| env_file_error(path, &e))?;
            tracing::debug!(path = %path.display(), "Loaded env file");
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(found) => {
                tracing::debug!(path = %found.display(), "Loaded env file");
                Ok(Some(found))
            }
            Err(e) if e.not_found() => {
                tracing::debug!("No {DEFAULT_ENV_FILE} file found, skipping");
                Ok(None)
            }
            Err(e) => Err(env_file_error(Path::new(DEFAULT_ENV_FILE), &e)),
        },
    }
}

fn env_file_error(path: &Path, error: &dotenvy::Error) -> SecretError {
    SecretError::EnvFile {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ENVSECRETS_LOADER_TEST=from-file").unwrap();

        temp_env::with_var_unset("ENVSECRETS_LOADER_TEST", || {
            let loaded = load_env_file(Some(file.path())).unwrap();
            assert_eq!(loaded.as_deref(), Some(file.path()));
            assert_eq!(
                std::env::var("ENVSECRETS_LOADER_TEST").as_deref(),
                Ok("from-file")
            );
        });
    }

    #[test]
    fn test_load_does_not_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ENVSECRETS_LOADER_KEEP=from-file").unwrap();

        temp_env::with_var("ENVSECRETS_LOADER_KEEP", Some("from-process"), || {
            load_env_file(Some(file.path())).unwrap();
            assert_eq!(
                std::env::var("ENVSECRETS_LOADER_KEEP").as_deref(),
                Ok("from-process")
            );
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.env");

        let err = load_env_file(Some(&missing)).unwrap_err();
        assert!(matches!(err, SecretError::EnvFile { .. }));
        assert!(err.to_string().contains("missing.env"));
    }
}
