//! Local environment access

use std::collections::HashMap;

/// Read access to a set of environment variables.
///
/// Returns `None` only when the variable is absent; a variable set to the
/// empty string is `Some("")`.
pub trait EnvStore: Send + Sync {
    /// Look up a variable by name.
    fn var(&self, name: &str) -> Option<String>;
}

/// The current process environment
///
/// Values that are not valid UTF-8 are treated as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var_os(name).and_then(|value| value.into_string().ok())
    }
}

impl EnvStore for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_env_present_and_empty() {
        temp_env::with_vars(
            [
                ("ENVSECRETS_STORE_SET", Some("value")),
                ("ENVSECRETS_STORE_EMPTY", Some("")),
                ("ENVSECRETS_STORE_UNSET", None),
            ],
            || {
                let store = ProcessEnv;
                assert_eq!(store.var("ENVSECRETS_STORE_SET").as_deref(), Some("value"));
                assert_eq!(store.var("ENVSECRETS_STORE_EMPTY").as_deref(), Some(""));
                assert_eq!(store.var("ENVSECRETS_STORE_UNSET"), None);
            },
        );
    }

    #[test]
    fn test_map_store() {
        let store = HashMap::from([("HOST".to_string(), "localhost".to_string())]);
        assert_eq!(store.var("HOST").as_deref(), Some("localhost"));
        assert_eq!(store.var("PORT"), None);
    }
}
