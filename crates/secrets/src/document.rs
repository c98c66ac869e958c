//! Decoded secret documents

use crate::{SecretError, SecureSecret};
use serde_json::{Map, Value};

/// The field/value mapping of one remote secret.
///
/// Remote providers store several related values in a single JSON object
/// (`{"username":"app","password":"..."}`); a reference selects one field.
pub struct SecretDocument {
    fields: Map<String, Value>,
}

impl SecretDocument {
    /// Decode a raw payload fetched from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::DocumentDecodeFailure`] if the payload is not
    /// valid JSON or is not a JSON object.
    pub fn decode(path: &str, raw: &str) -> Result<Self, SecretError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| SecretError::DocumentDecodeFailure {
                path: path.to_string(),
                message: format!("Secret is not valid JSON: {e}"),
            })?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(SecretError::DocumentDecodeFailure {
                path: path.to_string(),
                message: format!("Expected a JSON object, found {}", kind(&other)),
            }),
        }
    }

    /// Extract one field as a secret value.
    ///
    /// String fields are returned as-is; any other JSON value is returned in
    /// its compact JSON form (`42`, `true`, `null`, `{"a":1}`).
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::SecretKeyNotFound`] if the field is absent.
    pub fn field(&self, path: &str, key: &str) -> Result<SecureSecret, SecretError> {
        let value = self
            .fields
            .get(key)
            .ok_or_else(|| SecretError::SecretKeyNotFound {
                key: key.to_string(),
                path: path.to_string(),
            })?;

        Ok(SecureSecret::new(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    /// Field names present in the document, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for SecretDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretDocument")
            .field("keys", &self.keys())
            .finish()
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{"serviceaccount":"marcel","secretkey":"supersecret","port":5432,"tls":true}"#;

    #[test]
    fn test_field_string() {
        let document = SecretDocument::decode("dev/app", DOCUMENT).unwrap();
        assert_eq!(
            document.field("dev/app", "serviceaccount").unwrap().expose(),
            "marcel"
        );
    }

    #[test]
    fn test_field_scalars_render_as_json() {
        let document = SecretDocument::decode("dev/app", DOCUMENT).unwrap();
        assert_eq!(document.field("dev/app", "port").unwrap().expose(), "5432");
        assert_eq!(document.field("dev/app", "tls").unwrap().expose(), "true");
    }

    #[test]
    fn test_field_missing() {
        let document = SecretDocument::decode("dev/app", DOCUMENT).unwrap();
        let err = document.field("dev/app", "idonotexist").unwrap_err();
        match err {
            SecretError::SecretKeyNotFound { key, path } => {
                assert_eq!(key, "idonotexist");
                assert_eq!(path, "dev/app");
            }
            other => panic!("Expected SecretKeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_invalid_json() {
        let err = SecretDocument::decode("dev/app", "plain-text-secret").unwrap_err();
        assert!(matches!(err, SecretError::DocumentDecodeFailure { .. }));
    }

    #[test]
    fn test_decode_non_object() {
        let err = SecretDocument::decode("dev/app", "[1,2,3]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_debug_hides_values() {
        let document = SecretDocument::decode("dev/app", DOCUMENT).unwrap();
        let debug = format!("{document:?}");
        assert!(debug.contains("serviceaccount"));
        assert!(!debug.contains("supersecret"));
    }
}
