//! Provider credentials
//!
//! The nonprofit provider needs an API key. Secrets are JSON documents of the
//! form `{"EVERYORG_API": "<key>"}` looked up by id; the bundled
//! [`EnvSecretStore`] reads them from the environment variable named by the id.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Secret id used when none is configured
pub const DEFAULT_SECRET_ID: &str = "CHARITY_API_KEY";

/// Errors that can occur when fetching a secret; all of them are fatal
#[derive(Debug, Error)]
pub enum SecretError {
    /// No secret exists under the id
    #[error("Secret '{0}' is not set")]
    Missing(String),

    /// The secret is not a valid secret document
    #[error("Secret '{id}' is malformed: {reason}")]
    Malformed { id: String, reason: String },
}

/// Credentials for the upstream providers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderSecret {
    #[serde(rename = "EVERYORG_API")]
    pub provider_api_key: String,
}

/// Source of provider credentials
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, id: &str) -> Result<ProviderSecret, SecretError>;
}

/// Reads secret documents from environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, id: &str) -> Result<ProviderSecret, SecretError> {
        let raw = std::env::var(id).map_err(|_| SecretError::Missing(id.to_string()))?;
        parse_secret(id, &raw)
    }
}

/// Parses a secret document, rejecting a blank API key
pub fn parse_secret(id: &str, raw: &str) -> Result<ProviderSecret, SecretError> {
    let secret: ProviderSecret = serde_json::from_str(raw).map_err(|e| SecretError::Malformed {
        id: id.to_string(),
        reason: e.to_string(),
    })?;
    if secret.provider_api_key.trim().is_empty() {
        return Err(SecretError::Malformed {
            id: id.to_string(),
            reason: "EVERYORG_API is empty".to_string(),
        });
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_secret() {
        let secret =
            parse_secret("id", r#"{"EVERYORG_API": "pk_live_123", "OTHER": "x"}"#).unwrap();
        assert_eq!(secret.provider_api_key, "pk_live_123");
    }

    #[test]
    fn test_parse_missing_key_is_malformed() {
        let err = parse_secret("id", r#"{"OTHER": "x"}"#).unwrap_err();
        assert!(matches!(err, SecretError::Malformed { .. }));
    }

    #[test]
    fn test_parse_blank_key_is_malformed() {
        let err = parse_secret("id", r#"{"EVERYORG_API": "  "}"#).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_parse_non_json_is_malformed() {
        assert!(parse_secret("id", "pk_live_123").is_err());
    }

    #[tokio::test]
    async fn test_env_store_missing_variable() {
        let err = EnvSecretStore
            .get_secret("POVERTYATLAS_TEST_SECRET_THAT_IS_NEVER_SET")
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::Missing(_)));
    }
}
