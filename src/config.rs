//! Azure Document Intelligence configuration, read from the environment.

use std::{env, error, fmt};

use crate::prelude::*;

/// Environment variable holding the service endpoint URL.
pub const ENDPOINT_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT";

/// Environment variable holding the service access key.
pub const KEY_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_KEY";

/// Environment variable overriding the REST API version.
pub const API_VERSION_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_API_VERSION";

/// The REST API version we were written against.
pub const DEFAULT_API_VERSION: &str = "2024-11-30";

/// Credentials and endpoint for the remote service.
#[derive(Clone)]
pub struct AzureCredentials {
    /// Base URL of the resource, without a trailing slash.
    pub endpoint: String,

    /// Access key, sent as `Ocp-Apim-Subscription-Key`.
    pub key: String,

    /// REST API version.
    pub api_version: String,
}

impl AzureCredentials {
    /// Build credentials directly.
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            key: key.into(),
            api_version: DEFAULT_API_VERSION.to_owned(),
        }
    }

    /// Load credentials from the environment. Empty values count as missing.
    pub fn from_env() -> Result<Self, CredentialsError> {
        let endpoint = non_empty_var(ENDPOINT_VAR);
        let key = non_empty_var(KEY_VAR);
        let (endpoint, key) = match (endpoint, key) {
            (Some(endpoint), Some(key)) => (endpoint, key),
            (endpoint, key) => {
                let mut missing = vec![];
                if endpoint.is_none() {
                    missing.push(ENDPOINT_VAR);
                }
                if key.is_none() {
                    missing.push(KEY_VAR);
                }
                return Err(CredentialsError { missing });
            }
        };
        let mut creds = Self::new(endpoint, key);
        if let Some(api_version) = non_empty_var(API_VERSION_VAR) {
            creds.api_version = api_version;
        }
        Ok(creds)
    }
}

// Never print the key.
impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .field("api_version", &self.api_version)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// The remote service is not configured.
///
/// This is kept as a concrete type so that callers can tell it apart from a
/// failed remote call using [`anyhow::Error::downcast_ref`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialsError {
    /// The variables that were missing or empty.
    pub missing: Vec<&'static str>,
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Azure Document Intelligence credentials not found. Please set {}",
            self.missing.join(" and ")
        )
    }
}

impl error::Error for CredentialsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let creds = AzureCredentials::new("https://example.com///", "k");
        assert_eq!(creds.endpoint, "https://example.com");
        assert_eq!(creds.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_debug_hides_key() {
        let creds = AzureCredentials::new("https://example.com", "super-secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_credentials_error_names_variables() {
        let err = CredentialsError {
            missing: vec![ENDPOINT_VAR, KEY_VAR],
        };
        let msg = err.to_string();
        assert!(msg.contains("credentials not found"));
        assert!(msg.contains(ENDPOINT_VAR));
        assert!(msg.contains(KEY_VAR));
    }

    #[test]
    fn test_credentials_error_survives_anyhow() {
        let err = anyhow::Error::new(CredentialsError {
            missing: vec![KEY_VAR],
        })
        .context("while analyzing");
        assert!(err.downcast_ref::<CredentialsError>().is_some());
    }
}
