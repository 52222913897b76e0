//! Azure OpenAI settings for the chat-completions runner.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use super::{ConfigError, required};

const DEFAULT_API_VERSION: &str = "2024-06-01";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Language model endpoint settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AZURE")]
pub struct LlmSettings {
    /// Resource endpoint, e.g. `https://example.openai.azure.com`.
    pub api_base: Option<String>,
    /// API key sent in the `api-key` header.
    pub api_key: Option<String>,
    /// REST API version.
    pub api_version: Option<String>,
    /// Chat model deployment name.
    pub openai_deployment: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

impl LlmSettings {
    /// Parsed resource endpoint.
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let raw = required(self.api_base.as_deref(), "AZURE_API_BASE")?;
        Url::parse(raw).map_err(|err| ConfigError::Invalid {
            key: "AZURE_API_BASE",
            message: err.to_string(),
        })
    }

    /// API key.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        required(self.api_key.as_deref(), "AZURE_API_KEY")
    }

    /// API version, falling back to a current GA version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .filter(|version| !version.trim().is_empty())
            .unwrap_or(DEFAULT_API_VERSION)
    }

    /// Deployment name.
    pub fn deployment(&self) -> Result<&str, ConfigError> {
        required(self.openai_deployment.as_deref(), "AZURE_OPENAI_DEPLOYMENT")
    }

    /// Request timeout, five minutes unless configured.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for language model settings.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load() -> LlmSettings {
        LlmSettings::load_from_iter([OsString::from("schema-pipeline")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env([
            ("AZURE_API_BASE", None::<String>),
            ("AZURE_API_KEY", None::<String>),
            ("AZURE_API_VERSION", None::<String>),
            ("AZURE_OPENAI_DEPLOYMENT", None::<String>),
            ("AZURE_REQUEST_TIMEOUT_SECS", None::<String>),
        ]);

        let settings = load();
        assert_eq!(settings.api_version(), DEFAULT_API_VERSION);
        assert_eq!(settings.request_timeout(), Duration::from_secs(300));
        assert_eq!(
            settings.api_key(),
            Err(ConfigError::Missing { key: "AZURE_API_KEY" })
        );
        assert_eq!(
            settings.deployment(),
            Err(ConfigError::Missing {
                key: "AZURE_OPENAI_DEPLOYMENT"
            })
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("AZURE_API_BASE", Some("https://demo.openai.azure.com".to_owned())),
            ("AZURE_API_KEY", Some("k".to_owned())),
            ("AZURE_API_VERSION", Some("2025-01-01-preview".to_owned())),
            ("AZURE_OPENAI_DEPLOYMENT", Some("gpt-4o".to_owned())),
            ("AZURE_REQUEST_TIMEOUT_SECS", Some("30".to_owned())),
        ]);

        let settings = load();
        assert_eq!(
            settings.api_base().expect("valid url").as_str(),
            "https://demo.openai.azure.com/"
        );
        assert_eq!(settings.api_version(), "2025-01-01-preview");
        assert_eq!(settings.deployment(), Ok("gpt-4o"));
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[rstest]
    fn malformed_endpoint_is_invalid() {
        let settings = LlmSettings {
            api_base: Some("not a url".to_owned()),
            api_key: None,
            api_version: None,
            openai_deployment: None,
            request_timeout_secs: None,
        };
        assert!(matches!(
            settings.api_base(),
            Err(ConfigError::Invalid {
                key: "AZURE_API_BASE",
                ..
            })
        ));
    }
}
