//! Layered settings loaded through `OrthoConfig`.
//!
//! Each settings struct reads its own environment prefix (`DB_`,
//! `PIPELINE_`, `AZURE_`) and optional configuration file. Fields are
//! optional; accessors supply defaults or report what is missing.

mod database;
mod llm;
mod pipeline;

use thiserror::Error;

pub use database::DatabaseSettings;
pub use llm::LlmSettings;
pub use pipeline::{PipelineSettings, RunnerKind};

/// Errors raised when settings are missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting has no value.
    #[error("required setting {key} is not set")]
    Missing {
        /// Environment variable naming the setting.
        key: &'static str,
    },
    /// A setting has a value that cannot be used.
    #[error("setting {key} is invalid: {message}")]
    Invalid {
        /// Environment variable naming the setting.
        key: &'static str,
        /// What is wrong with the value.
        message: String,
    },
}

fn required<'a>(value: Option<&'a str>, key: &'static str) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(ConfigError::Missing { key })
}
