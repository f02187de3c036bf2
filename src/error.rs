use std::path::PathBuf;

use thiserror::Error;

use crate::config::LoadError;
use crate::policy::ConfigurationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] LoadError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse events from `{path}`: {source}")]
    Events {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to render output: {0}")]
    Render(String),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl AppError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::render(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        Self::render(err.to_string())
    }
}
