use thiserror::Error;

/// Fatal misconfiguration detected while building policies or the cache plan.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("cache policy table has no `{key}` entry; a default policy is required")]
    MissingDefault { key: &'static str },
    #[error("invalid cache policy for `{cache}`: {reason}")]
    InvalidPolicy { cache: String, reason: String },
    #[error("invalid cache manifest entry in `{section}`: {reason}")]
    InvalidManifest {
        section: &'static str,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn invalid_policy(cache: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            cache: cache.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_manifest(section: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            section,
            reason: reason.into(),
        }
    }
}
