use thiserror::Error;

use super::events::EventKind;

/// Error a listener reports for the batch it was handed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A listener failure as recorded by the dispatcher.
///
/// Never propagated to the caller of `dispatch`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("listener `{listener}` failed handling {kind} events from `{cache}`: {reason}")]
pub struct ListenerFailure {
    pub listener: String,
    pub kind: EventKind,
    pub cache: String,
    pub reason: String,
}
