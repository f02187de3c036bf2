//! Cache entry lifecycle events.
//!
//! Defines the events the external runtime pushes into the dispatcher.
//! Events always arrive batched by source cache and kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Lifecycle stage an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// An entry was inserted.
    Created,
    /// An existing entry was replaced.
    Updated,
    /// An entry reached its time-to-live.
    Expired,
    /// An entry was removed explicitly.
    Removed,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Created,
        EventKind::Updated,
        EventKind::Expired,
        EventKind::Removed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Expired => "EXPIRED",
            Self::Removed => "REMOVED",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Created => 0,
            Self::Updated => 1,
            Self::Expired => 2,
            Self::Removed => 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cache event kind `{0}`")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| UnknownEventKind(value.to_string()))
    }
}

/// One lifecycle occurrence on one cache entry.
///
/// Keys and values are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEvent {
    pub kind: EventKind,
    /// Name of the cache the entry lives in.
    pub cache: String,
    pub key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
}

impl CacheEvent {
    pub fn new(kind: EventKind, cache: impl Into<String>, key: impl Into<Value>) -> Self {
        Self {
            kind,
            cache: cache.into(),
            key: key.into(),
            value: None,
            old_value: None,
        }
    }

    pub fn created(cache: impl Into<String>, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::new(EventKind::Created, cache, key).with_value(value)
    }

    pub fn updated(
        cache: impl Into<String>,
        key: impl Into<Value>,
        value: impl Into<Value>,
        old_value: impl Into<Value>,
    ) -> Self {
        Self::new(EventKind::Updated, cache, key)
            .with_value(value)
            .with_old_value(old_value)
    }

    pub fn expired(cache: impl Into<String>, key: impl Into<Value>) -> Self {
        Self::new(EventKind::Expired, cache, key)
    }

    pub fn removed(cache: impl Into<String>, key: impl Into<Value>) -> Self {
        Self::new(EventKind::Removed, cache, key)
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_old_value(mut self, old_value: impl Into<Value>) -> Self {
        self.old_value = Some(old_value.into());
        self
    }
}

/// Splits a mixed stream into same-cache, same-kind batches.
///
/// Batches appear in the order their first event was seen; events keep
/// their relative order inside a batch.
pub fn batch_events(events: Vec<CacheEvent>) -> Vec<(EventKind, Vec<CacheEvent>)> {
    let mut batches: Vec<(EventKind, Vec<CacheEvent>)> = Vec::new();
    for event in events {
        let slot = batches
            .iter_mut()
            .find(|(kind, batch)| *kind == event.kind && batch[0].cache == event.cache);
        match slot {
            Some((_, batch)) => batch.push(event),
            None => batches.push((event.kind, vec![event])),
        }
    }
    batches
}
