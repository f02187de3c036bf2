//! Listener that writes every cache entry event to the log.

use std::sync::Arc;

use serde_json::Value;
use tracing::{Level, debug, enabled, trace};

use super::error::ListenerError;
use super::events::{CacheEvent, EventKind};
use super::registry::{ListenerCapabilities, ListenerFn};

pub const LOGGING_LISTENER_NAME: &str = "logging";
pub const DEFAULT_KEY_ONLY_PREFIXES: &[&str] = &["ImagesCache"];

const TARGET: &str = "cachewire::entries";

/// How a single event is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryLine {
    /// Soft-lock placeholders; sent to trace when trace is on.
    SoftLock(String),
    KeyOnly(String),
    Full(String),
}

impl EntryLine {
    pub fn text(&self) -> &str {
        match self {
            Self::SoftLock(line) | Self::KeyOnly(line) | Self::Full(line) => line,
        }
    }

    /// Level the line is logged at. Soft locks fall back to `debug` when
    /// trace output is off.
    pub fn level(&self, trace_enabled: bool) -> Level {
        match self {
            Self::SoftLock(_) if trace_enabled => Level::TRACE,
            _ => Level::DEBUG,
        }
    }
}

/// Logs each event at `debug` (soft locks at `trace` when enabled), omitting
/// values for expired entries and for caches whose names start with a
/// key-only prefix.
#[derive(Debug, Clone)]
pub struct LoggingListener {
    key_only_prefixes: Vec<String>,
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_ONLY_PREFIXES.iter().map(|p| p.to_string()))
    }
}

impl LoggingListener {
    pub fn new(key_only_prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            key_only_prefixes: key_only_prefixes.into_iter().collect(),
        }
    }

    pub fn key_only_prefixes(&self) -> &[String] {
        &self.key_only_prefixes
    }

    /// Handles all four kinds through one shared callback.
    pub fn capabilities(self) -> ListenerCapabilities {
        let listener = Arc::new(self);
        let callback: Arc<ListenerFn> =
            Arc::new(move |events: &[CacheEvent]| listener.on_events(events));
        ListenerCapabilities::for_all_kinds(LOGGING_LISTENER_NAME, callback)
    }

    pub fn on_events(&self, events: &[CacheEvent]) -> Result<(), ListenerError> {
        if !enabled!(target: TARGET, Level::DEBUG) {
            return Ok(());
        }
        let trace_enabled = enabled!(target: TARGET, Level::TRACE);
        for event in events {
            let line = self.render(event);
            if line.level(trace_enabled) == Level::TRACE {
                trace!(target: TARGET, "{}", line.text());
            } else {
                debug!(target: TARGET, "{}", line.text());
            }
        }
        Ok(())
    }

    pub fn render(&self, event: &CacheEvent) -> EntryLine {
        let head = format!("[cache][{}][{}][key: {}]", event.cache, event.kind, show(&event.key));

        if event.value.as_ref().is_some_and(is_soft_lock) {
            let value = event.value.as_ref().map(show).unwrap_or_default();
            return EntryLine::SoftLock(format!("{head}[value: {value}]"));
        }

        if event.kind == EventKind::Expired || self.is_key_only(&event.cache) {
            return EntryLine::KeyOnly(head);
        }

        EntryLine::Full(format!(
            "{head}[value: {}][old value: {}]",
            show_optional(event.value.as_ref()),
            show_optional(event.old_value.as_ref()),
        ))
    }

    fn is_key_only(&self, cache: &str) -> bool {
        self.key_only_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && cache.starts_with(prefix.as_str()))
    }
}

fn is_soft_lock(value: &Value) -> bool {
    value
        .get("soft_lock")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn show(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn show_optional(value: Option<&Value>) -> String {
    value.map(show).unwrap_or_else(|| "null".to_string())
}
