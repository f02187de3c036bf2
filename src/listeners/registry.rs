//! Listener registry.
//!
//! Holds one ordered sequence of listener handles per [`EventKind`]. The
//! registry is filled during startup through `&mut self` and then shared
//! behind an `Arc`, after which it can no longer change.

use std::fmt;
use std::sync::Arc;

use super::error::ListenerError;
use super::events::{CacheEvent, EventKind};

/// Callback invoked with one batch of same-kind events.
pub type ListenerFn = dyn Fn(&[CacheEvent]) -> Result<(), ListenerError> + Send + Sync;

/// A named, cloneable listener callback.
#[derive(Clone)]
pub struct ListenerHandle {
    name: Arc<str>,
    callback: Arc<ListenerFn>,
}

impl ListenerHandle {
    pub fn new<F>(name: impl Into<Arc<str>>, callback: F) -> Self
    where
        F: Fn(&[CacheEvent]) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }

    pub fn from_arc(name: impl Into<Arc<str>>, callback: Arc<ListenerFn>) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, events: &[CacheEvent]) -> Result<(), ListenerError> {
        (self.callback)(events)
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The set of kinds one listener implementation handles.
///
/// Each present callback is registered under its own kind; absent ones
/// leave that kind untouched.
#[derive(Clone, Debug)]
pub struct ListenerCapabilities {
    name: Arc<str>,
    handlers: [Option<ListenerHandle>; 4],
}

impl ListenerCapabilities {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            handlers: [None, None, None, None],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach `callback` for `kind`, replacing any earlier one.
    pub fn with<F>(mut self, kind: EventKind, callback: F) -> Self
    where
        F: Fn(&[CacheEvent]) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.handlers[kind.index()] = Some(ListenerHandle::new(Arc::clone(&self.name), callback));
        self
    }

    pub fn on_created<F>(self, callback: F) -> Self
    where
        F: Fn(&[CacheEvent]) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.with(EventKind::Created, callback)
    }

    pub fn on_updated<F>(self, callback: F) -> Self
    where
        F: Fn(&[CacheEvent]) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.with(EventKind::Updated, callback)
    }

    pub fn on_expired<F>(self, callback: F) -> Self
    where
        F: Fn(&[CacheEvent]) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.with(EventKind::Expired, callback)
    }

    pub fn on_removed<F>(self, callback: F) -> Self
    where
        F: Fn(&[CacheEvent]) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.with(EventKind::Removed, callback)
    }

    /// Same callback for every kind.
    pub fn for_all_kinds(name: impl Into<Arc<str>>, callback: Arc<ListenerFn>) -> Self {
        let name = name.into();
        let handle = ListenerHandle::from_arc(Arc::clone(&name), callback);
        Self {
            name,
            handlers: [
                Some(handle.clone()),
                Some(handle.clone()),
                Some(handle.clone()),
                Some(handle),
            ],
        }
    }

    pub fn handles(&self, kind: EventKind) -> bool {
        self.handlers[kind.index()].is_some()
    }
}

/// Per-kind, registration-ordered listener sequences.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    by_kind: [Vec<ListenerHandle>; 4],
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener` to the sequence for `kind`.
    pub fn register(&mut self, kind: EventKind, listener: ListenerHandle) {
        self.by_kind[kind.index()].push(listener);
    }

    /// Register every callback present in `capabilities`.
    pub fn register_capabilities(&mut self, capabilities: ListenerCapabilities) {
        for (slot, handler) in self.by_kind.iter_mut().zip(capabilities.handlers) {
            if let Some(handle) = handler {
                slot.push(handle);
            }
        }
    }

    pub fn listeners(&self, kind: EventKind) -> &[ListenerHandle] {
        &self.by_kind[kind.index()]
    }

    pub fn len(&self, kind: EventKind) -> usize {
        self.by_kind[kind.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.iter().all(Vec::is_empty)
    }

    /// Freeze the registry for dispatch.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
