//! Cache entry listeners.
//!
//! The external runtime reports entry lifecycle changes in batches of one
//! [`EventKind`] from one cache. A [`ListenerDispatcher`] forwards each batch
//! to every listener registered for that kind:
//!
//! - the [`ListenerRegistry`] is built once at startup, then frozen behind an `Arc`
//! - listeners run in registration order
//! - a failing listener never stops the others, and never reaches the runtime

mod dispatch;
mod error;
mod events;
mod logging;
mod registry;

pub use dispatch::ListenerDispatcher;
pub use error::{ListenerError, ListenerFailure};
pub use events::{CacheEvent, EventKind, UnknownEventKind, batch_events};
pub use logging::{DEFAULT_KEY_ONLY_PREFIXES, EntryLine, LOGGING_LISTENER_NAME, LoggingListener};
pub use registry::{ListenerCapabilities, ListenerFn, ListenerHandle, ListenerRegistry};
