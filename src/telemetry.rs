use std::{io::IsTerminal, sync::Once};

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};
use crate::error::AppError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so that command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), AppError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let ansi = std::io::stderr().is_terminal();
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| AppError::telemetry(format!("failed to install tracing subscriber: {err}")))
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "cachewire_dispatch_batches_total",
            Unit::Count,
            "Total number of non-empty event batches dispatched to listeners."
        );
        describe_counter!(
            "cachewire_dispatch_events_total",
            Unit::Count,
            "Total number of cache entry events dispatched to listeners."
        );
        describe_counter!(
            "cachewire_listener_failures_total",
            Unit::Count,
            "Total number of listener invocations that returned an error or panicked."
        );
        describe_gauge!(
            "cachewire_plan_caches",
            Unit::Count,
            "Number of caches in the most recently built cache plan."
        );
    });
}
