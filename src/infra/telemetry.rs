use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the process-wide subscriber and describe the cache counters.
///
/// Fails if another subscriber is already installed.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    tracing_subscriber::registry()
        .with(level_filter(logging.level))
        .with(ErrorLayer::default())
        .with(output_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber not installed: {err}")))
}

/// `RUST_LOG` directives take precedence over the configured level.
fn level_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn output_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span> + 'static,
{
    let layer = fmt::layer().with_target(true);
    match format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// Register descriptions for the cache counters with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tiercache_local_hit_total",
            Unit::Count,
            "Total number of reads served by the scope-local tier."
        );
        describe_counter!(
            "tiercache_external_hit_total",
            Unit::Count,
            "Total number of reads served by the external tier."
        );
        describe_counter!(
            "tiercache_external_miss_total",
            Unit::Count,
            "Total number of reads that missed both tiers."
        );
        describe_counter!(
            "tiercache_forced_miss_total",
            Unit::Count,
            "Total number of reads that skipped the external tier on request."
        );
        describe_counter!(
            "tiercache_external_set_total",
            Unit::Count,
            "Total number of writes forwarded to the external tier."
        );
        describe_counter!(
            "tiercache_memory_evict_total",
            Unit::Count,
            "Total number of in-memory external cache evictions due to capacity."
        );
    });
}
