//! Runtime bootstrap for hosts embedding the cache.

pub mod error;
pub mod telemetry;

use std::path::Path;

use crate::config::{self, Settings};

use self::error::InfraError;

/// Load settings and install the global tracing subscriber.
///
/// Call once at process start; a second call fails because the subscriber is
/// already set.
pub fn bootstrap(config_file: Option<&Path>) -> Result<Settings, InfraError> {
    let settings = config::load_from(config_file)?;
    telemetry::init(&settings.logging)?;
    Ok(settings)
}
