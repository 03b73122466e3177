//! Logging configuration using tracing.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::errors::{Result, SyncError};

/// Initialize logging.
///
/// `RUST_LOG` wins over `level`; an unparsable `level` falls back to `info`.
/// The AWS SDK crates are capped at `warn` unless `RUST_LOG` says otherwise,
/// their `info` output drowns the per-object upload lines.
pub fn init(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| SyncError::Config(format!("logger already initialized: {e}")))
}

fn default_directives(level: &str) -> String {
    format!("{level},aws_config=warn,aws_smithy_runtime=warn,aws_sdk_s3=warn")
}
