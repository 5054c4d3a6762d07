//! # Relay Telemetry
//!
//! Logging and metrics for the Session Relay.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus collectors in a process-wide registry, fed by
//!   [`PrometheusDispatchMetrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Dispatchers built with `PrometheusDispatchMetrics` now report here.
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SR_SERVICE_NAME` | `session-relay` | Service name in logs |
//! | `SR_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `SR_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `SR_JSON_LOGS` | `false` | JSON log lines (default `true` in containers) |
//! | `SR_METRICS` | `true` | Register Prometheus metrics |

mod config;
mod dispatch;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use dispatch::PrometheusDispatchMetrics;
pub use logging::init_logging;
pub use metrics::{encode_metrics, register_metrics};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    if config.metrics_enabled {
        register_metrics()?;
    }

    init_logging(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active. Logs shutdown on drop.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
