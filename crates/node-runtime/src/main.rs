//! # Session Relay Node Runtime
//!
//! Hosts the relay services on one single-threaded runtime.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (from `SR_*` environment variables)
//! 2. Load and validate the runtime configuration
//! 3. Build a current-thread tokio runtime and a `LocalSet`
//! 4. Attach and start the services
//! 5. Optionally send one demo request through `ScriptService`
//! 6. Run until Ctrl+C, then shut every dispatcher down

use std::rc::Rc;

use anyhow::{Context, Result};
use tokio::task::LocalSet;
use tracing::{debug, info, warn};

use node_runtime::handlers::{LoginPayload, LOGIN_REQ};
use node_runtime::{RuntimeConfig, ServiceContainer};
use relay_telemetry::{encode_metrics, init_telemetry, PrometheusDispatchMetrics, TelemetryConfig};
use sr_03_dispatcher::{DispatchMetrics, NoopDispatchMetrics};

/// The runtime hosting every service.
struct NodeRuntime {
    config: RuntimeConfig,
    metrics_enabled: bool,
}

impl NodeRuntime {
    fn new(config: RuntimeConfig, metrics_enabled: bool) -> Self {
        Self {
            config,
            metrics_enabled,
        }
    }

    /// Start the services and block until Ctrl+C.
    async fn run(self) -> Result<()> {
        info!("===========================================");
        info!("  Session Relay Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let metrics: Rc<dyn DispatchMetrics> = if self.metrics_enabled {
            Rc::new(PrometheusDispatchMetrics::new())
        } else {
            Rc::new(NoopDispatchMetrics)
        };

        let container = ServiceContainer::start(&self.config, metrics)
            .context("Failed to start services")?;

        if self.config.demo_request {
            self.send_demo_request(&container).await;
        }

        info!("Node is running. Press Ctrl+C to stop.");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;

        self.shutdown(container).await;
        Ok(())
    }

    /// One request through the script service, which chains a call to the
    /// test service before answering.
    async fn send_demo_request(&self, container: &ServiceContainer) {
        let result = container
            .console()
            .call(
                self.config.services.script.as_str(),
                LOGIN_REQ,
                LoginPayload::new("demo").to_value(),
            )
            .await;

        match result {
            Ok(reply) => info!(
                msg_type = %reply.msg_type,
                payload = %reply.payload,
                "Demo request answered"
            ),
            Err(e) => warn!(error = %e, "Demo request failed"),
        }
    }

    async fn shutdown(&self, container: ServiceContainer) {
        info!("Initiating graceful shutdown...");

        for (service, stats) in container.shutdown().await {
            info!(
                service = %service,
                requests_received = stats.requests_received,
                requests_sent = stats.requests_sent,
                replies_sent = stats.replies_sent,
                stale_responses = stats.stale_responses,
                handler_failures = stats.handler_failures,
                timed_out = stats.pending.timed_out,
                "Service stopped"
            );
        }

        if self.metrics_enabled {
            match encode_metrics() {
                Ok(text) => debug!(metrics = %text, "Final metrics"),
                Err(e) => warn!(error = %e, "Failed to encode metrics"),
            }
        }

        info!("Shutdown complete");
    }
}

fn main() -> Result<()> {
    let telemetry_config = TelemetryConfig::from_env();
    let metrics_enabled = telemetry_config.metrics_enabled;
    let _telemetry = init_telemetry(telemetry_config).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::load().context("Failed to load runtime configuration")?;
    config.validate().context("Invalid runtime configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    LocalSet::new().block_on(&runtime, NodeRuntime::new(config, metrics_enabled).run())
}
