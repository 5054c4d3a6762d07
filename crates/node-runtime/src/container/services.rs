//! # Service Container
//!
//! Attaches every hosted service to one in-memory network and drives its
//! dispatcher as a local task.
//!
//! ```text
//! Console ──LoginReq──→ ScriptService ──LoginReq──→ TestService
//!    ↑                        │  ↑                       │
//!    └────────LoginRes────────┘  └────────LoginRes───────┘
//! ```
//!
//! ## Threading
//!
//! Dispatchers are `!Send`: [`ServiceContainer::start`] and
//! [`ServiceContainer::shutdown`] must run inside a `tokio::task::LocalSet`.

use std::rc::Rc;

use shared_bus::InMemoryNetwork;
use shared_types::PeerId;
use sr_03_dispatcher::{
    DispatchMetrics, DispatchStats, Dispatcher, DispatcherConfig, HandlerRegistry, RegistryError,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::container::config::RuntimeConfig;
use crate::handlers::{ScriptServiceHandler, TestServiceHandler, TEST_NAMESPACE};

/// Errors while assembling the services.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("handler registration failed: {0}")]
    Registry(#[from] RegistryError),
}

/// A service attached to the network with its dispatch loop running.
#[derive(Debug)]
pub struct RunningService {
    pub name: PeerId,
    pub dispatcher: Dispatcher,
    task: JoinHandle<DispatchStats>,
}

/// Every hosted service plus the console peer the runtime calls through.
#[derive(Debug)]
pub struct ServiceContainer {
    network: InMemoryNetwork,
    services: Vec<RunningService>,
    console: Dispatcher,
}

impl ServiceContainer {
    /// Attach and start all services.
    ///
    /// ## Startup Order
    ///
    /// 1. `TestService` (no dependencies)
    /// 2. `ScriptService` (calls `TestService`), plus its startup timer
    /// 3. The console peer
    pub fn start(
        config: &RuntimeConfig,
        metrics: Rc<dyn DispatchMetrics>,
    ) -> Result<Self, ContainerError> {
        let network = InMemoryNetwork::with_capacity(config.inbound_capacity);
        let mut services = Vec::new();

        let registry = HandlerRegistry::new().with_handler(TEST_NAMESPACE, TestServiceHandler)?;
        services.push(spawn_service(&network, config, &config.services.test, registry, &metrics));

        let registry = HandlerRegistry::new()
            .with_handler("", ScriptServiceHandler::new(config.services.test.as_str()))?;
        let script = spawn_service(&network, config, &config.services.script, registry, &metrics);
        let script_name = script.name.clone();
        script.dispatcher.after(config.script_timer(), move || {
            info!(service = %script_name, "Startup timer fired");
        });
        services.push(script);

        let console = spawn_service(
            &network,
            config,
            &config.services.console,
            HandlerRegistry::new(),
            &metrics,
        );
        let console_dispatcher = console.dispatcher.clone();
        services.push(console);

        info!(
            services = ?network.peers(),
            default_timeout_ms = config.default_timeout_ms,
            "All services started"
        );

        Ok(Self {
            network,
            services,
            console: console_dispatcher,
        })
    }

    /// Dispatcher the runtime issues its own calls through.
    pub fn console(&self) -> &Dispatcher {
        &self.console
    }

    pub fn dispatcher(&self, name: &str) -> Option<&Dispatcher> {
        self.services
            .iter()
            .find(|service| service.name.as_str() == name)
            .map(|service| &service.dispatcher)
    }

    pub fn services(&self) -> &[RunningService] {
        &self.services
    }

    pub fn network(&self) -> &InMemoryNetwork {
        &self.network
    }

    /// Detach every service and wait for its dispatch loop to stop.
    ///
    /// Pending calls fail with `Cancelled`. Returns each service's final
    /// statistics, in startup order.
    pub async fn shutdown(self) -> Vec<(PeerId, DispatchStats)> {
        info!("Shutting down services");

        for service in &self.services {
            self.network.detach(&service.name);
        }

        let mut stopped = Vec::with_capacity(self.services.len());
        for service in self.services {
            match service.task.await {
                Ok(stats) => stopped.push((service.name, stats)),
                Err(e) => warn!(service = %service.name, error = %e, "Dispatch loop failed"),
            }
        }
        stopped
    }
}

fn spawn_service(
    network: &InMemoryNetwork,
    config: &RuntimeConfig,
    name: &str,
    registry: HandlerRegistry,
    metrics: &Rc<dyn DispatchMetrics>,
) -> RunningService {
    let (transport, inbound) = network.attach(name);
    let dispatcher = Dispatcher::new(
        DispatcherConfig::new(registry)
            .with_default_timeout(config.default_timeout())
            .with_metrics(Rc::clone(metrics)),
        Rc::new(transport),
    );

    let runner = dispatcher.clone();
    let task = tokio::task::spawn_local(async move { runner.run(inbound).await });

    RunningService {
        name: PeerId::from(name),
        dispatcher,
        task,
    }
}
