//! Dispatcher construction parameters.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::domain::registry::HandlerRegistry;
use crate::ports::{DispatchMetrics, NoopDispatchMetrics};

/// Everything a dispatcher needs besides its transport.
pub struct DispatcherConfig {
    /// Handlers for inbound requests.
    pub registry: HandlerRegistry,
    /// Timeout applied by `call` when none is given.
    pub default_timeout: Duration,
    /// Event sink.
    pub metrics: Rc<dyn DispatchMetrics>,
}

impl DispatcherConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            default_timeout: Self::DEFAULT_TIMEOUT,
            metrics: Rc::new(NoopDispatchMetrics),
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Rc<dyn DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(HandlerRegistry::new())
    }
}

impl fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("registry", &self.registry)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}
