//! Dispatcher domain: handler registry, configuration and reporting types.

pub mod config;
pub mod outcome;
pub mod registry;
pub mod stats;

pub use config::DispatcherConfig;
pub use outcome::InboundOutcome;
pub use registry::{HandlerRegistry, RegistryError};
pub use stats::DispatchStats;
