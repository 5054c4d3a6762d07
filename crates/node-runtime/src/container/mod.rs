//! # Service Container
//!
//! Holds the services hosted by the runtime and manages their lifecycle.

pub mod config;
pub mod services;

pub use config::{ConfigError, RuntimeConfig, ServiceNames};
pub use services::{ContainerError, RunningService, ServiceContainer};
