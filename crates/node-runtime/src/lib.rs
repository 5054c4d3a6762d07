//! # Node Runtime Library
//!
//! Bootstrap glue for the session relay: configuration, the demo service
//! handlers, and the container that attaches them to an in-memory network.
//! The main entry point is the `main.rs` binary.

pub mod container;
pub mod handlers;

pub use container::{
    ConfigError, ContainerError, RunningService, RuntimeConfig, ServiceContainer, ServiceNames,
};
pub use handlers::{LoginPayload, ScriptServiceHandler, TestServiceHandler};
