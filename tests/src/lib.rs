//! # Session Relay Test Suite
//!
//! Cross-crate scenarios: several dispatchers attached to one in-memory
//! network, driven on a current-thread runtime with paused time.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs    # Peer fixtures
//!     ├── flows.rs      # Request/reply, chaining, timers
//!     ├── failures.rs   # Timeouts, unhandled types, panics, shutdown
//!     └── telemetry.rs  # Prometheus adapter wired into live dispatchers
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sr-tests
//! cargo test -p sr-tests integration::failures::
//! ```

#![allow(dead_code)]

pub mod integration;
