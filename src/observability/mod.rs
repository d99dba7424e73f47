//! Logging initialization.
//!
//! Structured logging with configurable formats (pretty, compact, JSON).
//! `RUST_LOG` takes precedence over the configured filter.

mod tracing_init;

pub use tracing_init::*;
