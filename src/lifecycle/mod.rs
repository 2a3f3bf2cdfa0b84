//! Runtime wiring and observability setup.
//!
//! - [`MemoryServer`] - spawns in-memory backends and hands out stores wired to them
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod memory_server;
pub mod tracing;

pub use self::memory_server::*;
pub use self::tracing::*;
