//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate.
//!
//! ## What Gets Traced
//!
//! - **Store requests**: one span per call (`load_all`, `load_where`, `create`, ...)
//!   carrying `resource_type` and the query key, an `info` event when the
//!   request settles, a `warn` event with the error when it fails
//! - **Record requests**: `save`, `update` and `delete` spans carrying the record id
//! - **Backend actors**: startup, shutdown and every handled request
//!
//! ## Usage Examples
//!
//! ```bash
//! # Settled requests only
//! RUST_LOG=info cargo run
//!
//! # Request payloads and query options
//! RUST_LOG=debug cargo run
//!
//! # Only the store
//! RUST_LOG=resource_store::store=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` a filtered load looks like:
//!
//! ```text
//! INFO load_where{resource_type=widgets filter={status=draft}}: Loaded count=2 size=3
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
