//! # Resource Store
//!
//! > **A reactive client-side cache for JSON:API resources.**
//!
//! A [`ResourceStore`](store::ResourceStore) sits in front of a JSON:API
//! client. It loads resources, keeps exactly one [`Record`](store::Record) per
//! id, remembers which ids each filtered or related query returned, and
//! tracks whether a request is in flight or has failed. Records save, update
//! and delete themselves through the same client.
//!
//! ## 🏗️ Core Concepts
//!
//! ### One record per id
//! Every query result is merged into the store's record list by id before it
//! is returned. A record you hold is the record the store holds: when a later
//! load brings new attributes for its id, your handle sees them.
//!
//! ### Cached queries hold ids
//! `load_where` and `load_related` cache the ids they returned under their
//! filter or parent key. `where_` and `related` resolve those ids against the
//! live record list, so local edits show up there too. Reloading the same key
//! replaces the cached ids.
//!
//! ### Observable status
//! Stores and records expose `loading()` / `error()` and a `subscribe()`
//! receiver (a `tokio::sync::watch` channel). Each settled request is
//! published as one change.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### Errors are never swallowed
//! A failed request sets the status to ERROR and returns the client's
//! [`ClientError`](client::ClientError) unchanged. Reads never fail: absence
//! is `None` or an empty `Vec`.
//!
//! ### Requests start when called
//! Request methods return a future, but mark the store (or record) as
//! loading immediately, so the status can be read before awaiting.
//!
//! ## 🗺️ Module Tour
//!
//! - [`store`]: [`ResourceStore`](store::ResourceStore) and [`Record`](store::Record).
//! - [`client`]: the [`ResourceApi`](client::ResourceApi) trait stores call,
//!   its errors, and the [`mock`](client::mock) test double.
//! - [`model`]: resources, filters, parent keys, query options and [`Status`](model::Status).
//! - [`backend`]: an in-memory JSON:API backend actor for demos and tests.
//! - [`lifecycle`]: [`MemoryServer`](lifecycle::MemoryServer) wiring and tracing setup.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//!
//! # Run the tests
//! cargo test
//! ```

pub mod backend;
pub mod client;
pub mod lifecycle;
pub mod model;
pub mod store;
