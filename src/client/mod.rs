//! The API client seam.
//!
//! - [`ResourceApi`] - the contract stores and records call
//! - [`ClientError`] / [`ApiError`] - what a failed call returns
//!
//! # Testing
//!
//! See [`mock`] for an expectation-based client that records every call.

pub mod api;
pub mod error;
pub mod mock;

pub use api::*;
pub use error::*;
