//! The reactive cache.
//!
//! # Main Components
//!
//! - [`ResourceStore`] - authoritative list of records plus cached query results
//! - [`Record`] - one cached resource with its own `save`/`update`/`delete`
//! - [`RecordOwner`] - the back-reference a record uses to leave its store

pub mod record;
pub mod resource_store;

pub use record::*;
pub use resource_store::*;
