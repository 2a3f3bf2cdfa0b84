//! Plain data types shared by the store, the client seam and the backend.

pub mod query;
pub mod resource;
pub mod status;

pub use query::*;
pub use resource::*;
pub use status::*;
