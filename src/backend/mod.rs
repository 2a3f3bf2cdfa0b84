//! In-process stand-in for a JSON:API server, one actor per resource type.

pub mod memory;

pub use memory::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Channel capacity used by [`new`].
pub const DEFAULT_BUFFER_SIZE: usize = 32;

/// Creates a backend for `resource_type` that numbers new resources "1", "2", ...
pub fn new(resource_type: impl Into<String>) -> (MemoryBackend, MemoryClient) {
    let id_counter = Arc::new(AtomicU64::new(1));
    let next_id = move || id_counter.fetch_add(1, Ordering::SeqCst).to_string();

    MemoryBackend::new(resource_type, DEFAULT_BUFFER_SIZE, next_id)
}
