//! # guild-cache
//!
//! Content-addressed cache of auditor results.
//!
//! Each entry is one JSON file named by its key, where the key is the SHA-256
//! of the auditor id followed by the target's canonical JSON. Entries older
//! than the TTL are evicted on read; entries that fail to deserialize are
//! treated as misses. Writes go through a temp file and an atomic rename so a
//! concurrent reader never observes a torn entry.
//!
//! The cache guarantees at most one fresh computation per TTL window for a
//! given `(auditor, target)`, not exactly one in flight: two callers racing on
//! the same key may both compute and both write, and the last write wins.

mod error;
pub mod key;
mod store;

pub use error::CacheError;
pub use key::cache_key;
pub use store::{CacheEnvelope, CacheStats, ResultCache};
