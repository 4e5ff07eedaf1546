//! Deterministic cache keys.

use guild_core::{CoreError, Target};
use sha2::{Digest, Sha256};

/// Derive the cache key for `(auditor_id, target)`.
///
/// Lowercase hex SHA-256 of `auditor_id` followed by the target's canonical
/// JSON. Identical inputs always produce identical keys.
///
/// # Errors
///
/// Returns `CoreError::Serialization` if the target cannot be canonicalized.
pub fn cache_key(auditor_id: &str, target: &Target) -> Result<String, CoreError> {
    let canonical = target.canonical_json()?;
    let mut hasher = Sha256::new();
    hasher.update(auditor_id.as_bytes());
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
