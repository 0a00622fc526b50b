//! Digests and record identifiers.

use rand::RngCore;
use sha2::{Digest, Sha256};

use patchforge_core::types::now_millis;

/// Hex SHA-256 of arbitrary bytes. Used for identity and integrity only.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// New record id: `<prefix>-<epochMillis>-<hex random>.json`. The 6-byte
/// random suffix makes ids collision-resistant and non-enumerable.
pub fn new_record_id(prefix: &str) -> String {
    let mut suffix = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!("{prefix}-{}-{}.json", now_millis(), hex::encode(suffix))
}

/// Accepts only ids this store could have generated; anything else (path
/// separators, `..`, foreign prefixes) is refused before touching disk.
pub fn is_valid_record_id(id: &str, prefix: &str) -> bool {
    id.starts_with(prefix)
        && id.ends_with(".json")
        && !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
