//! Bucket keys for external resources.
//!
//! A bucket key is the first seven hex characters of the SHA-1 digest of the
//! normalized resource identifier. Keys only depend on the identifier, so the
//! same URL or path lands in the same `x-ext` bucket in every run.

use sha1::{Digest, Sha1};

/// Length of a bucket key in hex characters.
pub const HASH_LENGTH: usize = 7;

/// Compute the bucket key for a resource identifier.
///
/// Collisions are possible with a key this short and are not detected.
pub fn get_hash(identifier: &str) -> String {
    let digest = Sha1::digest(identifier.as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(HASH_LENGTH);
    key
}
