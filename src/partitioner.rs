//! Local partition token computation.
//!
//! Computes a hash-ring token for a raw key, gated on the cluster's
//! declared partitioner. Only the Murmur3 family is implemented: for any
//! other partitioner the computation is not applicable and callers get
//! `None`, never a defaulted hash.
//!
//! This is a pure function over the key bytes; it performs no I/O,
//! touches no shared state, and is safe to call concurrently.

use crate::types::PartitionToken;
use murmur3::murmur3_32;
use std::io::Cursor;
use tracing::debug;

/// Identifier fragment of the Murmur3 partitioner family. Matched as a
/// case-sensitive substring because clusters report the full class name
/// (e.g. `org.apache.cassandra.dht.Murmur3Partitioner`) but the value is
/// not guaranteed canonical.
pub const MURMUR3_PARTITIONER: &str = "Murmur3";

/// Whether the declared partitioner is in the Murmur3 family.
pub fn is_murmur3(partitioner: &str) -> bool {
    partitioner.contains(MURMUR3_PARTITIONER)
}

/// Compute the ring token for `key` under the given partitioner.
///
/// Returns `None` when the partitioner is not Murmur3-family; that is a
/// normal "not applicable" outcome, not an error. The hash is the 32-bit
/// MurmurHash3 variant with unsigned output and seed 0, applied to the
/// UTF-8 bytes of the key. Zero-length keys hash deterministically like
/// any other.
pub fn compute_token(key: &str, partitioner: &str) -> Option<PartitionToken> {
    if !is_murmur3(partitioner) {
        debug!(partitioner, "partitioner is not Murmur3, skipping local token computation");
        return None;
    }

    let hash = murmur3_32(&mut Cursor::new(key.as_bytes()), 0)
        .expect("reading from an in-memory buffer cannot fail");
    Some(PartitionToken(u64::from(hash)))
}
