//! 32-byte SHA3-256 hash type used to link and seal blocks.

use crate::types::encoding::EncodeSink;
use sha3::{Digest, Sha3_256};
use std::fmt;

/// SHA3-256 digest length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size hash identifying a block within the chain.
///
/// This type is `Copy` - hashes are recomputed and compared constantly
/// during validation and the proof-of-work search, and 32 bytes on the
/// stack beats reference indirection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Ord, PartialOrd)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// Creates a zero-valued hash (all bytes are 0x00).
    ///
    /// Used as the previous-hash sentinel of the genesis block.
    pub fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    /// Returns the hash as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates a new SHA3-256 hash builder for incremental hashing.
    pub fn sha3() -> HashBuilder {
        HashBuilder::new()
    }

    /// Returns `true` if the hex rendering of this hash starts with at
    /// least `difficulty` literal `'0'` characters.
    ///
    /// One hex character is one nibble, so the test walks half-bytes:
    /// difficulty 3 requires one zero byte plus a zero high nibble in the
    /// next byte. A difficulty above 64 nibbles can never be met.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        let full_bytes = (difficulty / 2) as usize;
        if full_bytes > HASH_LEN {
            return false;
        }
        if self.0[..full_bytes].iter().any(|&b| b != 0) {
            return false;
        }
        if difficulty % 2 == 1 {
            match self.0.get(full_bytes) {
                Some(b) => b >> 4 == 0,
                None => false,
            }
        } else {
            true
        }
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Incremental SHA3-256 hash builder.
///
/// Allows feeding data in chunks and finalizing to produce a [`Hash`].
/// Implements [`EncodeSink`] so encodable types can be hashed directly
/// without intermediate byte buffers.
pub struct HashBuilder {
    hasher: Sha3_256,
}

impl HashBuilder {
    /// Creates a new hash builder with empty state.
    pub fn new() -> Self {
        Self {
            hasher: Sha3_256::new(),
        }
    }

    /// Feeds data into the hash computation.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Feeds data and returns the builder for chained calls.
    pub fn chain(mut self, data: &[u8]) -> Self {
        self.update(data);
        self
    }

    /// Consumes the builder and returns the final hash.
    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeSink for HashBuilder {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}
