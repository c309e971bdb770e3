//! Block digest and the proof-of-work seal.

use crate::core::block::Block;
use crate::types::encoding::Encode;
use crate::types::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Errors from the seal search.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SealError {
    #[error("seal search cancelled before a valid nonce was found")]
    Cancelled,
}

/// Cooperative cancellation handle for the seal search.
///
/// Clones share one flag and any holder may trip it. The search polls the
/// flag on every attempt, so cancellation lands within a single digest
/// computation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of any search polling this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Computes the digest a block's `hash` field must equal.
///
/// Covers the previous-hash link, the canonically encoded payload, the
/// timestamp, and the nonce under a domain separator.
pub fn digest(block: &Block) -> Hash {
    let mut h = Hash::sha3();
    h.update(b"BLOCK_SEAL");
    h.update(block.previous_hash.as_slice());
    block.payload.encode(&mut h);
    block.timestamp.encode(&mut h);
    block.nonce.encode(&mut h);
    h.finalize()
}

/// Runs the proof-of-work search on `block`.
///
/// Starting from nonce 0, recomputes the digest until it carries
/// `difficulty` leading hex zeros, then stores the winning nonce and
/// hash. Difficulty 0 accepts the first digest. The search is unbounded
/// and CPU-bound; `cancel` is the only way out of a target no digest can
/// reach, and callers run the search off any thread that must stay
/// responsive.
pub fn seal(block: &mut Block, difficulty: u32, cancel: &CancelToken) -> Result<(), SealError> {
    block.nonce = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(SealError::Cancelled);
        }
        let hash = digest(block);
        if hash.meets_difficulty(difficulty) {
            block.hash = hash;
            return Ok(());
        }
        block.nonce += 1;
    }
}
