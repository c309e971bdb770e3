//! Chain blocks and their payload.

use crate::core::contract::{ContractExecution, SmartContract};
use crate::core::sealer;
use crate::core::transaction::Transaction;
use crate::types::encoding::{Encode, EncodeSink};
use crate::types::hash::Hash;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything a block records: transfers, newly added contracts, and the
/// finalized execution history, each in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPayload {
    pub transactions: Vec<Transaction>,
    pub contracts: Vec<SmartContract>,
    pub execution_history: Vec<ContractExecution>,
}

impl BlockPayload {
    /// Returns `true` if the payload records nothing at all.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.contracts.is_empty()
            && self.execution_history.is_empty()
    }
}

impl Encode for BlockPayload {
    // Field order is part of the digest; never reorder.
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.transactions.encode(out);
        self.contracts.encode(out);
        self.execution_history.encode(out);
    }
}

/// One element of the chain.
///
/// A block is created empty as the chain's open tip, accumulates payload
/// while open, and is sealed exactly once by the proof-of-work search.
/// After sealing it is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Hash of the predecessor; the zero sentinel for genesis.
    pub previous_hash: Hash,
    pub payload: BlockPayload,
    /// Set once at creation, immutable thereafter.
    pub timestamp: u64,
    /// Mutated only by the seal search.
    pub nonce: u64,
    /// Always equals the digest of the remaining fields.
    pub hash: Hash,
}

impl Block {
    /// Creates a new empty open block linked to `previous_hash`.
    ///
    /// The initial hash is the plain digest at nonce 0; the difficulty
    /// target applies only when the block is sealed.
    pub(crate) fn open(previous_hash: Hash) -> Self {
        let mut block = Block {
            previous_hash,
            payload: BlockPayload::default(),
            timestamp: timestamp_millis(),
            nonce: 0,
            hash: Hash::zero(),
        };
        block.hash = sealer::digest(&block);
        block
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_block_starts_empty_with_consistent_hash() {
        let previous = Hash::sha3().chain(b"previous").finalize();
        let block = Block::open(previous);

        assert_eq!(block.previous_hash, previous);
        assert!(block.payload.is_empty());
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash, sealer::digest(&block));
    }

    #[test]
    fn payload_encoding_is_order_sensitive() {
        let mut a = BlockPayload::default();
        a.transactions.push(Transaction::new("x", "y", 1));
        a.transactions.push(Transaction::new("y", "z", 2));

        let mut b = BlockPayload::default();
        b.transactions.push(Transaction::new("y", "z", 2));
        b.transactions.push(Transaction::new("x", "y", 1));

        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn payload_sections_do_not_collide() {
        // A transfer and an empty contract list must encode differently
        // from an empty transfer list followed by anything else.
        let mut with_tx = BlockPayload::default();
        with_tx.transactions.push(Transaction::new("x", "y", 1));

        let empty = BlockPayload::default();
        assert_ne!(with_tx.to_bytes(), empty.to_bytes());
    }

    #[test]
    fn is_empty_reflects_every_section() {
        let mut payload = BlockPayload::default();
        assert!(payload.is_empty());
        payload
            .execution_history
            .push(ContractExecution::queued("c1".to_string(), 0));
        assert!(!payload.is_empty());
    }
}
