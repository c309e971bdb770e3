//! Core ledger data structures and operations.
//!
//! This module contains the engine proper:
//! - `Block` / `BlockPayload`: hash-linked chain elements
//! - `Transaction`: financial transfers and their admission rules
//! - contracts: the two-method execution capability and built-in variants
//! - `PendingPools`: FIFO queues of work awaiting inclusion
//! - `sealer`: the digest and cancellable proof-of-work search
//! - `Ledger`: chain ownership, mining, and balance/emission accounting
//! - `SharedLedger`: the locking facade for concurrent callers

pub mod block;
pub mod contract;
pub mod ledger;
pub mod pool;
pub mod sealer;
pub mod shared;
pub mod transaction;
