//! Core type definitions for the ledger.
//!
//! - `Hash`: fixed-size 32-byte SHA3-256 digests linking and sealing blocks
//! - `Encode`: deterministic serialization feeding the block digest
pub mod encoding;
pub mod hash;
