//! Concurrency facade over [`Ledger`] for multi-threaded callers.
//!
//! Chain-mutating operations are serialized through a single write gate,
//! so at most one is in flight at a time. Read operations run
//! concurrently under a shared lock. The proof-of-work search never holds
//! the data lock: it runs on a private staged copy of the open block and
//! the sealed result is published in one short write, so readers only
//! ever observe fully sealed blocks.

use crate::core::block::Block;
use crate::core::contract::{ContractError, ContractExecution, ContractId, SmartContract};
use crate::core::ledger::{ExecutionOutcome, IntegrityViolation, Ledger, LedgerPolicy};
use crate::core::pool::EmptyPool;
use crate::core::sealer::{self, CancelToken, SealError};
use crate::core::transaction::{Amount, Transaction, TransactionError};
use std::sync::{Mutex, RwLock};

/// Thread-safe wrapper exposing the full ledger interface.
pub struct SharedLedger {
    inner: RwLock<Ledger>,
    /// Serializes every mutating operation, including the whole of
    /// `mine_block` while its search runs outside the `RwLock`.
    write_gate: Mutex<()>,
}

impl SharedLedger {
    pub fn new(policy: LedgerPolicy) -> Self {
        Self {
            inner: RwLock::new(Ledger::new(policy)),
            write_gate: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.inner.read().unwrap().policy()
    }

    // ==================== Mutating operations ====================

    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), TransactionError> {
        let _gate = self.write_gate.lock().unwrap();
        self.inner.write().unwrap().submit_transaction(tx)
    }

    pub fn add_contract(&self, contract: SmartContract) -> Result<ContractId, ContractError> {
        let _gate = self.write_gate.lock().unwrap();
        self.inner.write().unwrap().add_contract(contract)
    }

    pub fn request_execution(&self, contract_id: &str) -> Result<(), ContractError> {
        let _gate = self.write_gate.lock().unwrap();
        self.inner.write().unwrap().request_execution(contract_id)
    }

    pub fn mine_one_transaction(&self) -> Result<Transaction, EmptyPool> {
        let _gate = self.write_gate.lock().unwrap();
        self.inner.write().unwrap().mine_one_transaction()
    }

    pub fn mine_one_execution(&self, miner: &str) -> ExecutionOutcome {
        let _gate = self.write_gate.lock().unwrap();
        self.inner.write().unwrap().mine_one_execution(miner)
    }

    /// Seals the open block and opens the next one.
    ///
    /// Holds the write gate for the whole operation (no other mutation
    /// can slip in and invalidate the staged copy) but runs the search
    /// without the data lock, so reads proceed while hashes grind.
    pub fn mine_block(&self, miner: &str, cancel: &CancelToken) -> Result<Block, SealError> {
        let _gate = self.write_gate.lock().unwrap();

        let (mut staged, difficulty) = {
            let inner = self.inner.read().unwrap();
            (inner.stage_block(miner), inner.policy().difficulty)
        };
        sealer::seal(&mut staged, difficulty, cancel)?;
        Ok(self.inner.write().unwrap().publish_block(staged))
    }

    // ==================== Read operations ====================

    /// Snapshot of the whole chain, genesis first.
    pub fn chain_snapshot(&self) -> Vec<Block> {
        self.inner.read().unwrap().chain().to_vec()
    }

    /// Snapshot of both pending pools, oldest first.
    pub fn pool_snapshot(&self) -> (Vec<Transaction>, Vec<ContractExecution>) {
        let inner = self.inner.read().unwrap();
        let pools = inner.pools();
        (
            pools.transactions().iter().cloned().collect(),
            pools.executions().iter().cloned().collect(),
        )
    }

    pub fn balance_of(&self, address: &str) -> i128 {
        self.inner.read().unwrap().balance_of(address)
    }

    pub fn mined_supply(&self) -> Amount {
        self.inner.read().unwrap().mined_supply()
    }

    pub fn validate(&self) -> Result<(), IntegrityViolation> {
        self.inner.read().unwrap().validate()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.read().unwrap().is_valid()
    }
}
