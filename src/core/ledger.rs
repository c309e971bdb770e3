//! The ledger engine: chain ownership, admission, mining, and accounting.

use crate::core::block::{Block, timestamp_millis};
use crate::core::contract::{ContractError, ContractExecution, ContractId, SmartContract};
use crate::core::pool::{EmptyPool, PendingPools};
use crate::core::sealer::{self, CancelToken, SealError};
use crate::core::transaction::{Amount, REWARD_ADDRESS, Transaction, TransactionError};
use crate::types::hash::Hash;
use crate::{error, info, warn};
use thiserror::Error;

/// Policy parameters fixed at genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Leading hex zeros every sealed block's hash must carry.
    pub difficulty: u32,
    /// Emission granted to the miner of each block, until the cap.
    pub reward_per_block: Amount,
    /// Hard cap on total emission.
    pub max_supply: Amount,
}

/// First point at which the chain fails validation.
///
/// Never expected in normal operation: a violation means a bug or
/// tampering, and trust in the chain instance is gone.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("block {height}: stored hash does not match the recomputed digest")]
    HashMismatch { height: usize },

    #[error("block {height}: previous-hash link does not match its predecessor")]
    BrokenLink { height: usize },
}

/// Outcome of mining one entry from the execution pool.
///
/// The two zero-gas outcomes are distinct: an empty pool is routine,
/// while a dropped execution means a queued id no longer resolved to a
/// contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The head execution ran; the finalized record (miner stamped,
    /// result filled in) was appended to the open block's history.
    Executed { record: ContractExecution },
    /// Nothing was queued.
    PoolEmpty,
    /// The queued id resolved to no contract; the entry was discarded
    /// without crediting gas.
    Dropped { contract_id: ContractId },
}

impl ExecutionOutcome {
    /// Gas credited to the miner for this outcome.
    pub fn consumed_gas(&self) -> Amount {
        match self {
            ExecutionOutcome::Executed { record } => record.consumed_gas,
            ExecutionOutcome::PoolEmpty | ExecutionOutcome::Dropped { .. } => 0,
        }
    }
}

/// The append-only chain of blocks, its pending pools, and the emission
/// policy.
///
/// All invariants live here: hash linkage, the supply cap, contract id
/// uniqueness, and the FIFO mining order. A `Ledger` is single-owner;
/// [`SharedLedger`](crate::core::shared::SharedLedger) wraps it for
/// concurrent callers.
pub struct Ledger {
    /// Sealed blocks followed by the open tip; never empty.
    chain: Vec<Block>,
    pools: PendingPools,
    policy: LedgerPolicy,
}

impl Ledger {
    /// Creates a one-block chain holding only the genesis block.
    ///
    /// Genesis carries an empty payload and the zero previous-hash
    /// sentinel; its hash is the plain digest at nonce 0, assigned
    /// without a proof-of-work search. It is the initial open tip, so
    /// the first [`mine_block`](Self::mine_block) seals it.
    pub fn new(policy: LedgerPolicy) -> Self {
        let genesis = Block::open(Hash::zero());
        info!(
            "ledger initialized: genesis={} difficulty={} reward={} max_supply={}",
            genesis.hash, policy.difficulty, policy.reward_per_block, policy.max_supply
        );
        Self {
            chain: vec![genesis],
            pools: PendingPools::new(),
            policy,
        }
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// All blocks, genesis first. The last block is the open tip.
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pools(&self) -> &PendingPools {
        &self.pools
    }

    fn open_block(&self) -> &Block {
        self.chain.last().expect("chain is never empty")
    }

    fn open_block_mut(&mut self) -> &mut Block {
        self.chain.last_mut().expect("chain is never empty")
    }

    // ==================== Read operations ====================

    /// Recomputes every block's digest and checks hash linkage, reporting
    /// the first failure.
    ///
    /// A violation means a bug or tampering, never a routine outcome, so
    /// it is also logged at error level.
    pub fn validate(&self) -> Result<(), IntegrityViolation> {
        for height in 1..self.chain.len() {
            let block = &self.chain[height];
            if sealer::digest(block) != block.hash {
                let violation = IntegrityViolation::HashMismatch { height };
                error!("chain integrity violation: {violation}");
                return Err(violation);
            }
            if block.previous_hash != self.chain[height - 1].hash {
                let violation = IntegrityViolation::BrokenLink { height };
                error!("chain integrity violation: {violation}");
                return Err(violation);
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Total emission so far: the sum of every transfer originating at
    /// the reward sentinel.
    pub fn mined_supply(&self) -> Amount {
        self.chain
            .iter()
            .flat_map(|block| &block.payload.transactions)
            .filter(|tx| tx.from == REWARD_ADDRESS)
            .map(|tx| tx.amount)
            .sum()
    }

    /// Net balance of `address` from recorded transfers, minus gas
    /// already charged for executions still waiting in the pool.
    ///
    /// Transfers mined into the open tip count; pool entries do not. The
    /// pending-gas debit keys on `contract_id == address`, charging a
    /// contract's own address while its executions wait.
    pub fn balance_of(&self, address: &str) -> i128 {
        let mut balance: i128 = 0;
        for block in &self.chain {
            for tx in &block.payload.transactions {
                if tx.from == address {
                    balance -= tx.amount as i128;
                }
                if tx.to == address {
                    balance += tx.amount as i128;
                }
            }
        }
        for execution in self.pools.executions() {
            if execution.contract_id == address {
                balance -= execution.consumed_gas as i128;
            }
        }
        balance
    }

    // ==================== Admission ====================

    /// Validates a transfer and queues it for mining.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), TransactionError> {
        if let Err(e) = tx.validate(self) {
            warn!("transaction rejected: {e}");
            return Err(e);
        }
        self.pools.push_transaction(tx);
        Ok(())
    }

    // ==================== Contracts ====================

    /// Records a contract in the open block.
    ///
    /// Contracts are not pooled: they take effect as soon as they are
    /// added. The id must be unique across the whole chain, and the
    /// contract's own `validate` capability gates admission.
    pub fn add_contract(&mut self, contract: SmartContract) -> Result<ContractId, ContractError> {
        if self.find_contract(&contract.contract_id).is_some() {
            warn!("contract id collision: {}", contract.contract_id);
            return Err(ContractError::DuplicateId(contract.contract_id));
        }
        if !contract.code.validate(self) {
            return Err(ContractError::Rejected(contract.contract_id));
        }
        let id = contract.contract_id.clone();
        info!("contract added to the open block: id={} kind={}", id, contract.kind);
        self.open_block_mut().payload.contracts.push(contract);
        Ok(id)
    }

    /// Every contract recorded on the chain, oldest first.
    pub fn contracts(&self) -> impl Iterator<Item = &SmartContract> {
        self.chain.iter().flat_map(|block| &block.payload.contracts)
    }

    /// Finds a contract by id, scanning the chain oldest-first.
    ///
    /// The open tip is included, so a freshly added contract can be
    /// executed before its block seals. Linear in the total number of
    /// recorded contracts.
    pub fn find_contract(&self, contract_id: &str) -> Option<&SmartContract> {
        self.contracts()
            .find(|contract| contract.contract_id == contract_id)
    }

    /// Queues an execution of the given contract.
    ///
    /// Fails without touching any pool if the id does not resolve.
    pub fn request_execution(&mut self, contract_id: &str) -> Result<(), ContractError> {
        if self.find_contract(contract_id).is_none() {
            return Err(ContractError::NotFound(contract_id.to_string()));
        }
        self.pools.push_execution(ContractExecution::queued(
            contract_id.to_string(),
            timestamp_millis(),
        ));
        Ok(())
    }

    // ==================== Mining ====================

    /// Moves exactly one transaction from the pool into the open block.
    ///
    /// Callers wanting a full drain call repeatedly; the one-per-call
    /// bound keeps each mining step O(1).
    pub fn mine_one_transaction(&mut self) -> Result<Transaction, EmptyPool> {
        let tx = self.pools.pop_transaction().ok_or(EmptyPool)?;
        self.open_block_mut().payload.transactions.push(tx.clone());
        Ok(tx)
    }

    /// Mines exactly one entry from the execution pool.
    ///
    /// Resolves the queued contract, runs its `execute` capability,
    /// stamps the miner, and appends the finalized record to the open
    /// block's history. An execution whose contract no longer resolves is
    /// discarded and reported as [`ExecutionOutcome::Dropped`]. A failed
    /// execution is still recorded, with the error text as its result.
    pub fn mine_one_execution(&mut self, miner: &str) -> ExecutionOutcome {
        let Some(mut record) = self.pools.pop_execution() else {
            return ExecutionOutcome::PoolEmpty;
        };

        let code = match self.find_contract(&record.contract_id) {
            Some(contract) => contract.code.clone(),
            None => {
                warn!(
                    "dropping queued execution for unknown contract {}",
                    record.contract_id
                );
                return ExecutionOutcome::Dropped {
                    contract_id: record.contract_id,
                };
            }
        };

        match code.execute(self) {
            Ok(result) => record.result = result,
            Err(e) => {
                warn!("contract {} execution failed: {e}", record.contract_id);
                record.result = format!("error: {e}");
            }
        }
        record.miner = miner.to_string();
        self.open_block_mut()
            .payload
            .execution_history
            .push(record.clone());
        ExecutionOutcome::Executed { record }
    }

    // ==================== Sealing ====================

    /// Private copy of the open tip with the emission reward applied.
    ///
    /// If granting the full reward would push emission past the cap, no
    /// reward transaction is added at all; a partial reward is never
    /// issued.
    pub fn stage_block(&self, miner: &str) -> Block {
        let mut staged = self.open_block().clone();
        let supply_after = self.mined_supply().saturating_add(self.policy.reward_per_block);
        if supply_after <= self.policy.max_supply {
            staged
                .payload
                .transactions
                .push(Transaction::reward(miner, self.policy.reward_per_block));
        }
        staged
    }

    /// Installs a sealed candidate as the newest sealed block and opens
    /// the next tip.
    ///
    /// The candidate must come from [`stage_block`](Self::stage_block) on
    /// the current tip; callers serialize mutating operations, so the tip
    /// cannot have changed in between.
    pub fn publish_block(&mut self, sealed: Block) -> Block {
        debug_assert_eq!(sealed.previous_hash, self.open_block().previous_hash);
        let tip = self.chain.last_mut().expect("chain is never empty");
        *tip = sealed;
        let published = tip.clone();
        info!(
            "block sealed: height={} hash={} transactions={}",
            self.chain.len() - 1,
            published.hash,
            published.payload.transactions.len()
        );
        self.chain.push(Block::open(published.hash));
        published
    }

    /// Seals the open block and opens the next one.
    ///
    /// Applies the reward policy, runs the proof-of-work search, and
    /// publishes the sealed block. Cancellation leaves the ledger
    /// untouched. This operation never fails at the emission cap - past
    /// the cap, blocks simply seal without a reward.
    pub fn mine_block(&mut self, miner: &str, cancel: &CancelToken) -> Result<Block, SealError> {
        let mut staged = self.stage_block(miner);
        sealer::seal(&mut staged, self.policy.difficulty, cancel)?;
        Ok(self.publish_block(staged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contract::{
        CertificateContract, CertificateStatus, ContractCode, ContractKind, EXECUTION_GAS_FEE,
        OracleLookup, generate_contract_id,
    };
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    fn policy(difficulty: u32, reward_per_block: Amount, max_supply: Amount) -> LedgerPolicy {
        LedgerPolicy {
            difficulty,
            reward_per_block,
            max_supply,
        }
    }

    fn ledger() -> Ledger {
        Ledger::new(policy(0, 10, 1_000))
    }

    fn mine(ledger: &mut Ledger, miner: &str) -> Block {
        ledger
            .mine_block(miner, &CancelToken::new())
            .expect("mining without cancellation cannot fail")
    }

    // ==================== Genesis & chain shape ====================

    #[test]
    fn new_ledger_has_only_genesis() {
        let ledger = ledger();
        assert_eq!(ledger.chain().len(), 1);

        let genesis = &ledger.chain()[0];
        assert_eq!(genesis.previous_hash, Hash::zero());
        assert!(genesis.payload.is_empty());
        assert_eq!(genesis.nonce, 0);

        assert!(ledger.pools().transactions().is_empty());
        assert!(ledger.pools().executions().is_empty());
        assert!(ledger.is_valid());
    }

    #[test]
    fn mine_block_links_and_reopens() {
        let mut ledger = ledger();
        let sealed = mine(&mut ledger, "m1");

        assert_eq!(ledger.chain().len(), 2);
        assert_eq!(ledger.chain()[0].hash, sealed.hash);
        assert_eq!(ledger.chain()[1].previous_hash, sealed.hash);
        assert!(ledger.chain()[1].payload.is_empty());
        assert!(ledger.is_valid());
    }

    #[test]
    fn sealed_blocks_meet_difficulty() {
        let mut ledger = Ledger::new(policy(2, 10, 1_000));
        let sealed = mine(&mut ledger, "m1");

        assert!(sealed.hash.meets_difficulty(2));
        assert!(sealed.hash.to_string().starts_with("00"));
        assert!(ledger.is_valid());
    }

    #[test]
    fn validate_reports_hash_mismatch_with_height() {
        let mut ledger = ledger();
        mine(&mut ledger, "m1");
        mine(&mut ledger, "m2");

        ledger.chain[1].payload.transactions[0].amount += 1;
        assert_eq!(
            ledger.validate(),
            Err(IntegrityViolation::HashMismatch { height: 1 })
        );
        assert!(!ledger.is_valid());
    }

    #[test]
    fn validate_reports_broken_link() {
        let mut ledger = ledger();
        mine(&mut ledger, "m1");
        mine(&mut ledger, "m2");

        // Re-sealing block 1 in place keeps its digest consistent but
        // orphans block 2's previous-hash link.
        ledger.chain[1].timestamp += 1;
        let recomputed = sealer::digest(&ledger.chain[1]);
        ledger.chain[1].hash = recomputed;

        assert_eq!(
            ledger.validate(),
            Err(IntegrityViolation::BrokenLink { height: 2 })
        );
    }

    // ==================== Emission & supply cap ====================

    #[test]
    fn reward_is_a_sentinel_transaction() {
        let mut ledger = ledger();
        let sealed = mine(&mut ledger, "m1");

        assert_eq!(sealed.payload.transactions.len(), 1);
        let reward = &sealed.payload.transactions[0];
        assert_eq!(reward.from, REWARD_ADDRESS);
        assert_eq!(reward.to, "m1");
        assert_eq!(reward.amount, 10);
    }

    #[test]
    fn supply_cap_scenario() {
        // difficulty 2, reward 10, cap 25: the third block would push
        // emission to 30, so its reward is omitted entirely.
        let mut ledger = Ledger::new(policy(2, 10, 25));

        mine(&mut ledger, "m1");
        assert_eq!(ledger.mined_supply(), 10);
        mine(&mut ledger, "m2");
        assert_eq!(ledger.mined_supply(), 20);

        let third = mine(&mut ledger, "m3");
        assert_eq!(ledger.mined_supply(), 20);
        assert!(third.payload.transactions.is_empty());

        let fourth = mine(&mut ledger, "m4");
        assert_eq!(ledger.mined_supply(), 20);
        assert!(fourth.payload.transactions.is_empty());

        assert_eq!(ledger.balance_of("m1"), 10);
        assert_eq!(ledger.balance_of("m2"), 10);
        assert_eq!(ledger.balance_of("m3"), 0);
        assert!(ledger.is_valid());
    }

    #[test]
    fn mined_supply_ignores_ordinary_transfers() {
        let mut ledger = ledger();
        mine(&mut ledger, "alice");
        ledger
            .submit_transaction(Transaction::new("alice", "bob", 4))
            .expect("transfer within balance");
        ledger.mine_one_transaction().expect("pool has one entry");
        mine(&mut ledger, "alice");

        assert_eq!(ledger.mined_supply(), 20);
    }

    // ==================== Transactions ====================

    #[test]
    fn submit_rejects_without_queueing() {
        let mut ledger = ledger();
        let result = ledger.submit_transaction(Transaction::new("a", "a", 5));
        assert_eq!(result, Err(TransactionError::SelfTransfer));
        assert!(ledger.pools().transactions().is_empty());
    }

    #[test]
    fn mine_one_transaction_moves_exactly_one_fifo() {
        let mut ledger = ledger();
        mine(&mut ledger, "alice");

        for amount in [1, 2, 3] {
            ledger
                .submit_transaction(Transaction::new("alice", "bob", amount))
                .expect("transfer within balance");
        }

        let first = ledger.mine_one_transaction().expect("three queued");
        assert_eq!(first.amount, 1);
        assert_eq!(ledger.pools().transactions().len(), 2);

        let open = ledger.chain().last().expect("chain is never empty");
        assert_eq!(open.payload.transactions.len(), 1);

        assert_eq!(ledger.mine_one_transaction().expect("two queued").amount, 2);
        assert_eq!(ledger.mine_one_transaction().expect("one queued").amount, 3);
        assert_eq!(ledger.mine_one_transaction(), Err(EmptyPool));
    }

    #[test]
    fn transfers_mined_into_the_open_tip_count_toward_balances() {
        let mut ledger = ledger();
        mine(&mut ledger, "alice");

        ledger
            .submit_transaction(Transaction::new("alice", "bob", 10))
            .expect("transfer within balance");
        ledger.mine_one_transaction().expect("one queued");

        // The spend sits in the open tip, not yet sealed, and already
        // blocks a second spend of the same funds.
        assert_eq!(ledger.balance_of("alice"), 0);
        assert_eq!(ledger.balance_of("bob"), 10);
        assert!(matches!(
            ledger.submit_transaction(Transaction::new("alice", "carol", 1)),
            Err(TransactionError::InsufficientBalance { .. })
        ));
    }

    // ==================== Contracts ====================

    #[test]
    fn added_contract_is_found_before_and_after_sealing() {
        let mut ledger = ledger();
        let id = ledger
            .add_contract(SmartContract::counter("w1", "count"))
            .expect("fresh id cannot collide");

        assert!(ledger.find_contract(&id).is_some());
        mine(&mut ledger, "m1");
        assert!(ledger.find_contract(&id).is_some());
        assert!(ledger.find_contract("unknown").is_none());
    }

    #[test]
    fn duplicate_contract_id_is_rejected() {
        let mut ledger = ledger();
        let contract = SmartContract::counter("w1", "count");
        let mut clash = SmartContract::counter("w2", "other");
        clash.contract_id = contract.contract_id.clone();

        let id = ledger.add_contract(contract).expect("first add succeeds");
        assert_eq!(
            ledger.add_contract(clash),
            Err(ContractError::DuplicateId(id))
        );
    }

    #[derive(Debug)]
    struct RejectingCode;

    impl ContractCode for RejectingCode {
        fn execute(&self, _ledger: &Ledger) -> Result<String, ContractError> {
            Err(ContractError::ExecutionFailed("always fails".to_string()))
        }

        fn validate(&self, _ledger: &Ledger) -> bool {
            false
        }
    }

    #[test]
    fn contract_validation_gates_admission() {
        let mut ledger = ledger();
        let contract = SmartContract::new("w1", ContractKind::Counter, "spec", Arc::new(RejectingCode));
        let id = contract.contract_id.clone();

        assert_eq!(ledger.add_contract(contract), Err(ContractError::Rejected(id.clone())));
        assert!(ledger.find_contract(&id).is_none());
    }

    #[test]
    fn request_execution_unknown_id_leaves_pools_untouched() {
        let mut ledger = ledger();
        let missing = generate_contract_id();
        assert_eq!(
            ledger.request_execution(&missing),
            Err(ContractError::NotFound(missing))
        );
        assert!(ledger.pools().executions().is_empty());
    }

    #[test]
    fn contract_lifecycle_scenario() {
        let mut ledger = ledger();
        let id = ledger
            .add_contract(SmartContract::counter("w1", "count"))
            .expect("fresh id cannot collide");

        assert!(matches!(
            ledger.request_execution("unknown"),
            Err(ContractError::NotFound(_))
        ));

        ledger.request_execution(&id).expect("contract exists");
        assert_eq!(ledger.pools().executions().len(), 1);

        let outcome = ledger.mine_one_execution("minerA");
        let ExecutionOutcome::Executed { record } = &outcome else {
            panic!("expected an executed outcome, got {outcome:?}");
        };
        assert_eq!(outcome.consumed_gas(), EXECUTION_GAS_FEE);
        assert_eq!(record.miner, "minerA");
        assert_eq!(record.result, "executions=1");

        let open = ledger.chain().last().expect("chain is never empty");
        assert_eq!(open.payload.execution_history.len(), 1);
        assert_eq!(open.payload.execution_history[0].miner, "minerA");

        // Empty pool is its own outcome, not a drop.
        let outcome = ledger.mine_one_execution("minerA");
        assert_eq!(outcome, ExecutionOutcome::PoolEmpty);
        assert_eq!(outcome.consumed_gas(), 0);
    }

    #[test]
    fn executions_mine_in_request_order() {
        let mut ledger = ledger();
        let first = ledger
            .add_contract(SmartContract::counter("w1", "a"))
            .expect("fresh id cannot collide");
        let second = ledger
            .add_contract(SmartContract::counter("w2", "b"))
            .expect("fresh id cannot collide");

        ledger.request_execution(&first).expect("contract exists");
        ledger.request_execution(&second).expect("contract exists");
        ledger.request_execution(&first).expect("contract exists");

        let mined: Vec<ContractId> = (0..3)
            .map(|_| match ledger.mine_one_execution("m") {
                ExecutionOutcome::Executed { record } => record.contract_id,
                other => panic!("expected an executed outcome, got {other:?}"),
            })
            .collect();
        assert_eq!(mined, vec![first.clone(), second, first]);
    }

    #[test]
    fn unresolvable_execution_is_dropped_not_empty() {
        let mut ledger = ledger();
        let bogus = generate_contract_id();
        ledger
            .pools
            .push_execution(ContractExecution::queued(bogus.clone(), 0));

        assert_eq!(
            ledger.mine_one_execution("m"),
            ExecutionOutcome::Dropped {
                contract_id: bogus
            }
        );
        let open = ledger.chain().last().expect("chain is never empty");
        assert!(open.payload.execution_history.is_empty());
    }

    #[test]
    fn failed_execution_is_recorded_with_error_text() {
        let mut ledger = ledger();
        let contract = SmartContract::new("w1", ContractKind::Counter, "spec", Arc::new(FailingCode));
        let id = ledger.add_contract(contract).expect("fresh id cannot collide");

        ledger.request_execution(&id).expect("contract exists");
        let ExecutionOutcome::Executed { record } = ledger.mine_one_execution("m") else {
            panic!("expected an executed outcome");
        };
        assert!(record.result.starts_with("error: "));
        assert_eq!(record.miner, "m");
    }

    #[derive(Debug)]
    struct FailingCode;

    impl ContractCode for FailingCode {
        fn execute(&self, _ledger: &Ledger) -> Result<String, ContractError> {
            Err(ContractError::ExecutionFailed("boom".to_string()))
        }

        fn validate(&self, _ledger: &Ledger) -> bool {
            true
        }
    }

    #[test]
    fn executing_a_sealed_contract_keeps_the_chain_valid() {
        let mut ledger = ledger();
        let id = ledger
            .add_contract(SmartContract::counter("w1", "count"))
            .expect("fresh id cannot collide");
        mine(&mut ledger, "m1");

        ledger.request_execution(&id).expect("contract exists");
        ledger.mine_one_execution("m1");

        // The counter inside the sealed block advanced, but the digest
        // only covers identity fields.
        assert!(ledger.is_valid());
    }

    #[test]
    fn certificate_contract_completes_through_the_ledger() {
        #[derive(Debug)]
        struct FixedOracle(Mutex<Option<String>>);

        impl OracleLookup for FixedOracle {
            fn lookup(&self, _wallet: &str) -> Option<String> {
                self.0.lock().unwrap().clone()
            }
        }

        let mut ledger = ledger();
        let oracle = Arc::new(FixedOracle(Mutex::new(None)));
        let cert = Arc::new(CertificateContract::new(
            "w1".to_string(),
            "-----BEGIN CERTIFICATE-----".to_string(),
            oracle.clone(),
        ));
        let contract = SmartContract::new(
            "w1",
            ContractKind::Certificate,
            "-----BEGIN CERTIFICATE-----",
            cert.clone(),
        );
        let id = ledger.add_contract(contract).expect("fresh id cannot collide");

        // Nothing published yet: the execution mines but stays pending.
        ledger.request_execution(&id).expect("contract exists");
        let ExecutionOutcome::Executed { record } = ledger.mine_one_execution("m") else {
            panic!("expected an executed outcome");
        };
        assert_eq!(record.result, "pending");
        assert_eq!(cert.status(), CertificateStatus::Pending);

        // The oracle publishes the matching digest; the next execution
        // completes the contract.
        *oracle.0.lock().unwrap() = Some(cert.expected_digest());
        ledger.request_execution(&id).expect("contract exists");
        let ExecutionOutcome::Executed { record } = ledger.mine_one_execution("m") else {
            panic!("expected an executed outcome");
        };
        assert_eq!(record.result, "completed");
        assert_eq!(cert.status(), CertificateStatus::Completed);
    }

    // ==================== Balances ====================

    #[test]
    fn pending_execution_gas_debits_the_contract_address() {
        let mut ledger = ledger();
        let id = ledger
            .add_contract(SmartContract::counter("w1", "count"))
            .expect("fresh id cannot collide");

        ledger.request_execution(&id).expect("contract exists");
        ledger.request_execution(&id).expect("contract exists");
        assert_eq!(
            ledger.balance_of(&id),
            -2 * EXECUTION_GAS_FEE as i128
        );

        // Mining one execution lifts its pending debit; the history entry
        // is not charged again.
        ledger.mine_one_execution("m");
        assert_eq!(ledger.balance_of(&id), -(EXECUTION_GAS_FEE as i128));

        ledger.mine_one_execution("m");
        assert_eq!(ledger.balance_of(&id), 0);
    }

    #[test]
    fn balances_conserve_mined_supply_minus_pending_gas() {
        let mut ledger = ledger();
        mine(&mut ledger, "alice");
        mine(&mut ledger, "bob");

        ledger
            .submit_transaction(Transaction::new("alice", "bob", 3))
            .expect("transfer within balance");
        ledger.mine_one_transaction().expect("one queued");

        let id = ledger
            .add_contract(SmartContract::counter("w1", "count"))
            .expect("fresh id cannot collide");
        ledger.request_execution(&id).expect("contract exists");

        let mut addresses = BTreeSet::new();
        for block in ledger.chain() {
            for tx in &block.payload.transactions {
                addresses.insert(tx.from.clone());
                addresses.insert(tx.to.clone());
            }
        }
        addresses.insert(id.clone());
        addresses.remove(REWARD_ADDRESS);

        let total: i128 = addresses.iter().map(|a| ledger.balance_of(a)).sum();
        let pending_gas: i128 = ledger
            .pools()
            .executions()
            .iter()
            .map(|e| e.consumed_gas as i128)
            .sum();
        assert_eq!(total, ledger.mined_supply() as i128 - pending_gas);
    }

    // ==================== Cancellation ====================

    #[test]
    fn cancelled_mining_leaves_the_ledger_untouched() {
        // 65 leading hex zeros is unreachable, so only cancellation can
        // end this search.
        let mut ledger = Ledger::new(policy(65, 10, 1_000));
        let token = CancelToken::new();
        token.cancel();

        assert_eq!(ledger.mine_block("m1", &token), Err(SealError::Cancelled));
        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.mined_supply(), 0);
        assert!(ledger.is_valid());
    }
}
