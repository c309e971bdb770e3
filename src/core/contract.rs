//! Smart contracts, their execution capability, and execution records.
//!
//! A contract is recorded on the chain with immutable identity fields and
//! a polymorphic `code` capability. Executions are requested into a pool
//! and later mined into a block's history, charging a fixed gas fee.

use crate::core::ledger::Ledger;
use crate::core::transaction::{Address, Amount};
use crate::types::encoding::{Encode, EncodeSink};
use crate::types::hash::Hash;
use rand_core::{OsRng, RngCore};
use std::fmt;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Gas charged for every contract execution.
///
/// Debited from the contract's own address in pending-balance accounting
/// while the execution waits in the pool.
pub const EXECUTION_GAS_FEE: Amount = 1;

/// Hex-encoded 128-bit contract identifier, unique across the whole chain.
pub type ContractId = String;

/// Generates a fresh random contract identifier: 16 bytes from the OS
/// entropy source, lowercase hex.
pub fn generate_contract_id() -> ContractId {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    let mut id = String::with_capacity(2 * bytes.len());
    for byte in bytes {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}

/// Errors from contract registry and execution operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("no contract with id {0} exists on the chain")]
    NotFound(ContractId),

    #[error("contract id {0} already exists on the chain")]
    DuplicateId(ContractId),

    #[error("contract {0} failed admission validation")]
    Rejected(ContractId),

    #[error("contract execution failed: {0}")]
    ExecutionFailed(String),
}

/// Tag naming which code variant a contract carries.
///
/// Informational only: the engine never branches on it. Behavior always
/// goes through the [`ContractCode`] capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Counter,
    Certificate,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Counter => write!(f, "counter"),
            ContractKind::Certificate => write!(f, "certificate"),
        }
    }
}

impl Encode for ContractKind {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        let tag: u8 = match self {
            ContractKind::Counter => 0,
            ContractKind::Certificate => 1,
        };
        tag.encode(out);
    }
}

/// Two-operation capability every contract's code must honor.
///
/// `execute` runs against current ledger state and may mutate
/// contract-local runtime state (kept behind atomics or locks so the
/// chain itself stays immutable). `validate` is pure and gates admission.
/// New contract kinds are added by implementing this trait, never by
/// branching on [`ContractKind`] inside the engine.
pub trait ContractCode: fmt::Debug + Send + Sync {
    /// Runs the contract, returning the result string recorded in the
    /// execution history.
    fn execute(&self, ledger: &Ledger) -> Result<String, ContractError>;

    /// Pure admission check run before the contract enters the chain.
    fn validate(&self, ledger: &Ledger) -> bool;
}

/// A smart contract recorded on the chain.
///
/// Identity fields are immutable once the containing block seals; only
/// state inside `code` may change afterwards.
#[derive(Debug, Clone)]
pub struct SmartContract {
    pub contract_id: ContractId,
    pub wallet: Address,
    pub kind: ContractKind,
    pub specification: String,
    /// Execution capability. Shared, so the staged copy of the open block
    /// made while sealing aliases the same runtime state as the tip.
    pub code: Arc<dyn ContractCode>,
}

impl SmartContract {
    /// Creates a contract with a fresh random id.
    pub fn new(
        wallet: impl Into<Address>,
        kind: ContractKind,
        specification: impl Into<String>,
        code: Arc<dyn ContractCode>,
    ) -> Self {
        Self {
            contract_id: generate_contract_id(),
            wallet: wallet.into(),
            kind,
            specification: specification.into(),
            code,
        }
    }

    /// New execution-counter contract.
    pub fn counter(wallet: impl Into<Address>, specification: impl Into<String>) -> Self {
        Self::new(
            wallet,
            ContractKind::Counter,
            specification,
            Arc::new(CounterContract::new()),
        )
    }

    /// New certificate contract bound to the given oracle.
    pub fn certificate(
        wallet: impl Into<Address>,
        certificate: impl Into<String>,
        oracle: Arc<dyn OracleLookup>,
    ) -> Self {
        let wallet = wallet.into();
        let certificate = certificate.into();
        let code = CertificateContract::new(wallet.clone(), certificate.clone(), oracle);
        Self::new(wallet, ContractKind::Certificate, certificate, Arc::new(code))
    }

    /// Digest of the contract's identity fields.
    ///
    /// Runtime code state is excluded: a sealed block's hash must not
    /// change when the contract later executes.
    pub fn digest(&self) -> Hash {
        let mut h = Hash::sha3();
        h.update(b"CONTRACT");
        self.encode(&mut h);
        h.finalize()
    }
}

impl PartialEq for SmartContract {
    /// Contracts are equal when their on-chain identity matches. Runtime
    /// code state is excluded, exactly as in [`SmartContract::digest`].
    fn eq(&self, other: &Self) -> bool {
        self.digest() == other.digest()
    }
}

impl Encode for SmartContract {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.contract_id.encode(out);
        self.wallet.encode(out);
        self.kind.encode(out);
        self.specification.encode(out);
    }
}

/// Record of one queued or mined contract execution.
///
/// Created with an empty miner when the execution is requested; the miner
/// is stamped and the result filled in when the record is mined into the
/// open block's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractExecution {
    pub contract_id: ContractId,
    pub consumed_gas: Amount,
    pub result: String,
    pub timestamp: u64,
    pub miner: Address,
}

impl ContractExecution {
    /// Builds the pool entry for a freshly requested execution.
    pub(crate) fn queued(contract_id: ContractId, timestamp: u64) -> Self {
        Self {
            contract_id,
            consumed_gas: EXECUTION_GAS_FEE,
            result: String::new(),
            timestamp,
            miner: String::new(),
        }
    }
}

impl Encode for ContractExecution {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.contract_id.encode(out);
        self.consumed_gas.encode(out);
        self.result.encode(out);
        self.timestamp.encode(out);
        self.miner.encode(out);
    }
}

/// Built-in contract that counts its own executions.
#[derive(Debug, Default)]
pub struct CounterContract {
    executions: AtomicU64,
}

impl CounterContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times this contract has executed.
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }
}

impl ContractCode for CounterContract {
    fn execute(&self, _ledger: &Ledger) -> Result<String, ContractError> {
        let count = self.executions.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("executions={}", count))
    }

    fn validate(&self, _ledger: &Ledger) -> bool {
        true
    }
}

/// Off-chain condition oracle consumed by the certificate contract.
///
/// The engine only needs the lookup capability; transport and storage of
/// the published digests are a collaborator concern.
pub trait OracleLookup: fmt::Debug + Send + Sync {
    /// Latest digest published for the given wallet, if any.
    fn lookup(&self, wallet: &str) -> Option<String>;
}

/// Whether a certificate contract's off-chain condition has been met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    Pending,
    Completed,
}

/// Built-in contract that completes once an oracle publishes the digest
/// matching this contract.
///
/// Each execution polls the oracle; a match latches the status to
/// completed, after which further executions are no-ops.
#[derive(Debug)]
pub struct CertificateContract {
    wallet: Address,
    certificate: String,
    oracle: Arc<dyn OracleLookup>,
    status: Mutex<CertificateStatus>,
}

impl CertificateContract {
    pub fn new(wallet: Address, certificate: String, oracle: Arc<dyn OracleLookup>) -> Self {
        Self {
            wallet,
            certificate,
            oracle,
            status: Mutex::new(CertificateStatus::Pending),
        }
    }

    pub fn status(&self) -> CertificateStatus {
        *self.status.lock().unwrap()
    }

    /// Digest the oracle must publish for this contract to complete.
    pub fn expected_digest(&self) -> String {
        let mut h = Hash::sha3();
        h.update(b"CERTIFICATE");
        self.wallet.encode(&mut h);
        self.certificate.encode(&mut h);
        h.finalize().to_string()
    }
}

impl ContractCode for CertificateContract {
    fn execute(&self, _ledger: &Ledger) -> Result<String, ContractError> {
        let mut status = self.status.lock().unwrap();
        if *status == CertificateStatus::Completed {
            return Ok("completed".to_string());
        }
        match self.oracle.lookup(&self.wallet) {
            Some(digest) if digest == self.expected_digest() => {
                *status = CertificateStatus::Completed;
                Ok("completed".to_string())
            }
            _ => Ok("pending".to_string()),
        }
    }

    fn validate(&self, _ledger: &Ledger) -> bool {
        true
    }
}
