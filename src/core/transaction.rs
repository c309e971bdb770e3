//! Financial transfers and the admission rules that gate them.

use crate::core::ledger::Ledger;
use crate::types::encoding::{Encode, EncodeSink};
use thiserror::Error;

/// Opaque account identifier. Wallet and identity management live outside
/// the engine.
pub type Address = String;

/// Transfer amount in base units. Unsigned, so a negative amount is
/// unrepresentable; zero is still rejected at admission.
pub type Amount = u64;

/// Reserved sender address representing coin emission.
///
/// Transfers originating here are the only path by which coins enter
/// circulation; it is never a real account and ordinary submissions may
/// not name it on either side.
pub const REWARD_ADDRESS: &str = "0";

/// Errors produced by transaction admission. No mutation occurs on
/// rejection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("sender and recipient are the same address")]
    SelfTransfer,

    #[error("the reward address cannot send or receive ordinary transfers")]
    RewardAddress,

    #[error("transfer amount must be positive")]
    ZeroAmount,

    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: i128, required: Amount },
}

/// A transfer of `amount` base units between two addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

impl Transaction {
    /// Creates a new transfer.
    pub fn new(from: impl Into<Address>, to: impl Into<Address>, amount: Amount) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    /// Builds the emission transaction granted to a block's miner.
    pub(crate) fn reward(miner: &str, amount: Amount) -> Self {
        Self::new(REWARD_ADDRESS, miner, amount)
    }

    /// Checks the admission rules against current chain state.
    ///
    /// The reward sentinel appears only in transactions the engine creates
    /// itself while sealing a block, which bypass admission entirely; any
    /// submission naming it is rejected.
    pub fn validate(&self, ledger: &Ledger) -> Result<(), TransactionError> {
        if self.from == self.to {
            return Err(TransactionError::SelfTransfer);
        }
        if self.from == REWARD_ADDRESS || self.to == REWARD_ADDRESS {
            return Err(TransactionError::RewardAddress);
        }
        if self.amount == 0 {
            return Err(TransactionError::ZeroAmount);
        }
        let balance = ledger.balance_of(&self.from);
        if balance < self.amount as i128 {
            return Err(TransactionError::InsufficientBalance {
                balance,
                required: self.amount,
            });
        }
        Ok(())
    }
}

impl Encode for Transaction {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.from.encode(out);
        self.to.encode(out);
        self.amount.encode(out);
    }
}
