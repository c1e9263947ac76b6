//! Error types for the share ledgers.
//!
//! Every fallible ledger operation returns a [`LedgerError`]. Each failure
//! kind has its own variant so callers (and tests) can match on exactly
//! what went wrong. Input and balance checks run before any state is
//! touched; arithmetic failures abort the operation.

use thiserror::Error;

use crate::custody::CustodyError;
use crate::math::MathError;

/// Errors returned by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The recipient (or owner) is the null address.
    #[error("the zero address cannot hold shares")]
    ZeroAddress,

    /// A mint, burn, deposit, withdraw, or redeem of nothing.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// The amount is too small to be worth a single share at the current rate.
    #[error("amount {value} converts to zero shares")]
    ZeroShares {
        /// The value that rounded down to nothing.
        value: u64,
    },

    /// The account does not hold the shares the operation needs.
    #[error("insufficient shares: account has {available}, operation requires {required}")]
    InsufficientShares {
        /// Shares held by the account.
        available: u64,
        /// Shares the operation would debit.
        required: u64,
    },

    /// A transfer larger than the sender's share balance.
    #[error("insufficient balance: available {available} shares, transfer needs {requested}")]
    InsufficientBalance {
        /// Shares held by the sender.
        available: u64,
        /// Shares the transfer would move.
        requested: u64,
    },

    /// Rebase to zero pooled value.
    #[error("invalid rebase amount: total pooled value cannot be set to zero")]
    InvalidRebaseAmount,

    /// The deposit is smaller than the vault's minimum.
    #[error("deposit of {value} is below the minimum of {minimum}")]
    BelowMinimumDeposit {
        /// Configured minimum.
        minimum: u64,
        /// Asset value of the rejected deposit.
        value: u64,
    },

    /// The deposit would push total assets above the cap.
    #[error("deposit cap exceeded: cap {cap}, total assets {total_assets}, deposit {value}")]
    DepositCapExceeded {
        /// Configured cap.
        cap: u64,
        /// Total assets before the deposit.
        total_assets: u64,
        /// Asset value of the rejected deposit.
        value: u64,
    },

    /// The virtual offset exponent is out of range.
    #[error("invalid virtual offset exponent {0}")]
    InvalidOffset(u8),

    /// A conversion overflowed or divided by zero.
    #[error("math error: {0}")]
    Math(#[from] MathError),

    /// The asset custody collaborator refused the transfer.
    #[error("custody error: {0}")]
    Custody(#[from] CustodyError),
}

impl LedgerError {
    /// Stable snake_case name for the failure kind. Used as a metrics label
    /// and in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::ZeroAddress => "zero_address",
            LedgerError::ZeroAmount => "zero_amount",
            LedgerError::ZeroShares { .. } => "zero_shares",
            LedgerError::InsufficientShares { .. } => "insufficient_shares",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InvalidRebaseAmount => "invalid_rebase_amount",
            LedgerError::BelowMinimumDeposit { .. } => "below_minimum_deposit",
            LedgerError::DepositCapExceeded { .. } => "deposit_cap_exceeded",
            LedgerError::InvalidOffset(_) => "invalid_offset",
            LedgerError::Math(_) => "math",
            LedgerError::Custody(_) => "custody",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
