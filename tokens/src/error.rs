//! Error type for the token surface.

use crate::access::AccessError;
use crate::allowance::AllowanceError;
use shareledger_core::LedgerError;
use thiserror::Error;

/// Any failure a token entry point can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Role check or pause switch rejected the call.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Delegated spend exceeded its allowance.
    #[error(transparent)]
    Allowance(#[from] AllowanceError),

    /// The underlying ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl TokenError {
    /// Short, stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Access(AccessError::Unauthorized { .. }) => "unauthorized",
            TokenError::Access(AccessError::Paused) => "paused",
            TokenError::Allowance(AllowanceError::ZeroAddress) => "zero_address",
            TokenError::Allowance(AllowanceError::Insufficient { .. }) => "insufficient_allowance",
            TokenError::Ledger(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_delegates_to_ledger() {
        let err: TokenError = LedgerError::InvalidRebaseAmount.into();
        assert_eq!(err.kind(), LedgerError::InvalidRebaseAmount.kind());
        assert_eq!(TokenError::from(AccessError::Paused).kind(), "paused");
    }

    #[test]
    fn display_is_transparent() {
        let err: TokenError = AccessError::Paused.into();
        assert_eq!(err.to_string(), "token is paused");
    }
}
