//! # Ledger Configuration & Constants
//!
//! Every tunable number for the ledgers lives here. The virtual offset is
//! fixed at vault creation and never changes afterwards, so pick it with
//! the asset's decimals in mind: a 6-decimal asset with offset 6 issues
//! shares with 12 effective decimals.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Version of the core ledger crate, reported by `shareledger version`.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default virtual offset exponent for new vaults.
pub const DEFAULT_OFFSET_EXPONENT: u8 = 6;

/// Largest offset exponent. `10^18` is the biggest power of ten that still
/// fits a `u64` share count.
pub const MAX_OFFSET_EXPONENT: u8 = 18;

/// A deposit cap of zero means "no cap", not "no deposits".
pub const UNLIMITED_DEPOSIT_CAP: u64 = 0;

/// Default display decimals for token metadata. Display only; the ledgers
/// never scale by it.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Events a ledger keeps before the oldest undrained ones are discarded.
pub const MAX_PENDING_EVENTS: usize = 10_000;

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Creation-time parameters for a [`VaultLedger`](crate::vault::VaultLedger).
///
/// `offset_exponent` is immutable once the vault exists. `deposit_cap` and
/// `minimum_deposit` are the starting values of two administrative bounds
/// that the token surface may change later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Virtual offset exponent (`10^k` phantom shares).
    pub offset_exponent: u8,

    /// Maximum total assets the vault accepts. `0` = unlimited.
    pub deposit_cap: u64,

    /// Smallest asset amount a single deposit or mint may bring in.
    pub minimum_deposit: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            offset_exponent: DEFAULT_OFFSET_EXPONENT,
            deposit_cap: UNLIMITED_DEPOSIT_CAP,
            minimum_deposit: 0,
        }
    }
}

impl VaultConfig {
    /// Checks the parameters that cannot be fixed after creation.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidOffset`] if the offset exponent is above
    /// [`MAX_OFFSET_EXPONENT`].
    pub fn validate(&self) -> Result<()> {
        if self.offset_exponent > MAX_OFFSET_EXPONENT {
            return Err(LedgerError::InvalidOffset(self.offset_exponent));
        }
        Ok(())
    }

    /// `true` when deposits are not capped.
    pub fn is_uncapped(&self) -> bool {
        self.deposit_cap == UNLIMITED_DEPOSIT_CAP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_uncapped() {
        let config = VaultConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_uncapped());
        assert_eq!(config.offset_exponent, DEFAULT_OFFSET_EXPONENT);
    }

    #[test]
    fn oversized_offset_rejected() {
        let config = VaultConfig {
            offset_exponent: MAX_OFFSET_EXPONENT + 1,
            ..VaultConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LedgerError::InvalidOffset(19))
        ));
    }

    #[test]
    fn max_offset_fits_u64() {
        assert!(10u128.pow(MAX_OFFSET_EXPONENT as u32) <= u64::MAX as u128);
        assert!(10u128.pow(MAX_OFFSET_EXPONENT as u32 + 1) > u64::MAX as u128);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: VaultConfig = serde_json::from_str(r#"{"deposit_cap": 500}"#).unwrap();
        assert_eq!(config.deposit_cap, 500);
        assert_eq!(config.offset_exponent, DEFAULT_OFFSET_EXPONENT);
        assert_eq!(config.minimum_deposit, 0);
    }
}
