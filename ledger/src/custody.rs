//! # Asset Custody
//!
//! The vault ledger never holds the underlying asset itself. It reads the
//! pooled balance from, and asks for transfers through, an [`AssetCustody`]
//! implementation. In production that is whatever moves the real asset;
//! [`InMemoryCustody`] is the reference implementation used by tests, the
//! CLI, and anyone embedding the vault without an external asset system.
//!
//! Retries and timeouts around the actual asset movement belong to the
//! custody implementation. The ledger calls each method at most once per
//! operation and treats an error as final.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::address::Address;

/// Errors raised by a custody implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    /// The source does not hold enough of the underlying asset.
    #[error("insufficient funds for {holder}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Holder whose balance was short.
        holder: Address,
        /// Underlying asset available.
        available: u64,
        /// Underlying asset requested.
        requested: u64,
    },

    /// A balance would exceed `u64::MAX`.
    #[error("custody balance overflow")]
    Overflow,
}

/// The collaborator that holds the vault's underlying asset.
pub trait AssetCustody {
    /// Underlying asset currently held on behalf of the vault.
    fn total_assets(&self) -> u64;

    /// Moves `amount` from `from` into the vault's pool.
    fn pull(&mut self, from: &Address, amount: u64) -> Result<(), CustodyError>;

    /// Moves `amount` out of the vault's pool to `to`.
    fn push(&mut self, to: &Address, amount: u64) -> Result<(), CustodyError>;
}

/// Custody that tracks both the pool and every holder's external balance
/// of the underlying asset in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCustody {
    pooled: u64,
    holders: HashMap<Address, u64>,
}

impl InMemoryCustody {
    /// Empty pool, no holders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` of the underlying asset to `holder` from outside the
    /// system (a faucet, a bridge, a test fixture).
    pub fn fund(&mut self, holder: &Address, amount: u64) -> Result<u64, CustodyError> {
        let balance = self.holders.entry(*holder).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(*balance)
    }

    /// Underlying asset `holder` holds outside the vault.
    pub fn balance_of(&self, holder: &Address) -> u64 {
        self.holders.get(holder).copied().unwrap_or(0)
    }

    /// Sends assets straight into the pool without issuing shares.
    ///
    /// This is the donation half of the first-depositor inflation attack.
    /// It raises every share's value, including the phantom shares.
    pub fn donate(&mut self, from: &Address, amount: u64) -> Result<(), CustodyError> {
        self.pull(from, amount)
    }

    fn debit_holder(&mut self, holder: &Address, amount: u64) -> Result<(), CustodyError> {
        let available = self.balance_of(holder);
        if available < amount {
            return Err(CustodyError::InsufficientFunds {
                holder: *holder,
                available,
                requested: amount,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.holders.remove(holder);
        } else {
            self.holders.insert(*holder, remaining);
        }
        Ok(())
    }
}

impl AssetCustody for InMemoryCustody {
    fn total_assets(&self) -> u64 {
        self.pooled
    }

    fn pull(&mut self, from: &Address, amount: u64) -> Result<(), CustodyError> {
        let new_pooled = self
            .pooled
            .checked_add(amount)
            .ok_or(CustodyError::Overflow)?;
        self.debit_holder(from, amount)?;
        self.pooled = new_pooled;
        Ok(())
    }

    fn push(&mut self, to: &Address, amount: u64) -> Result<(), CustodyError> {
        if self.pooled < amount {
            return Err(CustodyError::InsufficientFunds {
                holder: Address::ZERO,
                available: self.pooled,
                requested: amount,
            });
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(CustodyError::Overflow)?;
        self.pooled -= amount;
        self.holders.insert(*to, credited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_moves_funds_into_pool() {
        let alice = Address::from_label("alice");
        let mut custody = InMemoryCustody::new();
        custody.fund(&alice, 1_000).unwrap();

        custody.pull(&alice, 400).unwrap();
        assert_eq!(custody.total_assets(), 400);
        assert_eq!(custody.balance_of(&alice), 600);
    }

    #[test]
    fn pull_beyond_balance_leaves_state_untouched() {
        let alice = Address::from_label("alice");
        let mut custody = InMemoryCustody::new();
        custody.fund(&alice, 100).unwrap();

        let err = custody.pull(&alice, 101).unwrap_err();
        assert!(matches!(
            err,
            CustodyError::InsufficientFunds {
                available: 100,
                requested: 101,
                ..
            }
        ));
        assert_eq!(custody.total_assets(), 0);
        assert_eq!(custody.balance_of(&alice), 100);
    }

    #[test]
    fn push_pays_out_of_pool() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut custody = InMemoryCustody::new();
        custody.fund(&alice, 500).unwrap();
        custody.pull(&alice, 500).unwrap();

        custody.push(&bob, 200).unwrap();
        assert_eq!(custody.total_assets(), 300);
        assert_eq!(custody.balance_of(&bob), 200);
        assert!(custody.push(&bob, 301).is_err());
    }

    #[test]
    fn donate_grows_pool() {
        let mallory = Address::from_label("mallory");
        let mut custody = InMemoryCustody::new();
        custody.fund(&mallory, 10).unwrap();
        custody.donate(&mallory, 10).unwrap();
        assert_eq!(custody.total_assets(), 10);
        assert_eq!(custody.balance_of(&mallory), 0);
    }

    #[test]
    fn fund_overflow_rejected() {
        let alice = Address::from_label("alice");
        let mut custody = InMemoryCustody::new();
        custody.fund(&alice, u64::MAX).unwrap();
        assert_eq!(custody.fund(&alice, 1), Err(CustodyError::Overflow));
    }
}
