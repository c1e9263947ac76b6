//! # Allowances
//!
//! Delegated spending limits keyed by `(owner, spender)`. The unit depends on
//! the token: the rebasing token approves value, the vault token approves
//! shares. An allowance of `u64::MAX` is unlimited and never decremented.

use serde::{Deserialize, Serialize};
use shareledger_core::Address;
use std::collections::HashMap;
use thiserror::Error;

/// Allowance value that [`Allowances::spend`] never decrements.
pub const UNLIMITED_ALLOWANCE: u64 = u64::MAX;

/// Errors raised by allowance bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllowanceError {
    /// Owner or spender is the null address.
    #[error("allowance owner and spender must be non-zero addresses")]
    ZeroAddress,

    /// The spender's allowance does not cover the amount.
    #[error("insufficient allowance: {spender} may spend {allowance} of {owner}'s, requested {requested}")]
    Insufficient {
        /// Account whose balance is being spent.
        owner: Address,
        /// Account doing the spending.
        spender: Address,
        /// Current allowance.
        allowance: u64,
        /// Amount the spender tried to use.
        requested: u64,
    },
}

/// Allowance table for one token.
#[derive(Debug, Clone, Default)]
pub struct Allowances {
    entries: HashMap<(Address, Address), u64>,
}

impl Allowances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the allowance of `spender` over `owner`'s balance to `amount`,
    /// replacing any previous value. Zero clears the entry.
    pub fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<(), AllowanceError> {
        if owner.is_zero() || spender.is_zero() {
            return Err(AllowanceError::ZeroAddress);
        }
        if amount == 0 {
            self.entries.remove(&(*owner, *spender));
        } else {
            self.entries.insert((*owner, *spender), amount);
        }
        Ok(())
    }

    /// Current allowance, 0 if none was granted.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.entries
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Fails unless `spender` may spend `amount` of `owner`'s balance.
    /// Does not change anything.
    pub fn check(
        &self,
        owner: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<(), AllowanceError> {
        let allowance = self.allowance(owner, spender);
        if allowance < amount {
            return Err(AllowanceError::Insufficient {
                owner: *owner,
                spender: *spender,
                allowance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Consumes `amount` of the allowance and returns what is left.
    /// Unlimited allowances are left untouched.
    pub fn spend(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<u64, AllowanceError> {
        self.check(owner, spender, amount)?;
        let key = (*owner, *spender);
        let Some(current) = self.entries.get_mut(&key) else {
            // Only reachable with amount == 0 and no entry.
            return Ok(0);
        };
        if *current == UNLIMITED_ALLOWANCE {
            return Ok(UNLIMITED_ALLOWANCE);
        }
        *current -= amount;
        let remaining = *current;
        if remaining == 0 {
            self.entries.remove(&key);
        }
        Ok(remaining)
    }

    /// Number of non-zero allowances.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialized as a list of `{owner, spender, amount}` records, since JSON
/// object keys cannot be tuples.
#[derive(Serialize, Deserialize)]
struct AllowanceRecord {
    owner: Address,
    spender: Address,
    amount: u64,
}

impl Serialize for Allowances {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut records: Vec<AllowanceRecord> = self
            .entries
            .iter()
            .map(|((owner, spender), amount)| AllowanceRecord {
                owner: *owner,
                spender: *spender,
                amount: *amount,
            })
            .collect();
        records.sort_by(|a, b| (a.owner, a.spender).cmp(&(b.owner, b.spender)));
        records.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Allowances {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<AllowanceRecord>::deserialize(deserializer)?;
        let entries = records
            .into_iter()
            .filter(|r| r.amount > 0)
            .map(|r| ((r.owner, r.spender), r.amount))
            .collect();
        Ok(Self { entries })
    }
}
