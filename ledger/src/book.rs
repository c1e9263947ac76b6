//! Per-account share balances plus their running total.
//!
//! A [`ShareBook`] is the only place shares are stored. It keeps
//! `total == Σ accounts` by construction: every credit and debit updates
//! both sides or neither. Accounts that reach zero are removed, so an empty
//! entry and a never-seen address are indistinguishable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::Address;
use crate::error::{LedgerError, Result};
use crate::math::MathError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareBook {
    total: u64,
    accounts: HashMap<Address, u64>,
}

impl ShareBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn shares_of(&self, account: &Address) -> u64 {
        self.accounts.get(account).copied().unwrap_or(0)
    }

    /// Number of accounts with a nonzero balance.
    pub fn holder_count(&self) -> usize {
        self.accounts.len()
    }

    /// All nonzero balances, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u64)> {
        self.accounts.iter()
    }

    /// Adds `shares` to `account` and to the total. Returns the new balance.
    pub fn credit(&mut self, account: &Address, shares: u64) -> Result<u64> {
        // The account balance never exceeds the total, so checking the
        // total covers both additions.
        let new_total = self
            .total
            .checked_add(shares)
            .ok_or(LedgerError::Math(MathError::Overflow))?;
        if shares == 0 {
            return Ok(self.shares_of(account));
        }
        let balance = self.accounts.entry(*account).or_insert(0);
        *balance += shares;
        self.total = new_total;
        Ok(*balance)
    }

    /// Removes `shares` from `account` and from the total. Returns the new
    /// balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientShares`] if the account holds fewer shares.
    pub fn debit(&mut self, account: &Address, shares: u64) -> Result<u64> {
        let available = self.shares_of(account);
        if available < shares {
            return Err(LedgerError::InsufficientShares {
                available,
                required: shares,
            });
        }
        let remaining = available - shares;
        self.set(account, remaining);
        self.total -= shares;
        Ok(remaining)
    }

    /// Moves shares between two accounts. The total does not change.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if `from` holds fewer shares.
    pub fn move_shares(&mut self, from: &Address, to: &Address, shares: u64) -> Result<()> {
        let available = self.shares_of(from);
        if available < shares {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: shares,
            });
        }
        if from == to || shares == 0 {
            return Ok(());
        }
        self.set(from, available - shares);
        let credited = self.shares_of(to) + shares;
        self.set(to, credited);
        Ok(())
    }

    fn set(&mut self, account: &Address, shares: u64) {
        if shares == 0 {
            self.accounts.remove(account);
        } else {
            self.accounts.insert(*account, shares);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(book: &ShareBook) -> u64 {
        book.iter().map(|(_, s)| *s).sum()
    }

    #[test]
    fn credit_and_debit_track_total() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut book = ShareBook::new();

        book.credit(&alice, 700).unwrap();
        book.credit(&bob, 300).unwrap();
        assert_eq!(book.total(), 1_000);

        assert_eq!(book.debit(&alice, 200).unwrap(), 500);
        assert_eq!(book.total(), 800);
        assert_eq!(sum(&book), book.total());
    }

    #[test]
    fn debit_beyond_balance_rejected() {
        let alice = Address::from_label("alice");
        let mut book = ShareBook::new();
        book.credit(&alice, 10).unwrap();

        assert_eq!(
            book.debit(&alice, 11),
            Err(LedgerError::InsufficientShares {
                available: 10,
                required: 11
            })
        );
        assert_eq!(book.total(), 10);
    }

    #[test]
    fn zero_balances_are_pruned() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut book = ShareBook::new();
        book.credit(&alice, 50).unwrap();

        book.move_shares(&alice, &bob, 50).unwrap();
        assert_eq!(book.holder_count(), 1);
        assert_eq!(book.shares_of(&alice), 0);

        book.debit(&bob, 50).unwrap();
        assert_eq!(book.holder_count(), 0);
        assert_eq!(book.total(), 0);
    }

    #[test]
    fn move_beyond_balance_rejected() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut book = ShareBook::new();
        book.credit(&alice, 5).unwrap();

        assert_eq!(
            book.move_shares(&alice, &bob, 6),
            Err(LedgerError::InsufficientBalance {
                available: 5,
                requested: 6
            })
        );
        assert_eq!(book.shares_of(&alice), 5);
        assert_eq!(book.shares_of(&bob), 0);
    }

    #[test]
    fn self_move_is_a_no_op() {
        let alice = Address::from_label("alice");
        let mut book = ShareBook::new();
        book.credit(&alice, 5).unwrap();
        book.move_shares(&alice, &alice, 5).unwrap();
        assert_eq!(book.shares_of(&alice), 5);
    }

    #[test]
    fn total_overflow_rejected() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut book = ShareBook::new();
        book.credit(&alice, u64::MAX).unwrap();
        assert!(matches!(
            book.credit(&bob, 1),
            Err(LedgerError::Math(MathError::Overflow))
        ));
        assert_eq!(book.shares_of(&bob), 0);
    }
}
