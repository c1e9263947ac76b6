//! # Rebasing Ledger
//!
//! Holders own shares; the token's visible supply is `total_pooled`. A
//! holder's balance is always
//!
//! ```text
//! balance_of(a) = floor(shares(a) * total_pooled / total_shares)
//! ```
//!
//! so a [`rebase`](RebasingLedger::rebase) that replaces `total_pooled`
//! moves every balance at once without visiting a single account. That is
//! the whole point: rebase cost does not grow with the holder count.
//!
//! ## Supply Lifecycle
//!
//! The ledger starts empty and the first mint is priced 1:1. Whenever the
//! last share is burned, any pooled value left behind by rounding is
//! written off (a [`LedgerEvent::SupplyReset`] is recorded), so
//! `total_shares == 0` always implies `total_pooled == 0` and the next mint
//! bootstraps at 1:1 again.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::book::ShareBook;
use crate::error::{LedgerError, Result};
use crate::event::{EventJournal, LedgerEvent};
use crate::math::{MathError, Pool, Rounding};

/// Share ledger whose pooled value is set directly by `rebase`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebasingLedger {
    book: ShareBook,
    total_pooled: u64,
    #[serde(skip)]
    journal: EventJournal,
}

impl RebasingLedger {
    /// Creates an empty ledger: no shares, no pooled value.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn total_shares(&self) -> u64 {
        self.book.total()
    }

    /// The token's visible total supply.
    pub fn total_pooled(&self) -> u64 {
        self.total_pooled
    }

    pub fn shares_of(&self, account: &Address) -> u64 {
        self.book.shares_of(account)
    }

    /// Visible balance of `account`, rounded down.
    pub fn balance_of(&self, account: &Address) -> u64 {
        // shares(a) <= total_shares, so the quotient is at most
        // total_pooled and the conversion cannot overflow.
        self.pool()
            .value_for(self.shares_of(account), Rounding::Down)
            .unwrap_or(0)
    }

    pub fn holder_count(&self) -> usize {
        self.book.holder_count()
    }

    /// Read access to the underlying share book.
    pub fn book(&self) -> &ShareBook {
        &self.book
    }

    /// Shares that `value` is worth at the current rate.
    pub fn shares_for_value(&self, value: u64, rounding: Rounding) -> Result<u64> {
        Ok(self.pool().shares_for(value, rounding)?)
    }

    /// Value that `shares` are worth at the current rate.
    pub fn value_for_shares(&self, shares: u64, rounding: Rounding) -> Result<u64> {
        Ok(self.pool().value_for(shares, rounding)?)
    }

    fn pool(&self) -> Pool {
        Pool::plain(self.book.total(), self.total_pooled)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Creates `value` of new supply for `to`. Returns the shares credited.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAddress`] if `to` is the null address.
    /// - [`LedgerError::ZeroAmount`] if `value` is 0.
    /// - [`LedgerError::ZeroShares`] if `value` is worth less than one share.
    /// - [`LedgerError::Math`] if the supply would overflow.
    pub fn mint(&mut self, to: &Address, value: u64) -> Result<u64> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        if value == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let shares = self.pool().shares_for(value, Rounding::Down)?;
        if shares == 0 {
            return Err(LedgerError::ZeroShares { value });
        }
        let new_pooled = self
            .total_pooled
            .checked_add(value)
            .ok_or(MathError::Overflow)?;

        self.book.credit(to, shares)?;
        self.total_pooled = new_pooled;

        self.journal.record(LedgerEvent::Minted {
            to: *to,
            value,
            shares,
        });
        Ok(shares)
    }

    /// Destroys `value` of supply held by `from`. Returns the shares burned.
    ///
    /// Shares are rounded up: the ledger keeps the remainder.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAddress`] if `from` is the null address.
    /// - [`LedgerError::ZeroAmount`] if `value` is 0.
    /// - [`LedgerError::InsufficientShares`] if `from` cannot cover the shares.
    pub fn burn(&mut self, from: &Address, value: u64) -> Result<u64> {
        if from.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        if value == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let shares = self.pool().shares_for(value, Rounding::Up)?;
        let available = self.book.shares_of(from);
        if available < shares {
            return Err(LedgerError::InsufficientShares {
                available,
                required: shares,
            });
        }
        // shares <= total_shares implies value <= total_pooled.
        let new_pooled = self
            .total_pooled
            .checked_sub(value)
            .ok_or(LedgerError::InsufficientShares {
                available,
                required: shares,
            })?;

        self.book.debit(from, shares)?;
        self.total_pooled = new_pooled;

        self.journal.record(LedgerEvent::Burned {
            from: *from,
            value,
            shares,
        });

        if self.book.total() == 0 && self.total_pooled > 0 {
            let swept_value = self.total_pooled;
            self.total_pooled = 0;
            tracing::warn!(swept_value, "last shares burned, writing off residual pooled value");
            self.journal.record(LedgerEvent::SupplyReset { swept_value });
        }

        Ok(shares)
    }

    /// Moves `value` from `from` to `to`. Returns the shares moved.
    ///
    /// Shares are rounded down, so the sender never parts with more than
    /// `value` is worth. A value smaller than one share moves nothing.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAddress`] if either side is the null address.
    /// - [`LedgerError::InsufficientBalance`] if `from` lacks the shares.
    pub fn transfer(&mut self, from: &Address, to: &Address, value: u64) -> Result<u64> {
        if from.is_zero() || to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }

        let shares = self.pool().shares_for(value, Rounding::Down)?;
        self.book.move_shares(from, to, shares)?;

        self.journal.record(LedgerEvent::Transferred {
            from: *from,
            to: *to,
            value,
            shares,
        });
        Ok(shares)
    }

    /// Moves an exact number of shares. Returns the value they represent,
    /// rounded down.
    ///
    /// # Errors
    ///
    /// Same as [`transfer`](Self::transfer).
    pub fn transfer_shares(&mut self, from: &Address, to: &Address, shares: u64) -> Result<u64> {
        if from.is_zero() || to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }

        let value = self.pool().value_for(shares, Rounding::Down)?;
        self.book.move_shares(from, to, shares)?;

        self.journal.record(LedgerEvent::Transferred {
            from: *from,
            to: *to,
            value,
            shares,
        });
        Ok(value)
    }

    /// Replaces the pooled value. Returns the previous value.
    ///
    /// O(1): no account record is read or written.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidRebaseAmount`] if `new_total_pooled` is 0, or
    /// if no shares exist to carry the new value.
    pub fn rebase(&mut self, new_total_pooled: u64) -> Result<u64> {
        if new_total_pooled == 0 || self.book.total() == 0 {
            return Err(LedgerError::InvalidRebaseAmount);
        }

        let old_total_pooled = self.total_pooled;
        self.total_pooled = new_total_pooled;

        self.journal.record(LedgerEvent::Rebased {
            old_total_pooled,
            new_total_pooled,
            total_shares: self.book.total(),
        });
        Ok(old_total_pooled)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Takes every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        self.journal.drain()
    }

    /// Events recorded since the last drain.
    pub fn pending_events(&self) -> &VecDeque<LedgerEvent> {
        self.journal.pending()
    }
}
