//! # Vault Ledger
//!
//! Depositors hand the vault an underlying asset and receive shares priced
//! against everything the vault holds. The asset itself sits with an
//! [`AssetCustody`] collaborator; this ledger owns only the share book and
//! the two administrative bounds (deposit cap, minimum deposit).
//!
//! ## Entry Points
//!
//! | Call       | Caller fixes | Ledger computes         | Rounding |
//! |------------|--------------|-------------------------|----------|
//! | `deposit`  | assets in    | shares issued           | Down     |
//! | `mint`     | shares out   | assets required         | Up       |
//! | `withdraw` | assets out   | shares burned           | Up       |
//! | `redeem`   | shares in    | assets returned         | Down     |
//!
//! Each has a read-only `preview_*` twin using the same rounding, and a
//! `max_*` bound that a call at that size is guaranteed not to trip.
//!
//! ## Ordering
//!
//! Every check runs first, then the custody transfer, then the share book
//! update. Anything that could still fail after the custody transfer is
//! checked up front, so a custody success is never followed by a ledger
//! failure.

use std::collections::VecDeque;

use crate::address::Address;
use crate::book::ShareBook;
use crate::config::{VaultConfig, UNLIMITED_DEPOSIT_CAP};
use crate::custody::AssetCustody;
use crate::error::{LedgerError, Result};
use crate::event::{EventJournal, LedgerEvent};
use crate::math::{MathError, Pool, Rounding, VirtualOffset};

/// Share ledger backed by an external asset pool.
#[derive(Debug, Clone)]
pub struct VaultLedger<C> {
    book: ShareBook,
    custody: C,
    offset: VirtualOffset,
    deposit_cap: u64,
    minimum_deposit: u64,
    journal: EventJournal,
}

impl<C: AssetCustody> VaultLedger<C> {
    /// Creates an empty vault over `custody`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidOffset`] if the configured offset is out of range.
    pub fn new(config: &VaultConfig, custody: C) -> Result<Self> {
        config.validate()?;
        let offset = VirtualOffset::new(config.offset_exponent)
            .ok_or(LedgerError::InvalidOffset(config.offset_exponent))?;

        tracing::debug!(
            offset_exponent = config.offset_exponent,
            deposit_cap = config.deposit_cap,
            minimum_deposit = config.minimum_deposit,
            "vault ledger created"
        );

        Ok(Self {
            book: ShareBook::new(),
            custody,
            offset,
            deposit_cap: config.deposit_cap,
            minimum_deposit: config.minimum_deposit,
            journal: EventJournal::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn offset_exponent(&self) -> u8 {
        self.offset.exponent()
    }

    /// Current cap on total assets. `0` means unlimited.
    pub fn deposit_cap(&self) -> u64 {
        self.deposit_cap
    }

    pub fn minimum_deposit(&self) -> u64 {
        self.minimum_deposit
    }

    /// Replaces the deposit cap. Does not affect existing deposits.
    pub fn set_deposit_cap(&mut self, cap: u64) {
        tracing::info!(old = self.deposit_cap, new = cap, "deposit cap updated");
        self.deposit_cap = cap;
    }

    pub fn set_minimum_deposit(&mut self, minimum: u64) {
        tracing::info!(
            old = self.minimum_deposit,
            new = minimum,
            "minimum deposit updated"
        );
        self.minimum_deposit = minimum;
    }

    /// The custody collaborator.
    pub fn custody(&self) -> &C {
        &self.custody
    }

    /// Mutable access to the custody collaborator, for funding holders and
    /// for modelling direct donations to the pool.
    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Underlying assets held for the vault, as reported by custody.
    pub fn total_assets(&self) -> u64 {
        self.custody.total_assets()
    }

    /// Vault shares outstanding.
    pub fn total_supply(&self) -> u64 {
        self.book.total()
    }

    pub fn shares_of(&self, account: &Address) -> u64 {
        self.book.shares_of(account)
    }

    pub fn holder_count(&self) -> usize {
        self.book.holder_count()
    }

    pub fn book(&self) -> &ShareBook {
        &self.book
    }

    fn pool(&self) -> Pool {
        Pool::with_offset(self.book.total(), self.total_assets(), self.offset)
    }

    pub fn convert_to_shares(&self, assets: u64) -> Result<u64> {
        Ok(self.pool().shares_for(assets, Rounding::Down)?)
    }

    pub fn convert_to_assets(&self, shares: u64) -> Result<u64> {
        Ok(self.pool().value_for(shares, Rounding::Down)?)
    }

    /// Shares a deposit of `assets` would issue.
    pub fn preview_deposit(&self, assets: u64) -> Result<u64> {
        Ok(self.pool().shares_for(assets, Rounding::Down)?)
    }

    /// Assets a mint of `shares` would require.
    pub fn preview_mint(&self, shares: u64) -> Result<u64> {
        Ok(self.pool().value_for(shares, Rounding::Up)?)
    }

    /// Shares a withdrawal of `assets` would burn.
    pub fn preview_withdraw(&self, assets: u64) -> Result<u64> {
        Ok(self.pool().shares_for(assets, Rounding::Up)?)
    }

    /// Assets a redemption of `shares` would return.
    pub fn preview_redeem(&self, shares: u64) -> Result<u64> {
        Ok(self.pool().value_for(shares, Rounding::Down)?)
    }

    /// Largest deposit that clears the cap and minimum checks and whose
    /// shares still fit in the supply.
    pub fn max_deposit(&self, _receiver: &Address) -> u64 {
        let total = self.total_assets();
        let cap_room = if self.deposit_cap == UNLIMITED_DEPOSIT_CAP {
            u64::MAX - total
        } else {
            self.deposit_cap.saturating_sub(total)
        };
        // An overflow here means the bound lies past u64::MAX.
        let share_room = u64::MAX - self.book.total();
        let supply_room = self
            .pool()
            .value_for(share_room, Rounding::Down)
            .unwrap_or(u64::MAX);

        let headroom = cap_room.min(supply_room);
        if headroom == 0 || headroom < self.minimum_deposit {
            return 0;
        }
        match self.preview_deposit(headroom) {
            Ok(shares) if shares > 0 => headroom,
            _ => 0,
        }
    }

    /// Largest mint whose required assets fit under [`max_deposit`](Self::max_deposit).
    pub fn max_mint(&self, receiver: &Address) -> u64 {
        let max_assets = self.max_deposit(receiver);
        if max_assets == 0 {
            return 0;
        }
        self.pool()
            .shares_for(max_assets, Rounding::Down)
            .unwrap_or(0)
    }

    /// Largest withdrawal `owner`'s shares cover.
    pub fn max_withdraw(&self, owner: &Address) -> u64 {
        // Owner shares never exceed the supply, so this cannot overflow.
        self.pool()
            .value_for(self.shares_of(owner), Rounding::Down)
            .unwrap_or(0)
    }

    pub fn max_redeem(&self, owner: &Address) -> u64 {
        self.shares_of(owner)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Pulls `assets` from `caller` and issues shares to `receiver`.
    /// Returns the shares issued.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAddress`] for a null receiver.
    /// - [`LedgerError::BelowMinimumDeposit`] / [`LedgerError::DepositCapExceeded`].
    /// - [`LedgerError::ZeroAmount`] / [`LedgerError::ZeroShares`].
    /// - [`LedgerError::Custody`] if the asset pull fails.
    pub fn deposit(&mut self, caller: &Address, assets: u64, receiver: &Address) -> Result<u64> {
        if receiver.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        self.check_deposit_bounds(assets)?;
        if assets == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let shares = self.preview_deposit(assets)?;
        if shares == 0 {
            return Err(LedgerError::ZeroShares { value: assets });
        }
        self.ensure_supply_room(shares)?;

        self.custody.pull(caller, assets)?;
        self.book.credit(receiver, shares)?;

        self.journal.record(LedgerEvent::Deposited {
            caller: *caller,
            receiver: *receiver,
            assets,
            shares,
        });
        Ok(shares)
    }

    /// Issues exactly `shares` to `receiver`, pulling whatever assets they
    /// cost (rounded up) from `caller`. Returns the assets pulled.
    ///
    /// # Errors
    ///
    /// Same as [`deposit`](Self::deposit), with the cap and minimum applied
    /// to the computed asset amount.
    pub fn mint(&mut self, caller: &Address, shares: u64, receiver: &Address) -> Result<u64> {
        if receiver.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        if shares == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let assets = self.preview_mint(shares)?;
        self.check_deposit_bounds(assets)?;
        self.ensure_supply_room(shares)?;

        self.custody.pull(caller, assets)?;
        self.book.credit(receiver, shares)?;

        self.journal.record(LedgerEvent::Deposited {
            caller: *caller,
            receiver: *receiver,
            assets,
            shares,
        });
        Ok(assets)
    }

    /// Sends `assets` to `receiver`, burning the shares they cost (rounded
    /// up) from `owner`. Returns the shares burned.
    ///
    /// The caller is trusted to be `owner` or an approved spender; the
    /// token surface enforces that.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAddress`] for a null receiver or owner.
    /// - [`LedgerError::ZeroAmount`] if `assets` is 0.
    /// - [`LedgerError::InsufficientShares`] if `owner` cannot cover the burn.
    /// - [`LedgerError::Custody`] if the asset push fails.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        assets: u64,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u64> {
        if receiver.is_zero() || owner.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        if assets == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let shares = self.preview_withdraw(assets)?;
        let available = self.book.shares_of(owner);
        if available < shares {
            return Err(LedgerError::InsufficientShares {
                available,
                required: shares,
            });
        }

        self.custody.push(receiver, assets)?;
        self.book.debit(owner, shares)?;

        self.journal.record(LedgerEvent::Withdrawn {
            caller: *caller,
            receiver: *receiver,
            owner: *owner,
            assets,
            shares,
        });
        Ok(shares)
    }

    /// Burns exactly `shares` from `owner` and sends what they are worth
    /// (rounded down) to `receiver`. Returns the assets sent.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAddress`] for a null receiver or owner.
    /// - [`LedgerError::ZeroAmount`] if `shares` is 0 or worth nothing.
    /// - [`LedgerError::InsufficientShares`] if `owner` holds fewer shares.
    /// - [`LedgerError::Custody`] if the asset push fails.
    pub fn redeem(
        &mut self,
        caller: &Address,
        shares: u64,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u64> {
        if receiver.is_zero() || owner.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        if shares == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let available = self.book.shares_of(owner);
        if available < shares {
            return Err(LedgerError::InsufficientShares {
                available,
                required: shares,
            });
        }
        let assets = self.preview_redeem(shares)?;
        if assets == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        self.custody.push(receiver, assets)?;
        self.book.debit(owner, shares)?;

        self.journal.record(LedgerEvent::Withdrawn {
            caller: *caller,
            receiver: *receiver,
            owner: *owner,
            assets,
            shares,
        });
        Ok(assets)
    }

    /// Moves vault shares between holders. Returns the asset value they
    /// represent, rounded down.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ZeroAddress`] or [`LedgerError::InsufficientBalance`].
    pub fn transfer(&mut self, from: &Address, to: &Address, shares: u64) -> Result<u64> {
        if from.is_zero() || to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }

        let value = self.convert_to_assets(shares)?;
        self.book.move_shares(from, to, shares)?;

        self.journal.record(LedgerEvent::Transferred {
            from: *from,
            to: *to,
            value,
            shares,
        });
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        self.journal.drain()
    }

    pub fn pending_events(&self) -> &VecDeque<LedgerEvent> {
        self.journal.pending()
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn check_deposit_bounds(&self, assets: u64) -> Result<()> {
        if assets < self.minimum_deposit {
            return Err(LedgerError::BelowMinimumDeposit {
                minimum: self.minimum_deposit,
                value: assets,
            });
        }

        let total_assets = self.total_assets();
        if self.deposit_cap != UNLIMITED_DEPOSIT_CAP {
            let exceeds = total_assets
                .checked_add(assets)
                .map_or(true, |after| after > self.deposit_cap);
            if exceeds {
                return Err(LedgerError::DepositCapExceeded {
                    cap: self.deposit_cap,
                    total_assets,
                    value: assets,
                });
            }
        }
        Ok(())
    }

    fn ensure_supply_room(&self, shares: u64) -> Result<()> {
        self.book
            .total()
            .checked_add(shares)
            .map(|_| ())
            .ok_or(LedgerError::Math(MathError::Overflow))
    }
}
