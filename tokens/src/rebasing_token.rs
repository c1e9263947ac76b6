//! # Rebasing Token
//!
//! A token whose balances follow an externally reported pooled total. All
//! share math lives in [`RebasingLedger`]; this wrapper adds the rules a
//! deployed token needs on top of it.
//!
//! ## Rules
//!
//! - **Minting** requires [`Role::Minter`]. Supply is created against value
//!   that already entered the pool elsewhere (e.g. staked deposits).
//! - **Burning** is self-service: a holder burns from its own balance.
//! - **Rebasing** requires [`Role::Rebaser`], normally held by an oracle.
//! - **Delegation**: `approve` / `transfer_from` with value-denominated
//!   allowances.
//! - **Pause**: while paused every mutating call fails with
//!   [`AccessError::Paused`]. Role management stays available. The flag
//!   lives under the same lock as the ledger, so once `pause` returns no
//!   mutation can still land.
//! - **Events**: the ledger keeps a bounded journal. Embedders that need
//!   every event call [`RebasingToken::drain_events`] regularly; anything
//!   left undrained past the journal capacity is evicted oldest first.

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use shareledger_core::{Address, LedgerEvent, RebasingLedger, Rounding};

use crate::access::{AccessControl, AccessError, Role};
use crate::allowance::Allowances;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Display metadata shared by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Human-readable name (e.g. "Staked Ether").
    pub name: String,
    /// Ticker symbol (e.g. "stETH").
    pub symbol: String,
    /// Decimal places used when displaying amounts.
    pub decimals: u8,
    /// When the token was created.
    pub created_at: DateTime<Utc>,
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct State {
    ledger: RebasingLedger,
    allowances: Allowances,
    access: AccessControl,
    paused: bool,
}

/// Thread-safe rebasing token.
#[derive(Debug)]
pub struct RebasingToken {
    metadata: TokenMetadata,
    state: RwLock<State>,
}

impl RebasingToken {
    /// Creates an empty token administered by `admin`.
    pub fn new(metadata: TokenMetadata, admin: &Address) -> Self {
        tracing::info!(
            name = %metadata.name,
            symbol = %metadata.symbol,
            %admin,
            "rebasing token created"
        );
        Self {
            metadata,
            state: RwLock::new(State {
                ledger: RebasingLedger::new(),
                allowances: Allowances::new(),
                access: AccessControl::new(admin),
                paused: false,
            }),
        }
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    // -----------------------------------------------------------------------
    // Roles and pause
    // -----------------------------------------------------------------------

    /// Grants `role` to `account`. Requires [`Role::Admin`].
    pub fn grant_role(&self, caller: &Address, role: Role, account: &Address) -> Result<bool> {
        Ok(self.state.write().access.grant(caller, role, account)?)
    }

    /// Revokes `role` from `account`. Requires [`Role::Admin`].
    pub fn revoke_role(&self, caller: &Address, role: Role, account: &Address) -> Result<bool> {
        Ok(self.state.write().access.revoke(caller, role, account)?)
    }

    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.state.read().access.has_role(account, role)
    }

    /// Blocks every mutating call. Requires [`Role::Pauser`].
    pub fn pause(&self, caller: &Address) -> Result<()> {
        let mut state = self.state.write();
        state.access.require(caller, Role::Pauser)?;
        if !std::mem::replace(&mut state.paused, true) {
            tracing::warn!(symbol = %self.metadata.symbol, by = %caller, "token paused");
        }
        Ok(())
    }

    /// Lifts a pause. Requires [`Role::Pauser`].
    pub fn unpause(&self, caller: &Address) -> Result<()> {
        let mut state = self.state.write();
        state.access.require(caller, Role::Pauser)?;
        if std::mem::replace(&mut state.paused, false) {
            tracing::info!(symbol = %self.metadata.symbol, by = %caller, "token unpaused");
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    /// Write guard over a state that is not paused.
    fn live_state(&self) -> Result<RwLockWriteGuard<'_, State>> {
        let state = self.state.write();
        if state.paused {
            return Err(AccessError::Paused.into());
        }
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Mints `value` to `to`. Requires [`Role::Minter`]. Returns the shares
    /// credited.
    pub fn mint(&self, caller: &Address, to: &Address, value: u64) -> Result<u64> {
        let mut state = self.live_state()?;
        state.access.require(caller, Role::Minter)?;
        Ok(state.ledger.mint(to, value)?)
    }

    /// Burns `value` from the caller's own balance. Returns the shares burned.
    pub fn burn(&self, holder: &Address, value: u64) -> Result<u64> {
        Ok(self.live_state()?.ledger.burn(holder, value)?)
    }

    /// Moves `value` from `from` to `to`. Returns the shares moved.
    pub fn transfer(&self, from: &Address, to: &Address, value: u64) -> Result<u64> {
        Ok(self.live_state()?.ledger.transfer(from, to, value)?)
    }

    /// Moves an exact share count. Returns the value moved.
    pub fn transfer_shares(&self, from: &Address, to: &Address, shares: u64) -> Result<u64> {
        Ok(self.live_state()?.ledger.transfer_shares(from, to, shares)?)
    }

    /// Lets `spender` move up to `value` of `owner`'s balance.
    pub fn approve(&self, owner: &Address, spender: &Address, value: u64) -> Result<()> {
        self.live_state()?.allowances.approve(owner, spender, value)?;
        tracing::debug!(%owner, %spender, value, "allowance set");
        Ok(())
    }

    /// Moves `value` from `from` to `to` on behalf of `spender`, consuming
    /// allowance unless `spender` is `from`. Returns the shares moved.
    pub fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        value: u64,
    ) -> Result<u64> {
        let mut guard = self.live_state()?;
        let state = &mut *guard;
        let delegated = spender != from;
        if delegated {
            state.allowances.check(from, spender, value)?;
        }
        let shares = state.ledger.transfer(from, to, value)?;
        if delegated {
            state.allowances.spend(from, spender, value)?;
        }
        Ok(shares)
    }

    /// Reports a new pooled total. Requires [`Role::Rebaser`]. Returns the
    /// previous total.
    pub fn rebase(&self, caller: &Address, new_total_pooled: u64) -> Result<u64> {
        let mut state = self.live_state()?;
        state.access.require(caller, Role::Rebaser)?;
        Ok(state.ledger.rebase(new_total_pooled)?)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Total supply as seen by holders: the pooled value.
    pub fn total_supply(&self) -> u64 {
        self.state.read().ledger.total_pooled()
    }

    pub fn total_shares(&self) -> u64 {
        self.state.read().ledger.total_shares()
    }

    pub fn balance_of(&self, account: &Address) -> u64 {
        self.state.read().ledger.balance_of(account)
    }

    pub fn shares_of(&self, account: &Address) -> u64 {
        self.state.read().ledger.shares_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.state.read().allowances.allowance(owner, spender)
    }

    /// Shares `value` is worth right now, rounded down.
    pub fn shares_by_value(&self, value: u64) -> Result<u64> {
        Ok(self
            .state
            .read()
            .ledger
            .shares_for_value(value, Rounding::Down)?)
    }

    /// Value `shares` are worth right now, rounded down.
    pub fn value_by_shares(&self, shares: u64) -> Result<u64> {
        Ok(self
            .state
            .read()
            .ledger
            .value_for_shares(shares, Rounding::Down)?)
    }

    pub fn holder_count(&self) -> usize {
        self.state.read().ledger.holder_count()
    }

    /// Runs `f` against a consistent view of the ledger.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&RebasingLedger) -> R) -> R {
        f(&self.state.read().ledger)
    }

    /// Takes every ledger event recorded since the last drain, minus any
    /// the bounded journal already evicted.
    pub fn drain_events(&self) -> Vec<LedgerEvent> {
        self.state.write().ledger.drain_events()
    }
}
