//! # Vault Token
//!
//! Tokenized vault shares over a [`VaultLedger`]. Holders deposit the
//! underlying asset and receive shares; the share price moves with whatever
//! the custody collaborator reports as the vault's total assets.
//!
//! ## Rules
//!
//! - `deposit` / `mint` are open to anyone.
//! - `withdraw` / `redeem` burn from `owner`. A caller other than the owner
//!   needs a share allowance, checked before anything moves and consumed
//!   only on success.
//! - Deposit cap and minimum deposit are set by [`Role::VaultManager`]
//!   holders. These setters stay available while paused.
//! - While paused, every holder-facing mutation fails with
//!   [`AccessError::Paused`] and every `max_*` read reports 0. The flag is
//!   checked under the state lock, so a call either completes before
//!   `pause` returns or is rejected.
//! - Ledger events collect in a bounded journal. Call
//!   [`VaultToken::drain_events`] regularly to see all of them.

use parking_lot::{RwLock, RwLockWriteGuard};
use shareledger_core::{Address, AssetCustody, LedgerEvent, VaultConfig, VaultLedger};

use crate::access::{AccessControl, AccessError, Role};
use crate::allowance::Allowances;
use crate::error::Result;
use crate::rebasing_token::TokenMetadata;

#[derive(Debug)]
struct State<C> {
    ledger: VaultLedger<C>,
    allowances: Allowances,
    access: AccessControl,
    paused: bool,
}

/// Thread-safe vault share token.
#[derive(Debug)]
pub struct VaultToken<C> {
    metadata: TokenMetadata,
    state: RwLock<State<C>>,
}

impl<C: AssetCustody> VaultToken<C> {
    /// Creates an empty vault over `custody`, administered by `admin`.
    ///
    /// # Errors
    ///
    /// Fails if `config` is invalid (offset exponent out of range).
    pub fn new(
        metadata: TokenMetadata,
        config: &VaultConfig,
        custody: C,
        admin: &Address,
    ) -> Result<Self> {
        let ledger = VaultLedger::new(config, custody)?;
        tracing::info!(
            name = %metadata.name,
            symbol = %metadata.symbol,
            offset_exponent = config.offset_exponent,
            %admin,
            "vault token created"
        );
        Ok(Self {
            metadata,
            state: RwLock::new(State {
                ledger,
                allowances: Allowances::new(),
                access: AccessControl::new(admin),
                paused: false,
            }),
        })
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    // -----------------------------------------------------------------------
    // Roles, pause, and vault bounds
    // -----------------------------------------------------------------------

    pub fn grant_role(&self, caller: &Address, role: Role, account: &Address) -> Result<bool> {
        Ok(self.state.write().access.grant(caller, role, account)?)
    }

    pub fn revoke_role(&self, caller: &Address, role: Role, account: &Address) -> Result<bool> {
        Ok(self.state.write().access.revoke(caller, role, account)?)
    }

    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.state.read().access.has_role(account, role)
    }

    pub fn pause(&self, caller: &Address) -> Result<()> {
        let mut state = self.state.write();
        state.access.require(caller, Role::Pauser)?;
        if !std::mem::replace(&mut state.paused, true) {
            tracing::warn!(symbol = %self.metadata.symbol, by = %caller, "vault paused");
        }
        Ok(())
    }

    pub fn unpause(&self, caller: &Address) -> Result<()> {
        let mut state = self.state.write();
        state.access.require(caller, Role::Pauser)?;
        if std::mem::replace(&mut state.paused, false) {
            tracing::info!(symbol = %self.metadata.symbol, by = %caller, "vault unpaused");
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    fn live_state(&self) -> Result<RwLockWriteGuard<'_, State<C>>> {
        let state = self.state.write();
        if state.paused {
            return Err(AccessError::Paused.into());
        }
        Ok(state)
    }

    /// Sets the total-assets cap (0 = unlimited). Requires [`Role::VaultManager`].
    pub fn set_deposit_cap(&self, caller: &Address, cap: u64) -> Result<()> {
        let mut state = self.state.write();
        state.access.require(caller, Role::VaultManager)?;
        state.ledger.set_deposit_cap(cap);
        Ok(())
    }

    /// Sets the smallest accepted deposit. Requires [`Role::VaultManager`].
    pub fn set_minimum_deposit(&self, caller: &Address, minimum: u64) -> Result<()> {
        let mut state = self.state.write();
        state.access.require(caller, Role::VaultManager)?;
        state.ledger.set_minimum_deposit(minimum);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Deposits `assets` from `caller`, issuing shares to `receiver`.
    /// Returns the shares issued.
    pub fn deposit(&self, caller: &Address, assets: u64, receiver: &Address) -> Result<u64> {
        Ok(self.live_state()?.ledger.deposit(caller, assets, receiver)?)
    }

    /// Issues exactly `shares` to `receiver`. Returns the assets charged.
    pub fn mint(&self, caller: &Address, shares: u64, receiver: &Address) -> Result<u64> {
        Ok(self.live_state()?.ledger.mint(caller, shares, receiver)?)
    }

    /// Sends `assets` to `receiver`, burning `owner`'s shares. Returns the
    /// shares burned.
    pub fn withdraw(
        &self,
        caller: &Address,
        assets: u64,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u64> {
        let mut guard = self.live_state()?;
        let state = &mut *guard;
        let delegated = caller != owner;
        if delegated {
            let shares = state.ledger.preview_withdraw(assets)?;
            state.allowances.check(owner, caller, shares)?;
        }
        let shares = state.ledger.withdraw(caller, assets, receiver, owner)?;
        if delegated {
            state.allowances.spend(owner, caller, shares)?;
        }
        Ok(shares)
    }

    /// Burns `shares` from `owner`, sending their value to `receiver`.
    /// Returns the assets sent.
    pub fn redeem(
        &self,
        caller: &Address,
        shares: u64,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u64> {
        let mut guard = self.live_state()?;
        let state = &mut *guard;
        let delegated = caller != owner;
        if delegated {
            state.allowances.check(owner, caller, shares)?;
        }
        let assets = state.ledger.redeem(caller, shares, receiver, owner)?;
        if delegated {
            state.allowances.spend(owner, caller, shares)?;
        }
        Ok(assets)
    }

    /// Moves vault shares. Returns the asset value they represent.
    pub fn transfer(&self, from: &Address, to: &Address, shares: u64) -> Result<u64> {
        Ok(self.live_state()?.ledger.transfer(from, to, shares)?)
    }

    /// Lets `spender` move or redeem up to `shares` of `owner`'s shares.
    pub fn approve(&self, owner: &Address, spender: &Address, shares: u64) -> Result<()> {
        self.live_state()?.allowances.approve(owner, spender, shares)?;
        Ok(())
    }

    pub fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        shares: u64,
    ) -> Result<u64> {
        let mut guard = self.live_state()?;
        let state = &mut *guard;
        let delegated = spender != from;
        if delegated {
            state.allowances.check(from, spender, shares)?;
        }
        let value = state.ledger.transfer(from, to, shares)?;
        if delegated {
            state.allowances.spend(from, spender, shares)?;
        }
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn total_assets(&self) -> u64 {
        self.state.read().ledger.total_assets()
    }

    pub fn total_supply(&self) -> u64 {
        self.state.read().ledger.total_supply()
    }

    pub fn shares_of(&self, account: &Address) -> u64 {
        self.state.read().ledger.shares_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.state.read().allowances.allowance(owner, spender)
    }

    pub fn holder_count(&self) -> usize {
        self.state.read().ledger.holder_count()
    }

    pub fn offset_exponent(&self) -> u8 {
        self.state.read().ledger.offset_exponent()
    }

    pub fn deposit_cap(&self) -> u64 {
        self.state.read().ledger.deposit_cap()
    }

    pub fn minimum_deposit(&self) -> u64 {
        self.state.read().ledger.minimum_deposit()
    }

    pub fn convert_to_shares(&self, assets: u64) -> Result<u64> {
        Ok(self.state.read().ledger.convert_to_shares(assets)?)
    }

    pub fn convert_to_assets(&self, shares: u64) -> Result<u64> {
        Ok(self.state.read().ledger.convert_to_assets(shares)?)
    }

    pub fn preview_deposit(&self, assets: u64) -> Result<u64> {
        Ok(self.state.read().ledger.preview_deposit(assets)?)
    }

    pub fn preview_mint(&self, shares: u64) -> Result<u64> {
        Ok(self.state.read().ledger.preview_mint(shares)?)
    }

    pub fn preview_withdraw(&self, assets: u64) -> Result<u64> {
        Ok(self.state.read().ledger.preview_withdraw(assets)?)
    }

    pub fn preview_redeem(&self, shares: u64) -> Result<u64> {
        Ok(self.state.read().ledger.preview_redeem(shares)?)
    }

    pub fn max_deposit(&self, receiver: &Address) -> u64 {
        let state = self.state.read();
        if state.paused {
            return 0;
        }
        state.ledger.max_deposit(receiver)
    }

    pub fn max_mint(&self, receiver: &Address) -> u64 {
        let state = self.state.read();
        if state.paused {
            return 0;
        }
        state.ledger.max_mint(receiver)
    }

    pub fn max_withdraw(&self, owner: &Address) -> u64 {
        let state = self.state.read();
        if state.paused {
            return 0;
        }
        state.ledger.max_withdraw(owner)
    }

    pub fn max_redeem(&self, owner: &Address) -> u64 {
        let state = self.state.read();
        if state.paused {
            return 0;
        }
        state.ledger.max_redeem(owner)
    }

    /// Runs `f` against the custody collaborator.
    pub fn with_custody<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(self.state.read().ledger.custody())
    }

    /// Runs `f` with mutable custody access. Used to fund holders and to
    /// model assets arriving outside `deposit` (yield, donations).
    pub fn with_custody_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(self.state.write().ledger.custody_mut())
    }

    /// Runs `f` against a consistent view of the ledger.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&VaultLedger<C>) -> R) -> R {
        f(&self.state.read().ledger)
    }

    pub fn drain_events(&self) -> Vec<LedgerEvent> {
        self.state.write().ledger.drain_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowance::AllowanceError;
    use crate::error::TokenError;
    use shareledger_core::{InMemoryCustody, LedgerError};

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn vault() -> VaultToken<InMemoryCustody> {
        let mut custody = InMemoryCustody::new();
        custody.fund(&addr("alice"), 1_000_000).unwrap();
        custody.fund(&addr("bob"), 1_000_000).unwrap();
        let v = VaultToken::new(
            TokenMetadata::new("Vault USDC", "vUSDC", 12),
            &VaultConfig::default(),
            custody,
            &addr("admin"),
        )
        .unwrap();
        v.grant_role(&addr("admin"), Role::VaultManager, &addr("manager"))
            .unwrap();
        v.grant_role(&addr("admin"), Role::Pauser, &addr("guardian"))
            .unwrap();
        v
    }

    #[test]
    fn first_deposit_uses_offset() {
        let v = vault();
        assert_eq!(v.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap(), 1_000_000_000);
        assert_eq!(v.total_assets(), 1_000);
        assert_eq!(v.total_supply(), 1_000_000_000);
        assert_eq!(v.offset_exponent(), 6);
    }

    #[test]
    fn delegated_withdraw_spends_share_allowance() {
        let v = vault();
        v.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap();
        v.approve(&addr("alice"), &addr("keeper"), 500_000_000).unwrap();

        let burned = v
            .withdraw(&addr("keeper"), 400, &addr("keeper"), &addr("alice"))
            .unwrap();
        assert_eq!(burned, 400_000_000);
        assert_eq!(v.allowance(&addr("alice"), &addr("keeper")), 100_000_000);
        assert_eq!(v.with_custody(|c| c.balance_of(&addr("keeper"))), 400);
        assert_eq!(v.shares_of(&addr("alice")), 600_000_000);
    }

    #[test]
    fn delegated_withdraw_without_allowance_is_rejected() {
        let v = vault();
        v.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap();

        let err = v
            .withdraw(&addr("mallory"), 1, &addr("mallory"), &addr("alice"))
            .unwrap_err();
        assert!(matches!(
            err,
            TokenError::Allowance(AllowanceError::Insufficient { allowance: 0, .. })
        ));
        assert_eq!(v.shares_of(&addr("alice")), 1_000_000_000);
        assert_eq!(v.total_assets(), 1_000);
    }

    #[test]
    fn delegated_redeem_spends_exact_shares() {
        let v = vault();
        v.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap();
        v.approve(&addr("alice"), &addr("keeper"), 100_000_000).unwrap();

        let assets = v
            .redeem(&addr("keeper"), 100_000_000, &addr("bob"), &addr("alice"))
            .unwrap();
        assert_eq!(assets, 100);
        assert_eq!(v.allowance(&addr("alice"), &addr("keeper")), 0);
        assert_eq!(v.with_custody(|c| c.balance_of(&addr("bob"))), 1_000_100);
    }

    #[test]
    fn owner_withdraw_needs_no_allowance() {
        let v = vault();
        v.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap();
        v.withdraw(&addr("alice"), 1_000, &addr("alice"), &addr("alice"))
            .unwrap();
        assert_eq!(v.total_supply(), 0);
        assert_eq!(v.with_custody(|c| c.balance_of(&addr("alice"))), 1_000_000);
    }

    #[test]
    fn manager_sets_bounds() {
        let v = vault();
        assert!(matches!(
            v.set_deposit_cap(&addr("alice"), 10),
            Err(TokenError::Access(AccessError::Unauthorized { role: Role::VaultManager, .. }))
        ));

        v.set_deposit_cap(&addr("manager"), 1_500).unwrap();
        v.set_minimum_deposit(&addr("manager"), 100).unwrap();
        assert_eq!(v.deposit_cap(), 1_500);
        assert_eq!(v.minimum_deposit(), 100);

        v.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap();
        assert_eq!(v.max_deposit(&addr("bob")), 500);
        assert!(matches!(
            v.deposit(&addr("bob"), 600, &addr("bob")),
            Err(TokenError::Ledger(LedgerError::DepositCapExceeded { .. }))
        ));
        assert!(matches!(
            v.deposit(&addr("bob"), 99, &addr("bob")),
            Err(TokenError::Ledger(LedgerError::BelowMinimumDeposit { .. }))
        ));
    }

    #[test]
    fn pause_zeroes_limits() {
        let v = vault();
        v.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap();
        v.pause(&addr("guardian")).unwrap();

        assert_eq!(v.max_deposit(&addr("alice")), 0);
        assert_eq!(v.max_mint(&addr("alice")), 0);
        assert_eq!(v.max_withdraw(&addr("alice")), 0);
        assert_eq!(v.max_redeem(&addr("alice")), 0);
        assert_eq!(
            v.deposit(&addr("alice"), 1, &addr("alice")).unwrap_err(),
            TokenError::Access(AccessError::Paused)
        );
        // Previews and bound setters still work.
        assert_eq!(v.preview_redeem(1_000_000).unwrap(), 1);
        v.set_deposit_cap(&addr("manager"), 5_000).unwrap();

        v.unpause(&addr("guardian")).unwrap();
        assert_eq!(v.max_redeem(&addr("alice")), 1_000_000_000);
    }

    #[test]
    fn share_transfer_from() {
        let v = vault();
        v.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap();
        v.approve(&addr("alice"), &addr("bob"), 10_000_000).unwrap();
        let value = v
            .transfer_from(&addr("bob"), &addr("alice"), &addr("bob"), 10_000_000)
            .unwrap();
        assert_eq!(value, 10);
        assert_eq!(v.shares_of(&addr("bob")), 10_000_000);
        assert_eq!(v.allowance(&addr("alice"), &addr("bob")), 0);
    }

    #[test]
    fn invalid_offset_rejected_at_construction() {
        let config = VaultConfig {
            offset_exponent: 19,
            ..VaultConfig::default()
        };
        let err = VaultToken::new(
            TokenMetadata::new("Bad", "BAD", 6),
            &config,
            InMemoryCustody::new(),
            &addr("admin"),
        )
        .unwrap_err();
        assert_eq!(err, TokenError::Ledger(LedgerError::InvalidOffset(19)));
    }
}
