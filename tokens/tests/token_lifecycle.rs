//! Integration tests for the token surface.
//!
//! These run both tokens through multi-party flows and concurrent access:
//! role setup, staking rewards, delegated spending, pausing, and many
//! threads hammering one token at once.

use proptest::prelude::*;
use shareledger_core::{Address, InMemoryCustody, LedgerEvent, VaultConfig};
use shareledger_tokens::{
    AccessError, RebasingToken, Role, TokenError, TokenMetadata, VaultToken,
};
use std::sync::Arc;
use std::thread;

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

/// Helper: a rebasing token with minter, oracle and guardian roles granted.
fn staked_token() -> RebasingToken {
    let admin = addr("admin");
    let token = RebasingToken::new(TokenMetadata::new("Staked Ether", "stETH", 18), &admin);
    token.grant_role(&admin, Role::Minter, &addr("pool")).unwrap();
    token.grant_role(&admin, Role::Rebaser, &addr("oracle")).unwrap();
    token.grant_role(&admin, Role::Pauser, &addr("guardian")).unwrap();
    token
}

fn funded_vault(holders: &[&str]) -> VaultToken<InMemoryCustody> {
    let mut custody = InMemoryCustody::new();
    for h in holders {
        custody.fund(&addr(h), 1_000_000_000).unwrap();
    }
    VaultToken::new(
        TokenMetadata::new("Vault USDC", "vUSDC", 12),
        &VaultConfig::default(),
        custody,
        &addr("admin"),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Rebasing token flows
// ---------------------------------------------------------------------------

#[test]
fn staking_rewards_lifecycle() {
    let token = staked_token();

    // 1. Two stakers enter at 1:1.
    token.mint(&addr("pool"), &addr("alice"), 3_000).unwrap();
    token.mint(&addr("pool"), &addr("bob"), 1_000).unwrap();

    // 2. Oracle reports 10% rewards.
    token.rebase(&addr("oracle"), 4_400).unwrap();
    assert_eq!(token.balance_of(&addr("alice")), 3_300);
    assert_eq!(token.balance_of(&addr("bob")), 1_100);

    // 3. Bob exits completely; Alice keeps her share of the pool.
    token.burn(&addr("bob"), 1_100).unwrap();
    assert_eq!(token.total_supply(), 3_300);
    assert_eq!(token.shares_of(&addr("alice")), 3_000);

    let kinds: Vec<&str> = token.drain_events().iter().map(LedgerEvent::name).collect();
    assert_eq!(kinds, vec!["minted", "minted", "rebased", "burned"]);
}

#[test]
fn revoked_minter_loses_access() {
    let token = staked_token();
    token.mint(&addr("pool"), &addr("alice"), 10).unwrap();
    token
        .revoke_role(&addr("admin"), Role::Minter, &addr("pool"))
        .unwrap();
    assert!(!token.has_role(&addr("pool"), Role::Minter));
    assert!(matches!(
        token.mint(&addr("pool"), &addr("alice"), 10),
        Err(TokenError::Access(AccessError::Unauthorized { .. }))
    ));
}

#[test]
fn role_changes_allowed_while_paused() {
    let token = staked_token();
    token.pause(&addr("guardian")).unwrap();
    token
        .grant_role(&addr("admin"), Role::Minter, &addr("backup"))
        .unwrap();
    assert!(token.has_role(&addr("backup"), Role::Minter));
}

#[test]
fn concurrent_transfers_conserve_shares() {
    let token = Arc::new(staked_token());
    let holders: Vec<Address> = (0..8).map(|i| addr(&format!("holder-{i}"))).collect();
    for h in &holders {
        token.mint(&addr("pool"), h, 1_000_000).unwrap();
    }
    token.rebase(&addr("oracle"), 9_000_000).unwrap();
    let total_shares = token.total_shares();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let token = Arc::clone(&token);
            let holders = holders.clone();
            thread::spawn(move || {
                let from = holders[i];
                let to = holders[(i + 1) % holders.len()];
                for _ in 0..200 {
                    // Insufficient balance is acceptable here.
                    let _ = token.transfer(&from, &to, 997);
                }
            })
        })
        .collect();

    // A rebaser racing the transfers must never break the share total.
    let oracle = {
        let token = Arc::clone(&token);
        thread::spawn(move || {
            for step in 0..100u64 {
                token.rebase(&addr("oracle"), 9_000_000 + step * 10).unwrap();
            }
        })
    };

    for h in handles {
        h.join().unwrap();
    }
    oracle.join().unwrap();

    let sum: u64 = holders.iter().map(|h| token.shares_of(h)).sum();
    assert_eq!(sum, total_shares);
    assert_eq!(token.total_shares(), total_shares);
}

#[test]
fn nothing_lands_after_pause_returns() {
    let token = Arc::new(staked_token());
    let holders: Vec<Address> = (0..4).map(|i| addr(&format!("holder-{i}"))).collect();
    for h in &holders {
        token.mint(&addr("pool"), h, 1_000_000).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let token = Arc::clone(&token);
            let holders = holders.clone();
            thread::spawn(move || {
                let from = holders[i];
                let to = holders[(i + 1) % holders.len()];
                for _ in 0..2_000 {
                    let _ = token.transfer(&from, &to, 13);
                }
            })
        })
        .collect();

    token.pause(&addr("guardian")).unwrap();
    let frozen: Vec<u64> = holders.iter().map(|h| token.shares_of(h)).collect();

    for h in handles {
        h.join().unwrap();
    }

    let after: Vec<u64> = holders.iter().map(|h| token.shares_of(h)).collect();
    assert_eq!(after, frozen);
    assert_eq!(
        token.transfer(&holders[0], &holders[1], 1).unwrap_err(),
        TokenError::Access(AccessError::Paused)
    );
}

// ---------------------------------------------------------------------------
// Vault token flows
// ---------------------------------------------------------------------------

#[test]
fn donation_does_not_steal_from_next_depositor() {
    let vault = funded_vault(&["mallory", "victim"]);

    vault.deposit(&addr("mallory"), 1, &addr("mallory")).unwrap();
    vault
        .with_custody_mut(|c| c.donate(&addr("mallory"), 100_000_000))
        .unwrap();
    vault
        .deposit(&addr("victim"), 100_000_000, &addr("victim"))
        .unwrap();

    let victim_claim = vault.max_withdraw(&addr("victim"));
    // The offset caps the attacker's skim at a vanishing fraction.
    assert!(victim_claim >= 99_999_000);
    assert!(victim_claim <= 100_000_000);
}

#[test]
fn vault_deposits_stop_once_pause_returns() {
    let holders = ["alice", "bob", "carol"];
    let vault = Arc::new(funded_vault(&holders));
    vault
        .grant_role(&addr("admin"), Role::Pauser, &addr("guardian"))
        .unwrap();

    let handles: Vec<_> = holders
        .iter()
        .map(|label| {
            let vault = Arc::clone(&vault);
            let who = addr(label);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let _ = vault.deposit(&who, 1_000, &who);
                }
            })
        })
        .collect();

    vault.pause(&addr("guardian")).unwrap();
    let frozen = (vault.total_assets(), vault.total_supply());

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!((vault.total_assets(), vault.total_supply()), frozen);
    assert_eq!(vault.max_deposit(&addr("alice")), 0);
}

#[test]
fn keeper_harvests_on_behalf_of_owner() {
    let vault = funded_vault(&["alice"]);
    vault.deposit(&addr("alice"), 1_000, &addr("alice")).unwrap();
    vault
        .approve(&addr("alice"), &addr("keeper"), u64::MAX)
        .unwrap();

    vault
        .withdraw(&addr("keeper"), 250, &addr("alice"), &addr("alice"))
        .unwrap();
    vault
        .redeem(&addr("keeper"), 250_000_000, &addr("alice"), &addr("alice"))
        .unwrap();

    // Unlimited allowance survives both calls.
    assert_eq!(vault.allowance(&addr("alice"), &addr("keeper")), u64::MAX);
    assert_eq!(vault.total_assets(), 500);
    assert_eq!(vault.shares_of(&addr("alice")), 500_000_000);
}

#[test]
fn concurrent_deposits_account_for_every_asset() {
    let labels: Vec<String> = (0..6).map(|i| format!("lp-{i}")).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let vault = Arc::new(funded_vault(&refs));

    let handles: Vec<_> = labels
        .iter()
        .map(|label| {
            let vault = Arc::clone(&vault);
            let who = addr(label);
            thread::spawn(move || {
                for _ in 0..50 {
                    vault.deposit(&who, 1_000, &who).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(vault.total_assets(), 6 * 50 * 1_000);
    let sum: u64 = labels.iter().map(|l| vault.shares_of(&addr(l))).sum();
    assert_eq!(sum, vault.total_supply());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Property: allowance spent by transfer_from equals the value moved,
    /// and a rejected call leaves the allowance untouched.
    #[test]
    fn transfer_from_spends_exactly_value(
        minted in 1u64..1_000_000,
        approved in 0u64..2_000_000,
        value in 0u64..2_000_000,
    ) {
        let token = staked_token();
        token.mint(&addr("pool"), &addr("alice"), minted).unwrap();
        token.approve(&addr("alice"), &addr("bob"), approved).unwrap();

        match token.transfer_from(&addr("bob"), &addr("alice"), &addr("carol"), value) {
            Ok(_) => prop_assert_eq!(
                token.allowance(&addr("alice"), &addr("bob")),
                approved - value
            ),
            Err(_) => prop_assert_eq!(token.allowance(&addr("alice"), &addr("bob")), approved),
        }
    }
}
