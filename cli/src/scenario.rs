//! # Scenario Replay
//!
//! A scenario is a JSON document naming a token kind and an ordered list of
//! steps. The runner builds the token, grants every privileged role to a
//! fixed `operator` account, applies the steps in order, and streams each
//! ledger event to the output as one JSON line.
//!
//! ```json
//! {
//!   "name": "staking rewards",
//!   "kind": "rebasing",
//!   "steps": [
//!     { "op": "mint", "to": "alice", "value": 1000000 },
//!     { "op": "rebase", "total": 1100000 },
//!     { "op": "transfer", "from": "alice", "to": "bob", "amount": 100000 }
//!   ]
//! }
//! ```
//!
//! Accounts are labels hashed into addresses; a `0x`-prefixed hex string is
//! taken as a literal address. A step the ledger rejects is logged and
//! counted, and aborts the run only in strict mode. A step that does not
//! exist for the scenario's kind always aborts.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shareledger_core::config::DEFAULT_DECIMALS;
use shareledger_core::{Address, InMemoryCustody, LedgerError, LedgerEvent, VaultConfig};
use shareledger_tokens::{RebasingToken, Role, TokenError, TokenMetadata, VaultToken};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use crate::metrics::LedgerMetrics;

/// Label of the account that holds every privileged role during a replay.
pub const OPERATOR_LABEL: &str = "operator";

// ---------------------------------------------------------------------------
// Scenario format
// ---------------------------------------------------------------------------

/// Which token a scenario drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Rebasing,
    Vault,
}

/// A replayable sequence of token operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Free-form name, echoed in the summary.
    #[serde(default)]
    pub name: String,
    pub kind: ScenarioKind,
    /// Vault parameters. Ignored for rebasing scenarios.
    #[serde(default)]
    pub vault: VaultConfig,
    /// Starting external asset balances for vault scenarios, by account label.
    #[serde(default)]
    pub funding: BTreeMap<String, u64>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Reads and parses a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Every account label the scenario mentions, in sorted order.
    fn account_labels(&self) -> BTreeSet<&str> {
        let mut labels: BTreeSet<&str> = self.funding.keys().map(String::as_str).collect();
        for step in &self.steps {
            labels.extend(step.accounts());
        }
        labels
    }
}

/// One operation. `transfer`, `approve`, `transfer_from`, `pause` and
/// `unpause` apply to both kinds; the rest belong to one kind only.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Value for a rebasing token, shares for a vault.
    Transfer {
        from: String,
        to: String,
        amount: u64,
    },
    Approve {
        owner: String,
        spender: String,
        amount: u64,
    },
    TransferFrom {
        spender: String,
        from: String,
        to: String,
        amount: u64,
    },
    Pause,
    Unpause,

    // Rebasing only.
    Mint {
        to: String,
        value: u64,
    },
    Burn {
        from: String,
        value: u64,
    },
    TransferShares {
        from: String,
        to: String,
        shares: u64,
    },
    Rebase {
        total: u64,
    },

    // Vault only. `receiver` and `owner` default to `caller`.
    Deposit {
        caller: String,
        assets: u64,
        #[serde(default)]
        receiver: Option<String>,
    },
    MintShares {
        caller: String,
        shares: u64,
        #[serde(default)]
        receiver: Option<String>,
    },
    Withdraw {
        caller: String,
        assets: u64,
        #[serde(default)]
        receiver: Option<String>,
        #[serde(default)]
        owner: Option<String>,
    },
    Redeem {
        caller: String,
        shares: u64,
        #[serde(default)]
        receiver: Option<String>,
        #[serde(default)]
        owner: Option<String>,
    },
    /// Assets sent straight to the vault without minting shares.
    Donate {
        from: String,
        assets: u64,
    },
    SetDepositCap {
        cap: u64,
    },
    SetMinimumDeposit {
        minimum: u64,
    },
}

impl Step {
    /// Operation name, used as the metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Transfer { .. } => "transfer",
            Step::Approve { .. } => "approve",
            Step::TransferFrom { .. } => "transfer_from",
            Step::Pause => "pause",
            Step::Unpause => "unpause",
            Step::Mint { .. } => "mint",
            Step::Burn { .. } => "burn",
            Step::TransferShares { .. } => "transfer_shares",
            Step::Rebase { .. } => "rebase",
            Step::Deposit { .. } => "deposit",
            Step::MintShares { .. } => "mint_shares",
            Step::Withdraw { .. } => "withdraw",
            Step::Redeem { .. } => "redeem",
            Step::Donate { .. } => "donate",
            Step::SetDepositCap { .. } => "set_deposit_cap",
            Step::SetMinimumDeposit { .. } => "set_minimum_deposit",
        }
    }

    fn accounts(&self) -> Vec<&str> {
        match self {
            Step::Transfer { from, to, .. } | Step::TransferShares { from, to, .. } => {
                vec![from.as_str(), to.as_str()]
            }
            Step::Approve { owner, spender, .. } => vec![owner.as_str(), spender.as_str()],
            Step::TransferFrom {
                spender, from, to, ..
            } => vec![spender.as_str(), from.as_str(), to.as_str()],
            Step::Mint { to, .. } => vec![to.as_str()],
            Step::Burn { from, .. } | Step::Donate { from, .. } => vec![from.as_str()],
            Step::Deposit {
                caller, receiver, ..
            }
            | Step::MintShares {
                caller, receiver, ..
            } => std::iter::once(caller)
                .chain(receiver.as_ref())
                .map(String::as_str)
                .collect(),
            Step::Withdraw {
                caller,
                receiver,
                owner,
                ..
            }
            | Step::Redeem {
                caller,
                receiver,
                owner,
                ..
            } => std::iter::once(caller)
                .chain(receiver.as_ref())
                .chain(owner.as_ref())
                .map(String::as_str)
                .collect(),
            Step::Pause
            | Step::Unpause
            | Step::Rebase { .. }
            | Step::SetDepositCap { .. }
            | Step::SetMinimumDeposit { .. } => Vec::new(),
        }
    }
}

/// Resolves an account label to an address.
pub fn account(label: &str) -> Address {
    if label.starts_with("0x") {
        if let Ok(address) = label.parse() {
            return address;
        }
    }
    Address::from_label(label)
}

fn account_or(label: &Option<String>, fallback: &Address) -> Address {
    label.as_deref().map_or(*fallback, account)
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Final state of a replay, printed after the event stream.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub scenario: String,
    pub kind: ScenarioKind,
    pub applied: usize,
    pub rejected: usize,
    pub total_shares: u64,
    /// Pooled value (rebasing) or total assets (vault).
    pub total_value: u64,
    pub accounts: Vec<Position>,
}

/// One account's holdings at the end of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub account: String,
    pub address: Address,
    pub shares: u64,
    pub value: u64,
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

enum StepFailure {
    Rejected(TokenError),
    Unsupported,
}

impl From<TokenError> for StepFailure {
    fn from(err: TokenError) -> Self {
        StepFailure::Rejected(err)
    }
}

/// A token the runner can drive.
trait Target {
    fn apply(&self, step: &Step, operator: &Address) -> Result<(), StepFailure>;
    fn drain_events(&self) -> Vec<LedgerEvent>;
    /// `(total_shares, total_value)`.
    fn totals(&self) -> (u64, u64);
    /// `(shares, value)` held by `account`.
    fn position(&self, account: &Address) -> (u64, u64);
}

impl Target for RebasingToken {
    fn apply(&self, step: &Step, operator: &Address) -> Result<(), StepFailure> {
        match step {
            Step::Transfer { from, to, amount } => {
                self.transfer(&account(from), &account(to), *amount)?;
            }
            Step::Approve {
                owner,
                spender,
                amount,
            } => self.approve(&account(owner), &account(spender), *amount)?,
            Step::TransferFrom {
                spender,
                from,
                to,
                amount,
            } => {
                self.transfer_from(&account(spender), &account(from), &account(to), *amount)?;
            }
            Step::Pause => self.pause(operator)?,
            Step::Unpause => self.unpause(operator)?,
            Step::Mint { to, value } => {
                self.mint(operator, &account(to), *value)?;
            }
            Step::Burn { from, value } => {
                self.burn(&account(from), *value)?;
            }
            Step::TransferShares { from, to, shares } => {
                self.transfer_shares(&account(from), &account(to), *shares)?;
            }
            Step::Rebase { total } => {
                self.rebase(operator, *total)?;
            }
            _ => return Err(StepFailure::Unsupported),
        }
        Ok(())
    }

    fn drain_events(&self) -> Vec<LedgerEvent> {
        RebasingToken::drain_events(self)
    }

    fn totals(&self) -> (u64, u64) {
        (self.total_shares(), self.total_supply())
    }

    fn position(&self, account: &Address) -> (u64, u64) {
        (self.shares_of(account), self.balance_of(account))
    }
}

impl Target for VaultToken<InMemoryCustody> {
    fn apply(&self, step: &Step, operator: &Address) -> Result<(), StepFailure> {
        match step {
            Step::Transfer { from, to, amount } => {
                self.transfer(&account(from), &account(to), *amount)?;
            }
            Step::Approve {
                owner,
                spender,
                amount,
            } => self.approve(&account(owner), &account(spender), *amount)?,
            Step::TransferFrom {
                spender,
                from,
                to,
                amount,
            } => {
                self.transfer_from(&account(spender), &account(from), &account(to), *amount)?;
            }
            Step::Pause => self.pause(operator)?,
            Step::Unpause => self.unpause(operator)?,
            Step::Deposit {
                caller,
                assets,
                receiver,
            } => {
                let caller = account(caller);
                self.deposit(&caller, *assets, &account_or(receiver, &caller))?;
            }
            Step::MintShares {
                caller,
                shares,
                receiver,
            } => {
                let caller = account(caller);
                self.mint(&caller, *shares, &account_or(receiver, &caller))?;
            }
            Step::Withdraw {
                caller,
                assets,
                receiver,
                owner,
            } => {
                let caller = account(caller);
                self.withdraw(
                    &caller,
                    *assets,
                    &account_or(receiver, &caller),
                    &account_or(owner, &caller),
                )?;
            }
            Step::Redeem {
                caller,
                shares,
                receiver,
                owner,
            } => {
                let caller = account(caller);
                self.redeem(
                    &caller,
                    *shares,
                    &account_or(receiver, &caller),
                    &account_or(owner, &caller),
                )?;
            }
            Step::Donate { from, assets } => {
                let from = account(from);
                self.with_custody_mut(|c| c.donate(&from, *assets))
                    .map_err(|e| TokenError::from(LedgerError::from(e)))?;
                tracing::info!(%from, assets, "assets donated to vault");
            }
            Step::SetDepositCap { cap } => self.set_deposit_cap(operator, *cap)?,
            Step::SetMinimumDeposit { minimum } => {
                self.set_minimum_deposit(operator, *minimum)?;
            }
            _ => return Err(StepFailure::Unsupported),
        }
        Ok(())
    }

    fn drain_events(&self) -> Vec<LedgerEvent> {
        VaultToken::drain_events(self)
    }

    fn totals(&self) -> (u64, u64) {
        (self.total_supply(), self.total_assets())
    }

    fn position(&self, account: &Address) -> (u64, u64) {
        let shares = self.shares_of(account);
        // Holder shares never exceed supply, so the conversion cannot fail.
        let value = self.convert_to_assets(shares).unwrap_or(0);
        (shares, value)
    }
}

fn rebasing_token(operator: &Address) -> Result<RebasingToken> {
    let token = RebasingToken::new(
        TokenMetadata::new("ShareLedger Staked", "slSTK", DEFAULT_DECIMALS),
        operator,
    );
    for role in [Role::Minter, Role::Rebaser, Role::Pauser] {
        token.grant_role(operator, role, operator)?;
    }
    Ok(token)
}

fn vault_token(scenario: &Scenario, operator: &Address) -> Result<VaultToken<InMemoryCustody>> {
    let mut custody = InMemoryCustody::new();
    for (label, amount) in &scenario.funding {
        custody
            .fund(&account(label), *amount)
            .with_context(|| format!("failed to fund {label}"))?;
    }
    let token = VaultToken::new(
        TokenMetadata::new("ShareLedger Vault", "slVLT", DEFAULT_DECIMALS),
        &scenario.vault,
        custody,
        operator,
    )
    .context("invalid vault configuration")?;
    for role in [Role::Pauser, Role::VaultManager] {
        token.grant_role(operator, role, operator)?;
    }
    Ok(token)
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Replays `scenario`, writing one JSON line per ledger event to `out`.
///
/// # Errors
///
/// Fails on an I/O error, on a step that does not exist for the scenario's
/// kind, and, when `strict` is set, on the first rejected step.
pub fn run(
    scenario: &Scenario,
    metrics: &LedgerMetrics,
    strict: bool,
    out: &mut dyn Write,
) -> Result<Summary> {
    let operator = Address::from_label(OPERATOR_LABEL);
    tracing::info!(
        name = %scenario.name,
        kind = ?scenario.kind,
        steps = scenario.steps.len(),
        strict,
        "replaying scenario"
    );
    match scenario.kind {
        ScenarioKind::Rebasing => {
            let token = rebasing_token(&operator)?;
            replay(&token, scenario, &operator, metrics, strict, out)
        }
        ScenarioKind::Vault => {
            let token = vault_token(scenario, &operator)?;
            replay(&token, scenario, &operator, metrics, strict, out)
        }
    }
}

fn replay<T: Target>(
    target: &T,
    scenario: &Scenario,
    operator: &Address,
    metrics: &LedgerMetrics,
    strict: bool,
    out: &mut dyn Write,
) -> Result<Summary> {
    let mut applied = 0;
    let mut rejected = 0;

    for (index, step) in scenario.steps.iter().enumerate() {
        let op = step.name();
        match target.apply(step, operator) {
            Ok(()) => {
                applied += 1;
                metrics.record_applied(op);
                tracing::debug!(index, op, "step applied");
            }
            Err(StepFailure::Unsupported) => {
                bail!(
                    "step {index} ({op}) is not available in a {:?} scenario",
                    scenario.kind
                );
            }
            Err(StepFailure::Rejected(err)) => {
                rejected += 1;
                metrics.record_rejected(op, err.kind());
                tracing::warn!(index, op, kind = err.kind(), error = %err, "step rejected");
                if strict {
                    return Err(anyhow::Error::new(err)
                        .context(format!("step {index} ({op}) rejected in strict mode")));
                }
            }
        }

        for event in target.drain_events() {
            writeln!(out, "{}", event.to_json_line()?)?;
        }
        let (shares, value) = target.totals();
        metrics.set_totals(shares, value);
    }

    let (total_shares, total_value) = target.totals();
    let accounts = scenario
        .account_labels()
        .into_iter()
        .map(|label| {
            let address = account(label);
            let (shares, value) = target.position(&address);
            Position {
                account: label.to_string(),
                address,
                shares,
                value,
            }
        })
        .collect();

    Ok(Summary {
        scenario: scenario.name.clone(),
        kind: scenario.kind,
        applied,
        rejected,
        total_shares,
        total_value,
        accounts,
    })
}
