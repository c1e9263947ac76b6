//! # ShareLedger Tokens
//!
//! The user-facing token layer over the share ledgers in `shareledger-core`.
//! The core crate knows nothing about who may call what; this crate adds the
//! rules a deployed token needs:
//!
//! - **Access control** (`access`): role-gated minting, rebasing, pausing,
//!   and vault administration.
//! - **Allowances** (`allowance`): delegated spending for `transfer_from`
//!   and third-party vault withdrawals.
//! - **Rebasing token** (`rebasing_token`): a thread-safe wrapper over
//!   [`RebasingLedger`](shareledger_core::RebasingLedger).
//! - **Vault token** (`vault_token`): a thread-safe wrapper over
//!   [`VaultLedger`](shareledger_core::VaultLedger).
//!
//! Each token keeps its ledger, allowances and role table behind a single
//! `parking_lot::RwLock`, so a call observes and mutates one consistent
//! state. Reads take the shared guard.

pub mod access;
pub mod allowance;
pub mod error;
pub mod rebasing_token;
pub mod vault_token;

pub use access::{AccessControl, AccessError, Role};
pub use allowance::{AllowanceError, Allowances};
pub use error::{Result, TokenError};
pub use rebasing_token::{RebasingToken, TokenMetadata};
pub use vault_token::VaultToken;
