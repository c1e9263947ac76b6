// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # ShareLedger: Proportional Share Accounting Core
//!
//! Two ledgers, one conversion algorithm family. Both keep a book of
//! **shares** (a fixed accounting unit) next to a single, globally mutable
//! **pooled value**, and both convert between the two with the same
//! rounding-aware primitives:
//!
//! - **Rebasing ledger**: `total_pooled` moves (via `rebase`) while every
//!   account's share count stays put, so every visible balance changes at
//!   once in O(1).
//! - **Vault ledger**: shares are priced against an external asset balance
//!   held by an [`AssetCustody`](custody::AssetCustody) collaborator, with a
//!   virtual offset that makes empty-vault price manipulation unprofitable.
//!
//! ## Architecture
//!
//! - **math**: `mul_div`, rounding direction, virtual offset, `Pool` conversions.
//! - **address**: 20-byte account identifiers.
//! - **book**: per-account share balances and their total.
//! - **rebasing**: the rebasing ledger.
//! - **vault**: the tokenized-vault ledger.
//! - **custody**: the asset-custody seam and an in-memory implementation.
//! - **event**: structured events emitted by every mutating operation.
//! - **error**: the failure taxonomy shared by both ledgers.
//! - **config**: constants and vault configuration.
//!
//! ## Ground Rules
//!
//! 1. All amounts are `u64` in smallest-unit denomination. Products are
//!    widened to `u128` and narrowed back with an explicit overflow check.
//! 2. The ledger always rounds in its own favor. No exceptions, no flags.
//! 3. Validation runs before mutation. A failed call leaves no trace.
//! 4. Ledgers are plain `&mut self` state machines. Locking belongs to the
//!    owner of the ledger (see the `shareledger-tokens` crate).

pub mod address;
pub mod book;
pub mod config;
pub mod custody;
pub mod error;
pub mod event;
pub mod math;
pub mod rebasing;
pub mod vault;

pub use address::Address;
pub use book::ShareBook;
pub use config::VaultConfig;
pub use custody::{AssetCustody, CustodyError, InMemoryCustody};
pub use error::{LedgerError, Result};
pub use event::{EventJournal, LedgerEvent};
pub use math::{mul_div, MathError, Pool, Rounding, VirtualOffset};
pub use rebasing::RebasingLedger;
pub use vault::VaultLedger;
