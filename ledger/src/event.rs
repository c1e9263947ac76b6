//! # Ledger Events
//!
//! Every mutating ledger operation records one [`LedgerEvent`] carrying both
//! the nominal value and the shares that moved, so indexers and reporting
//! can reconcile balances without redoing any conversion. Events collect in
//! an [`EventJournal`] owned by the ledger until the caller drains them.
//!
//! The journal is bounded. Once it holds [`MAX_PENDING_EVENTS`] undrained
//! events, each new event evicts the oldest one and the eviction is counted
//! and logged. Every event is also emitted through `tracing` when recorded,
//! so a subscriber sees the full stream whether or not anyone drains.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::MAX_PENDING_EVENTS;

/// A structured record of one state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Rebasing ledger: new shares credited against new pooled value.
    Minted {
        to: Address,
        value: u64,
        shares: u64,
    },

    /// Rebasing ledger: shares destroyed together with pooled value.
    Burned {
        from: Address,
        value: u64,
        shares: u64,
    },

    /// Shares moved between accounts. `value` is the nominal amount at the
    /// moment of the transfer.
    Transferred {
        from: Address,
        to: Address,
        value: u64,
        shares: u64,
    },

    /// Rebasing ledger: pooled value replaced, shares untouched.
    Rebased {
        old_total_pooled: u64,
        new_total_pooled: u64,
        total_shares: u64,
    },

    /// Rebasing ledger: the last shares were burned and leftover pooled
    /// value was written off so the next mint starts at 1:1 again.
    SupplyReset { swept_value: u64 },

    /// Vault ledger: assets in, shares issued.
    Deposited {
        caller: Address,
        receiver: Address,
        assets: u64,
        shares: u64,
    },

    /// Vault ledger: shares burned, assets out.
    Withdrawn {
        caller: Address,
        receiver: Address,
        owner: Address,
        assets: u64,
        shares: u64,
    },
}

impl LedgerEvent {
    /// Short name of the event, matching its serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Minted { .. } => "minted",
            LedgerEvent::Burned { .. } => "burned",
            LedgerEvent::Transferred { .. } => "transferred",
            LedgerEvent::Rebased { .. } => "rebased",
            LedgerEvent::SupplyReset { .. } => "supply_reset",
            LedgerEvent::Deposited { .. } => "deposited",
            LedgerEvent::Withdrawn { .. } => "withdrawn",
        }
    }

    /// Serializes the event as a single JSON line.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Bounded buffer of events awaiting collection.
#[derive(Debug, Clone)]
pub struct EventJournal {
    pending: VecDeque<LedgerEvent>,
    capacity: usize,
    dropped: u64,
}

impl Default for EventJournal {
    fn default() -> Self {
        Self::with_capacity(MAX_PENDING_EVENTS)
    }
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A journal holding at most `capacity` events (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Appends an event and logs it, evicting the oldest pending event if
    /// the journal is full.
    pub fn record(&mut self, event: LedgerEvent) {
        tracing::info!(event = event.name(), detail = ?event, "ledger event");
        if self.pending.len() == self.capacity {
            if let Some(evicted) = self.pending.pop_front() {
                self.dropped += 1;
                tracing::warn!(
                    evicted = evicted.name(),
                    dropped = self.dropped,
                    capacity = self.capacity,
                    "event journal full, dropping oldest event"
                );
            }
        }
        self.pending.push_back(event);
    }

    /// Removes and returns all pending events, oldest first.
    pub fn drain(&mut self) -> Vec<LedgerEvent> {
        self.pending.drain(..).collect()
    }

    /// Pending events, oldest first.
    pub fn pending(&self) -> &VecDeque<LedgerEvent> {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events evicted unread since the journal was created.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_drains_in_order() {
        let alice = Address::from_label("alice");
        let mut journal = EventJournal::new();
        journal.record(LedgerEvent::Minted {
            to: alice,
            value: 10,
            shares: 10,
        });
        journal.record(LedgerEvent::Rebased {
            old_total_pooled: 10,
            new_total_pooled: 20,
            total_shares: 10,
        });
        assert_eq!(journal.len(), 2);

        let drained = journal.drain();
        assert_eq!(drained[0].name(), "minted");
        assert_eq!(drained[1].name(), "rebased");
        assert!(journal.is_empty());
    }

    #[test]
    fn full_journal_evicts_oldest() {
        let alice = Address::from_label("alice");
        let mut journal = EventJournal::with_capacity(2);
        for value in 1..=3 {
            journal.record(LedgerEvent::Minted {
                to: alice,
                value,
                shares: value,
            });
        }
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.dropped(), 1);

        let values: Vec<u64> = journal
            .drain()
            .into_iter()
            .map(|event| match event {
                LedgerEvent::Minted { value, .. } => value,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![2, 3]);
        assert_eq!(journal.dropped(), 1);
    }

    #[test]
    fn default_capacity_is_bounded() {
        let journal = EventJournal::new();
        assert_eq!(journal.capacity(), MAX_PENDING_EVENTS);
        assert_eq!(EventJournal::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn json_line_carries_tag_value_and_shares() {
        let event = LedgerEvent::Transferred {
            from: Address::from_label("a"),
            to: Address::from_label("b"),
            value: 100_000,
            shares: 90_909,
        };
        let line = event.to_json_line().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "transferred");
        assert_eq!(parsed["value"], 100_000);
        assert_eq!(parsed["shares"], 90_909);
        assert!(!line.contains('\n'));
    }
}
