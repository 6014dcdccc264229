//! Per-client vote record.
//!
//! The ledger remembers which items this client has voted for and turns each
//! toggle into a [`VoteDelta`]. It never touches item vote counts itself; the
//! controller applies the returned delta to the catalog.
//!
//! Persistence is best effort. The full record is written to the durable
//! store on every toggle. If the store cannot be opened, read, or written,
//! the ledger drops it and carries on in memory for the rest of the process.

use crate::kv::KeyValueStore;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Well-known key holding the serialized vote record.
pub const VOTES_KEY: &str = "roadmap.votes";

/// The change a single toggle makes to an item's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "i64")]
pub enum VoteDelta {
    Up,
    Down,
}

impl VoteDelta {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// Whether the toggle left the item in the voted state.
    #[must_use]
    pub const fn is_vote(self) -> bool {
        matches!(self, Self::Up)
    }
}

impl From<VoteDelta> for i64 {
    fn from(delta: VoteDelta) -> Self {
        delta.as_i64()
    }
}

impl fmt::Display for VoteDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.as_i64())
    }
}

/// Tracks which items the current client has voted for.
pub struct VoteLedger {
    store: Option<Box<dyn KeyValueStore>>,
    voted: BTreeSet<String>,
}

impl fmt::Debug for VoteLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoteLedger")
            .field("persistent", &self.is_persistent())
            .field("voted", &self.voted)
            .finish()
    }
}

impl Default for VoteLedger {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl VoteLedger {
    /// A ledger with no durable store.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            store: None,
            voted: BTreeSet::new(),
        }
    }

    /// Open a ledger over `store`, reading the persisted record once.
    ///
    /// A read failure degrades to an empty in-memory ledger. A stored value
    /// that does not parse is treated as empty; the next toggle overwrites it.
    pub fn open(store: Box<dyn KeyValueStore>) -> Self {
        match store.get(VOTES_KEY) {
            Ok(raw) => {
                let voted = raw.as_deref().map(decode).unwrap_or_default();
                debug!(count = voted.len(), "loaded vote record");
                Self {
                    store: Some(store),
                    voted,
                }
            }
            Err(err) => {
                warn!(error = %err, "vote store unreadable; votes will not persist this session");
                Self::in_memory()
            }
        }
    }

    /// Flip this client's vote on `item_id`.
    ///
    /// Any id is accepted; the ledger does not consult the catalog. The full
    /// record is written through before returning.
    pub fn toggle(&mut self, item_id: &str) -> VoteDelta {
        let delta = if self.voted.remove(item_id) {
            VoteDelta::Down
        } else {
            self.voted.insert(item_id.to_string());
            VoteDelta::Up
        };
        debug!(item_id, %delta, "toggled vote");
        self.persist();
        delta
    }

    #[must_use]
    pub fn has_voted(&self, item_id: &str) -> bool {
        self.voted.contains(item_id)
    }

    /// Ids this client currently has a vote on, sorted.
    pub fn voted_ids(&self) -> impl Iterator<Item = &str> {
        self.voted.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.voted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voted.is_empty()
    }

    /// Whether votes are still being written to a durable store.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Drop entries for ids not in `known`. Returns how many were removed.
    ///
    /// Writes through only when something changed.
    pub fn prune<'a>(&mut self, known: impl IntoIterator<Item = &'a str>) -> usize {
        let known: BTreeSet<&str> = known.into_iter().collect();
        let before = self.voted.len();
        self.voted.retain(|id| known.contains(id.as_str()));
        let removed = before - self.voted.len();
        if removed > 0 {
            debug!(removed, "pruned stale votes");
            self.persist();
        }
        removed
    }

    fn persist(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };

        let encoded = encode(&self.voted);
        if let Err(err) = store.set(VOTES_KEY, &encoded) {
            warn!(
                error = %err,
                code = %err.code(),
                "vote store write failed; keeping votes in memory for this session"
            );
            self.store = None;
        }
    }
}

fn encode(voted: &BTreeSet<String>) -> String {
    let record: BTreeMap<&str, bool> = voted.iter().map(|id| (id.as_str(), true)).collect();
    serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
}

fn decode(raw: &str) -> BTreeSet<String> {
    match serde_json::from_str::<BTreeMap<String, bool>>(raw) {
        Ok(record) => record
            .into_iter()
            .filter_map(|(id, voted)| voted.then_some(id))
            .collect(),
        Err(err) => {
            warn!(error = %err, "ignoring malformed vote record");
            BTreeSet::new()
        }
    }
}
