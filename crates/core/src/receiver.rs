// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned per-entity ordering for the auto-config feed.
//!
//! Upstream delivery is best-effort: events can arrive duplicated or out of
//! order relative to each other (a delete at version 2 may precede the upsert
//! at version 1 it supersedes). The receiver canonicalises the feed so that
//! dispatch code sees a clean Insert/Update/Delete sequence per id. Deletes
//! seen before any insert leave a tombstone whose version rejects later stale
//! upserts.

use std::collections::HashMap;

/// Canonical outcome of applying one operation to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Delete,
    Noop,
}

/// One tracked entry: a live item, or the tombstone a delete left behind.
#[derive(Debug, Clone)]
enum Entry<T> {
    Live { item: T, version: u64 },
    Tombstone { version: u64 },
}

impl<T> Entry<T> {
    fn version(&self) -> u64 {
        match self {
            Entry::Live { version, .. } | Entry::Tombstone { version } => *version,
        }
    }
}

/// In-memory versioned deduplicator for one entity kind.
///
/// The stored version for an id is always the maximum version ever accepted
/// for it; every operation at or below that version is a [`Action::Noop`].
#[derive(Debug, Default)]
pub struct MessageReceiver<T> {
    entries: HashMap<String, Entry<T>>,
}

impl<T> MessageReceiver<T> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Apply an upsert, returning the canonical action it amounts to.
    ///
    /// A first-seen id inserts; an upsert over a tombstone at a higher
    /// version resurrects (also an insert); otherwise higher versions update.
    pub fn upsert(&mut self, id: &str, item: T, version: u64) -> Action {
        match self.entries.get(id) {
            None => {
                self.entries.insert(id.to_string(), Entry::Live { item, version });
                Action::Insert
            }
            Some(existing) if version <= existing.version() => {
                tracing::debug!(id, version, stored = existing.version(), "stale upsert ignored");
                Action::Noop
            }
            Some(Entry::Tombstone { .. }) => {
                self.entries.insert(id.to_string(), Entry::Live { item, version });
                Action::Insert
            }
            Some(Entry::Live { .. }) => {
                self.entries.insert(id.to_string(), Entry::Live { item, version });
                Action::Update
            }
        }
    }

    /// Apply a delete, returning [`Action::Delete`] only on a live→dead
    /// transition. A delete for an unknown id stores a tombstone so that a
    /// later upsert below its version stays rejected.
    pub fn delete(&mut self, id: &str, version: u64) -> Action {
        match self.entries.get(id) {
            None => {
                self.entries.insert(id.to_string(), Entry::Tombstone { version });
                Action::Noop
            }
            Some(existing) if version <= existing.version() => {
                tracing::debug!(id, version, stored = existing.version(), "stale delete ignored");
                Action::Noop
            }
            Some(Entry::Live { .. }) => {
                self.entries.insert(id.to_string(), Entry::Tombstone { version });
                Action::Delete
            }
            Some(Entry::Tombstone { .. }) => {
                self.entries.insert(id.to_string(), Entry::Tombstone { version });
                Action::Noop
            }
        }
    }

    /// Drop an entry entirely, tombstone included. Returns
    /// [`Action::Delete`] if the entry was live.
    pub fn forget(&mut self, id: &str) -> Action {
        match self.entries.remove(id) {
            Some(Entry::Live { .. }) => Action::Delete,
            _ => Action::Noop,
        }
    }

    /// Forget every id matching the predicate; returns the ids that were
    /// live. Used to reconcile a full snapshot against local state.
    pub fn purge(&mut self, mut pred: impl FnMut(&str) -> bool) -> Vec<String> {
        let matching: Vec<String> =
            self.entries.keys().filter(|id| pred(id)).cloned().collect();
        matching.into_iter().filter(|id| self.forget(id) == Action::Delete).collect()
    }

    /// Forget every id NOT matching the predicate; returns the ids that were
    /// live. `retain(p)` and `purge(!p)` return the same ids.
    pub fn retain(&mut self, mut pred: impl FnMut(&str) -> bool) -> Vec<String> {
        self.purge(|id| !pred(id))
    }

    /// The live item for an id, if any. Tombstoned and unknown ids both
    /// return `None`.
    pub fn get(&self, id: &str) -> Option<&T> {
        match self.entries.get(id) {
            Some(Entry::Live { item, .. }) => Some(item),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "receiver_tests.rs"]
mod tests;
