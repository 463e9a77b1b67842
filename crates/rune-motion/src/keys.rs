//! Key reconciliation across successive renders.
//!
//! [`diff`] classifies every key of the previous pass and the next desired
//! list as added, kept or removed, preserving the position of removed keys so
//! they can keep exiting in place.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::types::Key;

/// Classification of a key in one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    Add,
    Keep,
    Remove,
    /// Finished exiting; dropped by the next pass.
    Removed,
}

impl KeyStatus {
    /// Whether elements with this status should be shown.
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Add | Self::Keep)
    }
}

/// A key with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub key: Key,
    pub status: KeyStatus,
}

impl KeyEntry {
    pub fn new(key: impl Into<Key>, status: KeyStatus) -> Self {
        Self {
            key: key.into(),
            status,
        }
    }
}

/// First key that occurs more than once in `keys`.
pub fn find_duplicate(keys: &[Key]) -> Option<&Key> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter().find(|key| !seen.insert(*key))
}

/// Reconcile `previous` against the `next` key order.
///
/// Keys of `next` must be unique. A key that ends up both removed and present
/// (removed then re-added within one update) is merged into a single `Keep`.
pub fn diff(previous: &[KeyEntry], next: &[Key]) -> Vec<KeyEntry> {
    let mut entries = Vec::with_capacity(previous.len() + next.len());
    let mut cursor = 0;

    for prev in previous {
        match next[cursor..].iter().position(|key| *key == prev.key) {
            Some(offset) => {
                let hit = cursor + offset;
                entries.extend(
                    next[cursor..hit]
                        .iter()
                        .map(|key| KeyEntry::new(key.clone(), KeyStatus::Add)),
                );
                entries.push(KeyEntry::new(next[hit].clone(), KeyStatus::Keep));
                cursor = hit + 1;
            }
            None => entries.push(KeyEntry::new(prev.key.clone(), KeyStatus::Remove)),
        }
    }

    entries.extend(
        next[cursor..]
            .iter()
            .map(|key| KeyEntry::new(key.clone(), KeyStatus::Add)),
    );

    merge_duplicates(entries)
}

// [a:add, b:keep, a:remove] -> [a:keep, b:keep]
fn merge_duplicates(mut entries: Vec<KeyEntry>) -> Vec<KeyEntry> {
    let mut counts: HashMap<Key, usize> = HashMap::new();
    for entry in &entries {
        *counts.entry(entry.key.clone()).or_default() += 1;
    }
    if counts.values().all(|count| *count == 1) {
        return entries;
    }

    let duplicated = |key: &Key| counts.get(key).is_some_and(|count| *count > 1);
    entries.retain(|entry| !(duplicated(&entry.key) && entry.status == KeyStatus::Remove));
    for entry in entries.iter_mut() {
        if duplicated(&entry.key) {
            entry.status = KeyStatus::Keep;
        }
    }
    entries
}
