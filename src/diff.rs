//! Keyed snapshots of a table and the deltas between two of them.
//!
//! Each shaped record is fingerprinted with BLAKE3 over its canonical JSON
//! (keys sorted), so "modified" means the exported form changed, not just
//! the raw bytes.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

use crate::export::{Exporter, SlotLayout};
use crate::record::Record;

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    fingerprint: [u8; 32],
    shaped:      Map<String, Json>,
}

/// Shaped records keyed by identity value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: BTreeMap<String, Entry>,
}

impl Snapshot {
    pub fn build(exporter: &Exporter, layout: &SlotLayout, records: &[Record]) -> Self {
        let mut entries = BTreeMap::new();
        for (key, shaped) in exporter.keyed(layout, records) {
            let fingerprint = fingerprint(&shaped);
            if entries.insert(key.clone(), Entry { fingerprint, shaped }).is_some() {
                warn!("duplicate identity {key:?} in snapshot, later row wins");
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Map<String, Json>> {
        self.entries.get(key).map(|e| &e.shaped)
    }

    pub fn fingerprint_hex(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|e| hex::encode(e.fingerprint))
    }

    /// Changes that turn `old` into `self`.
    pub fn diff(&self, old: &Snapshot) -> ChangeSet {
        let mut set = ChangeSet {
            generated_at: Utc::now(),
            added:        Vec::new(),
            modified:     Vec::new(),
            deleted:      Vec::new(),
        };
        for (key, entry) in &self.entries {
            match old.entries.get(key) {
                None => set.added.push(Change { key: key.clone(), record: entry.shaped.clone() }),
                Some(prev) if prev.fingerprint != entry.fingerprint => {
                    set.modified.push(Change { key: key.clone(), record: entry.shaped.clone() })
                }
                Some(_) => {}
            }
        }
        set.deleted = old
            .entries
            .keys()
            .filter(|k| !self.entries.contains_key(*k))
            .cloned()
            .collect();
        info!(
            "diff: {} added, {} modified, {} deleted",
            set.added.len(),
            set.modified.len(),
            set.deleted.len()
        );
        set
    }
}

fn fingerprint(shaped: &Map<String, Json>) -> [u8; 32] {
    // serde_json::Map keeps keys sorted, so this is canonical.
    let bytes = serde_json::to_vec(shaped).expect("a JSON map with string keys always serializes");
    blake3::hash(&bytes).into()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub key:    String,
    pub record: Map<String, Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSet {
    pub generated_at: DateTime<Utc>,
    pub added:        Vec<Change>,
    pub modified:     Vec<Change>,
    pub deleted:      Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}
