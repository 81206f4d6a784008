//! Append-only transparency ledger and periodic Merkle anchors over it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::merkle::merkle_root;
use crate::store::KvStore;

const LEDGER_PREFIX: &str = "ledger:";
const ANCHOR_PREFIX: &str = "ledger_anchor:";
const EXT_ANCHOR_PREFIX: &str = "ledger_ext_anchor:ot:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub hash: String,
    #[serde(default)]
    pub meta: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anchor {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalAnchor {
    pub root: String,
    pub ts: DateTime<Utc>,
}

/// Analytical-only summary of how far the ledger has drifted from its most
/// recent anchor; never consulted by `/verify`.
#[derive(Debug, Clone, Serialize)]
pub struct AnchorDrift {
    pub ledger_len: usize,
    pub last_anchor_covered: usize,
    pub unanchored: usize,
}

fn ledger_key(ts: &DateTime<Utc>, id: &Uuid) -> String {
    format!("{LEDGER_PREFIX}{}:{id}", ts.to_rfc3339())
}

fn anchor_key(ts: &DateTime<Utc>, id: &Uuid) -> String {
    format!("{ANCHOR_PREFIX}{}:{id}", ts.to_rfc3339())
}

pub struct Ledger {
    store: Arc<dyn KvStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Writes a new entry under `ledger:<ts>:<id>`. Entries are never
    /// updated or deleted by append/list operations — only `purge_older_than`
    /// removes rows, and only once they are past retention.
    pub fn append(&self, entry_type: String, hash: String, meta: Value) -> LedgerEntry {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            ts: Utc::now(),
            entry_type,
            hash,
            meta,
        };
        let key = ledger_key(&entry.ts, &entry.id);
        let value = serde_json::to_string(&entry).expect("LedgerEntry serializes");
        self.store.put(key, value);
        entry
    }

    /// Prefix-scans `ledger:`; key ordering is lexicographic RFC3339, which
    /// sorts chronologically.
    pub fn list(&self) -> Vec<LedgerEntry> {
        self.store
            .scan_prefix(LEDGER_PREFIX)
            .into_iter()
            .filter_map(|(_, v)| serde_json::from_str(&v).ok())
            .collect()
    }

    /// Computes a root over every current entry's `hash` field, in ledger
    /// order, and persists it under `ledger_anchor:<ts>:<id>`.
    pub fn anchor_internal(&self) -> Anchor {
        let hashes: Vec<String> = self.list().into_iter().map(|e| e.hash).collect();
        let root = merkle_root(&hashes);
        let anchor = Anchor {
            id: Uuid::new_v4(),
            ts: Utc::now(),
            root,
        };
        let key = anchor_key(&anchor.ts, &anchor.id);
        let value = serde_json::to_string(&anchor).expect("Anchor serializes");
        self.store.put(key, value);
        anchor
    }

    pub fn list_anchors(&self) -> Vec<Anchor> {
        self.store
            .scan_prefix(ANCHOR_PREFIX)
            .into_iter()
            .filter_map(|(_, v)| serde_json::from_str(&v).ok())
            .collect()
    }

    /// Same root computation as `anchor_internal`, but records intent to
    /// forward to an off-system notary rather than anchoring in-process
    /// history. Nothing is transported; the caller does that out of band.
    pub fn anchor_external(&self) -> Uuid {
        let hashes: Vec<String> = self.list().into_iter().map(|e| e.hash).collect();
        let root = merkle_root(&hashes);
        let id = Uuid::new_v4();
        let payload = ExternalAnchor { root, ts: Utc::now() };
        let key = format!("{EXT_ANCHOR_PREFIX}{id}");
        let value = serde_json::to_string(&payload).expect("ExternalAnchor serializes");
        self.store.put(key, value);
        id
    }

    pub fn list_external_anchors(&self) -> Vec<(Uuid, ExternalAnchor)> {
        self.store
            .scan_prefix(EXT_ANCHOR_PREFIX)
            .into_iter()
            .filter_map(|(k, v)| {
                let id = k.rsplit(':').next()?.parse().ok()?;
                let ext = serde_json::from_str(&v).ok()?;
                Some((id, ext))
            })
            .collect()
    }

    /// Analytical report of how many ledger entries postdate the most
    /// recent anchor. Never gates verification.
    pub fn drift(&self) -> AnchorDrift {
        let entries = self.list();
        let ledger_len = entries.len();
        let last_anchor_covered = match self.list_anchors().into_iter().max_by_key(|a| a.ts) {
            Some(anchor) => entries.iter().filter(|e| e.ts <= anchor.ts).count(),
            None => 0,
        };
        AnchorDrift {
            ledger_len,
            last_anchor_covered,
            unanchored: ledger_len.saturating_sub(last_anchor_covered),
        }
    }

    /// Deletes ledger and internal-anchor rows older than `cutoff`.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for (key, value) in self.store.scan_prefix(LEDGER_PREFIX) {
            if let Ok(entry) = serde_json::from_str::<LedgerEntry>(&value) {
                if entry.ts < cutoff {
                    self.store.delete(&key);
                    removed += 1;
                }
            }
        }
        for (key, value) in self.store.scan_prefix(ANCHOR_PREFIX) {
            if let Ok(anchor) = serde_json::from_str::<Anchor>(&value) {
                if anchor.ts < cutoff {
                    self.store.delete(&key);
                    removed += 1;
                }
            }
        }
        removed
    }
}
