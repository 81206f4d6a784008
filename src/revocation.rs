//! Output-ID keyed revocation set consulted first during verification.
//!
//! Revocation is authoritative and one-directional: a record is never
//! deleted by `/revoke`, only aged out by `/jobs/purge`. A cryptographically
//! valid receipt for a revoked output is still reported invalid.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::KvStore;

const REVOCATION_PREFIX: &str = "revocation:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub output_id: String,
    pub revoked_at: DateTime<Utc>,
    pub reason: String,
}

fn revocation_key(output_id: &str) -> String {
    format!("{REVOCATION_PREFIX}{output_id}")
}

pub struct RevocationStore {
    store: Arc<dyn KvStore>,
}

impl RevocationStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn revoke(&self, output_id: String, reason: String) -> RevocationRecord {
        let record = RevocationRecord {
            output_id: output_id.clone(),
            revoked_at: Utc::now(),
            reason,
        };
        let value = serde_json::to_string(&record).expect("RevocationRecord serializes");
        self.store.put(revocation_key(&output_id), value);
        record
    }

    pub fn is_revoked(&self, output_id: &str) -> Option<RevocationRecord> {
        self.store
            .get(&revocation_key(output_id))
            .and_then(|v| serde_json::from_str(&v).ok())
    }

    /// Deletes revocation rows whose `revoked_at` predates `cutoff`.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for (key, value) in self.store.scan_prefix(REVOCATION_PREFIX) {
            if let Ok(record) = serde_json::from_str::<RevocationRecord>(&value) {
                if record.revoked_at < cutoff {
                    self.store.delete(&key);
                    removed += 1;
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use chrono::Duration;

    fn store() -> RevocationStore {
        RevocationStore::new(Arc::new(MemStore::new()))
    }

    #[test]
    fn unrevoked_output_is_none() {
        let rs = store();
        assert!(rs.is_revoked("o1").is_none());
    }

    #[test]
    fn revoke_then_is_revoked_returns_the_record() {
        let rs = store();
        rs.revoke("o1".into(), "test".into());
        let record = rs.is_revoked("o1").unwrap();
        assert_eq!(record.output_id, "o1");
        assert_eq!(record.reason, "test");
    }

    #[test]
    fn revocation_is_never_removed_by_revoke_itself() {
        let rs = store();
        rs.revoke("o1".into(), "first".into());
        rs.revoke("o1".into(), "second".into());
        assert!(rs.is_revoked("o1").is_some());
    }

    #[test]
    fn purge_removes_only_aged_out_revocations() {
        let rs = store();
        rs.revoke("o1".into(), "test".into());

        let future_cutoff = Utc::now() + Duration::days(1);
        assert_eq!(rs.purge_older_than(future_cutoff), 1);
        assert!(rs.is_revoked("o1").is_none());
    }
}
