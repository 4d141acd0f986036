//! Dedup & persistence gate: the only write path into the lead store
//! from the scraping core.
//!
//! The identity check-then-insert is a critical section. Commits are
//! serialized per identity key with a keyed mutex so two sessions
//! racing on the same physical lead cannot both insert; the store's
//! conditional insert is the backstop.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::traits::LeadStore;
use crate::types::{hash_phone, LeadIdentity, LeadStatus, NewLead, QualifiedLead, RawRecord};

/// Result of pushing one qualified record through the gate.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// The record was new; here is the stored lead.
    Inserted(QualifiedLead),
    /// A lead with the same identity already exists; nothing written.
    Duplicate,
}

pub struct DedupGate<S> {
    store: S,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: LeadStore> DedupGate<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Commit a qualified record: hash the phone, check identity,
    /// insert exactly once. Idempotent across repeated commits of the
    /// same physical lead.
    pub async fn commit(&self, record: &RawRecord, keyword: &str) -> StorageResult<CommitOutcome> {
        let identity = LeadIdentity::of(record);
        let key = identity.as_key();

        let lock = self.identity_lock(&key).await;
        let _guard = lock.lock().await;

        if self.store.find_duplicate(&key).await?.is_some() {
            tracing::debug!(identity_key = %key, "duplicate lead skipped");
            return Ok(CommitOutcome::Duplicate);
        }

        let now = Utc::now();
        let lead = QualifiedLead {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            // Raw phone numbers never reach the store.
            phone_hash: record.has_phone().then(|| hash_phone(&record.phone)),
            address: record.address.clone(),
            source: record.source_url.clone(),
            keywords: vec![keyword.to_string()],
            status: LeadStatus::Uncontacted,
            created_at: now,
            updated_at: now,
        };

        let inserted = self
            .store
            .insert_if_absent(NewLead {
                id: lead.id,
                name: lead.name.clone(),
                phone_hash: lead.phone_hash.clone(),
                address: lead.address.clone(),
                source: lead.source.clone(),
                keywords: lead.keywords.clone(),
                status: lead.status,
                identity_key: key.clone(),
            })
            .await?;

        if inserted {
            tracing::info!(lead_id = %lead.id, identity_key = %key, "lead committed");
            Ok(CommitOutcome::Inserted(lead))
        } else {
            // Lost the race to a concurrent process; the conditional
            // insert kept the invariant.
            Ok(CommitOutcome::Duplicate)
        }
    }

    async fn identity_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLeadStore;
    use crate::types::MISSING_PHONE;
    use std::sync::Arc as StdArc;

    fn record(name: &str, phone: &str) -> RawRecord {
        RawRecord {
            name: name.to_string(),
            phone: phone.to_string(),
            address: "12 Rue de la Paix, Paris".to_string(),
            source_url: "https://example.com/recherche?page=1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_commit_inserts_once() {
        let gate = DedupGate::new(MemoryLeadStore::new());
        let rec = record("Acme", "0123456789");

        let first = gate.commit(&rec, "energie").await.unwrap();
        assert!(matches!(first, CommitOutcome::Inserted(_)));

        let second = gate.commit(&rec, "energie").await.unwrap();
        assert!(matches!(second, CommitOutcome::Duplicate));
    }

    #[tokio::test]
    async fn test_raw_phone_never_stored() {
        let gate = DedupGate::new(MemoryLeadStore::new());
        let rec = record("Acme", "01 23 45 67 89");

        let CommitOutcome::Inserted(lead) = gate.commit(&rec, "energie").await.unwrap() else {
            panic!("expected insert");
        };

        let hash = lead.phone_hash.unwrap();
        assert_ne!(hash, "01 23 45 67 89");
        assert_eq!(hash.len(), 64);
    }

    #[tokio::test]
    async fn test_no_phone_uses_name_address_identity() {
        let gate = DedupGate::new(MemoryLeadStore::new());

        let first = gate
            .commit(&record("Acme", MISSING_PHONE), "energie")
            .await
            .unwrap();
        assert!(matches!(first, CommitOutcome::Inserted(_)));

        // Same name and address, still no phone: duplicate.
        let second = gate
            .commit(&record("ACME", MISSING_PHONE), "energie")
            .await
            .unwrap();
        assert!(matches!(second, CommitOutcome::Duplicate));
    }

    #[tokio::test]
    async fn test_concurrent_commits_insert_exactly_once() {
        let gate = StdArc::new(DedupGate::new(MemoryLeadStore::new()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.commit(&record("Acme", "0123456789"), "energie").await
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if let CommitOutcome::Inserted(_) = handle.await.unwrap().unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
    }
}
