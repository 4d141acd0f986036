//! In-memory lead store for tests and local development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::traits::LeadStore;
use crate::types::{NewLead, QualifiedLead};

/// HashMap-backed store keyed by identity key. Mirrors the Postgres
/// store's conditional-insert semantics.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<HashMap<String, QualifiedLead>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored leads.
    pub fn len(&self) -> usize {
        self.leads.read().map(|leads| leads.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all stored leads, for assertions.
    pub fn all(&self) -> Vec<QualifiedLead> {
        self.leads
            .read()
            .map(|leads| leads.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn find_duplicate(&self, identity_key: &str) -> StorageResult<Option<QualifiedLead>> {
        let leads = self
            .leads
            .read()
            .map_err(|e| StorageError::Operation(e.to_string().into()))?;
        Ok(leads.get(identity_key).cloned())
    }

    async fn insert_if_absent(&self, lead: NewLead) -> StorageResult<bool> {
        let mut leads = self
            .leads
            .write()
            .map_err(|e| StorageError::Operation(e.to_string().into()))?;

        if leads.contains_key(&lead.identity_key) {
            return Ok(false);
        }

        let now = Utc::now();
        leads.insert(
            lead.identity_key.clone(),
            QualifiedLead {
                id: lead.id,
                name: lead.name,
                phone_hash: lead.phone_hash,
                address: lead.address,
                source: lead.source,
                keywords: lead.keywords,
                status: lead.status,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LeadStatus;
    use uuid::Uuid;

    fn new_lead(key: &str) -> NewLead {
        NewLead {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            phone_hash: Some("abc123".to_string()),
            address: "Paris".to_string(),
            source: "https://example.com".to_string(),
            keywords: vec!["energie".to_string()],
            status: LeadStatus::Uncontacted,
            identity_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryLeadStore::new();
        assert!(store.insert_if_absent(new_lead("k1")).await.unwrap());
        assert!(store.find_duplicate("k1").await.unwrap().is_some());
        assert!(store.find_duplicate("k2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conditional_insert_refuses_duplicates() {
        let store = MemoryLeadStore::new();
        assert!(store.insert_if_absent(new_lead("k1")).await.unwrap());
        assert!(!store.insert_if_absent(new_lead("k1")).await.unwrap());
        assert_eq!(store.len(), 1);
    }
}
