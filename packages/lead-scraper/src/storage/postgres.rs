//! Postgres lead store.
//!
//! The unique index on `identity_key` plus `ON CONFLICT DO NOTHING`
//! makes the insert conditional at the storage level, backstopping
//! the gate's in-process serialization.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::{StorageError, StorageResult};
use crate::traits::LeadStore;
use crate::types::{LeadStatus, NewLead, QualifiedLead};

pub struct PostgresLeadStore {
    pool: PgPool,
}

impl PostgresLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn lead_from_row(row: &sqlx::postgres::PgRow) -> QualifiedLead {
    let status: String = row.get("status");
    QualifiedLead {
        id: row.get("id"),
        name: row.get("name"),
        phone_hash: row.get("phone_hash"),
        address: row.get("address"),
        source: row.get("source"),
        keywords: row.get("keywords"),
        status: LeadStatus::parse(&status).unwrap_or(LeadStatus::Uncontacted),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl LeadStore for PostgresLeadStore {
    async fn find_duplicate(&self, identity_key: &str) -> StorageResult<Option<QualifiedLead>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, phone_hash, address, source, keywords, status,
                   created_at, updated_at
            FROM leads
            WHERE identity_key = $1
            "#,
        )
        .bind(identity_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from_source)?;

        Ok(row.map(|r| lead_from_row(&r)))
    }

    async fn insert_if_absent(&self, lead: NewLead) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO leads (
                id, name, phone_hash, address, source, keywords, status,
                identity_key, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            ON CONFLICT (identity_key) DO NOTHING
            "#,
        )
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.phone_hash)
        .bind(&lead.address)
        .bind(&lead.source)
        .bind(&lead.keywords)
        .bind(lead.status.as_str())
        .bind(&lead.identity_key)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from_source)?;

        Ok(result.rows_affected() == 1)
    }
}
