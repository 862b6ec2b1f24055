/*
 * Responsibility
 * - Read-only access to registered callers (api_users table)
 * - Exact (client_id, product_id) match; no partial or case-folded lookups
 * - Errors are RepoError; the gate decides what they mean for the request
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CallerIdentityRecord {
    pub id: Uuid,
    pub client_id: String,
    pub product_id: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-identity lookup used by the gate.
///
/// Implementations are shared across all in-flight requests and must be safe
/// to call concurrently. `Ok(None)` means "no such caller"; `Err` means the
/// store could not answer.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn find_by_client_id_and_product_id(
        &self,
        client_id: &str,
        product_id: &str,
    ) -> Result<Option<CallerIdentityRecord>, RepoError>;
}

#[derive(Clone, Debug)]
pub struct PgIdentityRepo {
    pool: PgPool,
}

impl PgIdentityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityLookup for PgIdentityRepo {
    async fn find_by_client_id_and_product_id(
        &self,
        client_id: &str,
        product_id: &str,
    ) -> Result<Option<CallerIdentityRecord>, RepoError> {
        let row = sqlx::query_as::<_, CallerIdentityRecord>(
            r#"
            SELECT id, client_id, product_id, created_at
            FROM api_users
            WHERE client_id = $1 AND product_id = $2
            LIMIT 1
            "#,
        )
        .bind(client_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
