//! Postgres-backed document history and credit balance.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::PaginationParams;
use crate::domain::{NewDocument, PersistedDocument};
use crate::error::PipelineError;

use super::DocumentStore;

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn storage_error(e: sqlx::Error) -> PipelineError {
    PipelineError::Persistence(e.to_string())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_document(&self, document: &NewDocument) -> Result<Uuid, PipelineError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO documents (id, user_id, original_text, simplified_text, summary, action_plan, entities)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(document.user_id)
        .bind(&document.original_text)
        .bind(&document.simplified_text)
        .bind(&document.summary)
        .bind(&document.action_plan)
        .bind(&document.entities)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(id)
    }

    async fn decrement_credits(&self, user_id: Uuid) -> Result<(), PipelineError> {
        sqlx::query("SELECT decrement_credits($1)")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn list_documents(
        &self,
        user_id: Uuid,
        page: &PaginationParams,
    ) -> Result<(Vec<PersistedDocument>, u64), PipelineError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;

        let documents = sqlx::query_as::<_, PersistedDocument>(
            r#"
            SELECT id, user_id, original_text, simplified_text, summary, action_plan, entities, created_at
            FROM documents
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok((documents, total.max(0) as u64))
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
