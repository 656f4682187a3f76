//! Service layer: the external collaborators of the pipeline.
//!
//! Each collaborator sits behind a trait so the pipeline can be driven with
//! in-memory implementations in tests. Production implementations are the
//! AI service client, the Postgres document store and the Redis result cache.

pub mod ai_client;
pub mod cache;
pub mod document_store;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::api::PaginationParams;
use crate::domain::{DraftRequest, DraftResponse, ModelTier, NewDocument, PersistedDocument, TransportFile};
use crate::error::PipelineError;

pub use ai_client::AiClient;
pub use cache::RedisCache;
pub use document_store::PgDocumentStore;

/// Body of one simplify call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimplifyPayload {
    /// Text-only requests go out as a small JSON body
    Json {
        text: String,
        model: ModelTier,
        no_cache: bool,
    },
    /// Any request with files goes out as multipart
    Multipart {
        files: Vec<TransportFile>,
        text: Option<String>,
        model: ModelTier,
        no_cache: bool,
    },
}

impl SimplifyPayload {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart { .. })
    }
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Returns the raw response; its schema is resolved by the reconciler.
    async fn simplify(
        &self,
        payload: SimplifyPayload,
        request_id: Option<&str>,
    ) -> Result<Value, PipelineError>;

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait DraftingService: Send + Sync {
    async fn draft(
        &self,
        request: &DraftRequest,
        request_id: Option<&str>,
    ) -> Result<DraftResponse, PipelineError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, document: &NewDocument) -> Result<Uuid, PipelineError>;

    /// Atomically take one credit from the user.
    async fn decrement_credits(&self, user_id: Uuid) -> Result<(), PipelineError>;

    /// A page of the user's documents, newest first, and the total count.
    async fn list_documents(
        &self,
        user_id: Uuid,
        page: &PaginationParams,
    ) -> Result<(Vec<PersistedDocument>, u64), PipelineError>;

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Cache of raw analysis responses. Failures are never fatal.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Option<Value>;

    async fn put_raw(&self, key: &str, value: &Value);

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
