use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row to insert after a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDocument {
    pub user_id: Uuid,
    /// Submitted text, prefixed with `[Files: ...] ` when files were attached
    pub original_text: String,
    pub simplified_text: String,
    pub summary: String,
    /// Plain text for legacy results, a JSON envelope for structured ones
    pub action_plan: String,
    pub entities: serde_json::Value,
}

/// Stored analysis record. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersistedDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_text: String,
    pub simplified_text: String,
    pub summary: String,
    pub action_plan: String,
    pub entities: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
