use axum::extract::{Query, State};
use std::sync::Arc;

use crate::api::{Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::PersistedDocument;
use crate::error::ApiResult;

/// The caller's analysis history, newest first.
///
/// GET /documents
pub async fn list_documents(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Paginated<PersistedDocument>> {
    tracing::debug!(
        user_id = %auth.user_id,
        page = pagination.page(),
        per_page = pagination.per_page(),
        "Listing documents"
    );

    let (documents, total) = state
        .services
        .store
        .list_documents(auth.user_id, &pagination)
        .await?;

    Ok(Paginated::new(documents, &pagination, total))
}
