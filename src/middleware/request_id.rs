//! Request ID middleware for request tracing

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderName},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::error::ErrorResponse;

/// Header name for request ID
pub const X_REQUEST_ID: &str = "x-request-id";

/// Creates a layered middleware that:
/// 1. Sets a request ID if not present (using UUID v4)
/// 2. Propagates the request ID to the response
pub fn request_id_layer() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    let header_name = HeaderName::from_static(X_REQUEST_ID);

    (
        SetRequestIdLayer::new(header_name.clone(), MakeRequestUuid),
        PropagateRequestIdLayer::new(header_name),
    )
}

/// Extension trait for extracting request ID from headers
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl RequestIdExt for axum::http::HeaderMap {
    fn request_id(&self) -> Option<&str> {
        self.get(X_REQUEST_ID)?.to_str().ok()
    }
}

/// Copy the request ID into JSON error bodies rendered from [`ErrorResponse`].
///
/// Must sit inside the layer that assigns request IDs.
pub async fn stamp_error_request_id(request: Request, next: Next) -> Response {
    let request_id = request.headers().request_id().map(str::to_string);
    let response = next.run(request).await;

    let Some(request_id) = request_id else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let Some(mut error) = parts.extensions.remove::<ErrorResponse>() else {
        return Response::from_parts(parts, body);
    };

    error.request_id = Some(request_id);
    match serde_json::to_vec(&error) {
        Ok(bytes) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not re-encode error body");
            Response::from_parts(parts, body)
        }
    }
}
