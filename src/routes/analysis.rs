//! Analysis and drafting endpoints.
//!
//! - `POST /analyze`: JSON body, files as base64 captures
//! - `POST /analyze/upload`: multipart, binary uploads and captures mixed
//! - `POST /draft`: reply document for a finished analysis
//!
//! Anonymous callers are accepted; a presented token must be valid.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::auth::MaybeAuth;
use crate::domain::{
    AnalysisRequest, CapturedFile, DraftApiRequest, DraftApiResponse, FileHandle, ModelTier,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestIdExt;
use crate::pipeline::Caller;

/// Body of `POST /analyze`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub files: Vec<CapturedFile>,
    #[serde(default)]
    pub model: ModelTier,
    #[serde(default)]
    pub no_cache: Option<bool>,
}

impl From<AnalyzeRequest> for AnalysisRequest {
    fn from(req: AnalyzeRequest) -> Self {
        Self {
            text: req.text,
            files: req.files.into_iter().map(FileHandle::from).collect(),
            model: req.model,
            no_cache: req.no_cache,
        }
    }
}

/// Whether the request was made from a loopback origin. `Origin` wins over
/// `Host` when both are present.
pub fn is_loopback_origin(headers: &HeaderMap) -> bool {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && *v != "null")
        .map(str::to_string);

    let candidate = origin.or_else(|| {
        headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|host| format!("http://{host}"))
    });

    let Some(candidate) = candidate else {
        return false;
    };

    match url::Url::parse(&candidate).ok().as_ref().and_then(url::Url::host) {
        Some(url::Host::Domain(domain)) => {
            domain.eq_ignore_ascii_case("localhost") || domain.to_ascii_lowercase().ends_with(".localhost")
        }
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

async fn run_analysis(
    state: &AppState,
    auth: &MaybeAuth,
    headers: &HeaderMap,
    request: AnalysisRequest,
) -> Response {
    let caller = Caller {
        user_id: auth.user_id(),
        loopback: is_loopback_origin(headers),
    };

    let run = state
        .orchestrator
        .analyze(request, caller, headers.request_id())
        .await;

    tracing::info!(
        user_id = ?caller.user_id,
        state = ?run.final_state(),
        steps = run.trace.len(),
        "Analysis finished"
    );

    let response = run.outcome.into_response();

    // Storage happens after the result is ready for the client
    if let Some(job) = run.persist {
        tokio::spawn(async move {
            let report = job.run().await;
            if !report.is_clean() {
                tracing::warn!(
                    document_id = ?report.document_id,
                    warnings = report.warnings.len(),
                    "Analysis persisted with warnings"
                );
            }
        });
    }

    response
}

/// Analyze pasted text and base64 captures.
///
/// POST /analyze
pub async fn analyze(
    auth: MaybeAuth,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeRequest>,
) -> Response {
    run_analysis(&state, &auth, &headers, body.into()).await
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {e}"))
}

/// Analyze uploaded files, optionally mixed with captures and text.
///
/// POST /analyze/upload
pub async fn analyze_upload(
    auth: MaybeAuth,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut request = AnalysisRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "files" | "file" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                request.files.push(FileHandle::Binary {
                    name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "text" => {
                request.text = Some(field.text().await.map_err(multipart_error)?);
            }
            "model" => {
                let raw = field.text().await.map_err(multipart_error)?;
                request.model = raw.parse().map_err(ApiError::BadRequest)?;
            }
            "noCache" => {
                let raw = field.text().await.map_err(multipart_error)?;
                request.no_cache = Some(matches!(raw.trim(), "true" | "1"));
            }
            "captured" => {
                let raw = field.text().await.map_err(multipart_error)?;
                let captured: Vec<CapturedFile> = serde_json::from_str(&raw)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid captured files: {e}")))?;
                request.files.extend(captured.into_iter().map(FileHandle::from));
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(run_analysis(&state, &auth, &headers, request).await)
}

/// Draft a reply document from an analysis.
///
/// POST /draft
pub async fn draft(
    auth: MaybeAuth,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<DraftApiRequest>,
) -> ApiResult<Json<DraftApiResponse>> {
    tracing::info!(
        user_id = ?auth.user_id(),
        document_type = %body.analysis.document_type,
        "Draft requested"
    );

    let (draft_request, drafted_document) = state
        .composer
        .compose(&body.analysis, body.original_text.as_deref(), headers.request_id())
        .await?;

    Ok(Json(DraftApiResponse {
        draft_request,
        drafted_document,
    }))
}
