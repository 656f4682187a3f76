//! Analysis orchestration.
//!
//! One submission moves through
//! `Idle → Validating → RateChecked → [Normalizing] → Invoking → Reconciling`
//! and ends in `Succeeded` or `Failed`. Every gate before `Invoking` is local;
//! the only outbound call is the single simplify request.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{AnalysisRequest, AnalysisResult, ModelTier};
use crate::error::{ErrorKind, FieldViolation, FileDecodeFailure, PipelineError};
use crate::services::{AnalysisService, DocumentStore, ResultCache, SimplifyPayload};

use super::normalizer::normalize;
use super::persistence::{describe_original_text, PersistJob, PersistenceGateway};
use super::rate_limit::RateLimiter;
use super::reconcile::{reconcile, Reconciled};
use super::security::SecurityValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Validating,
    RateChecked,
    Normalizing,
    Invoking,
    Reconciling,
    Succeeded,
    Failed,
}

/// Who is asking, as far as the pipeline cares.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller {
    /// Authenticated user; `None` shares the anonymous rate bucket and is
    /// never persisted
    pub user_id: Option<Uuid>,
    /// Request came from a loopback origin; forces `noCache`
    pub loopback: bool,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            loopback: false,
        }
    }
}

/// Caller-visible result of one analysis.
#[derive(Debug)]
pub enum AnalysisOutcome {
    Ok(AnalysisResult),
    Error(PipelineError),
}

impl AnalysisOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Ok(result) => Some(result),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::Ok(_) => None,
            Self::Error(e) => Some(e),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum OutcomeBody<'a> {
    Ok {
        result: &'a AnalysisResult,
    },
    Error {
        kind: ErrorKind,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        violations: Option<&'a [FieldViolation]>,
        #[serde(skip_serializing_if = "Option::is_none")]
        files: Option<&'a [FileDecodeFailure]>,
    },
}

impl Serialize for AnalysisOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            Self::Ok(result) => OutcomeBody::Ok { result },
            Self::Error(e) => OutcomeBody::Error {
                kind: e.kind(),
                message: e.to_string(),
                violations: match e {
                    PipelineError::Validation(v) => Some(v.as_slice()),
                    _ => None,
                },
                files: match e {
                    PipelineError::FileDecode(f) => Some(f.as_slice()),
                    _ => None,
                },
            },
        };
        body.serialize(serializer)
    }
}

impl IntoResponse for AnalysisOutcome {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self {
            Self::Ok(_) => (StatusCode::OK, None),
            Self::Error(e @ PipelineError::RateLimitExceeded { retry_after_minutes }) => {
                (e.status_code(), Some(retry_after_minutes * 60))
            }
            Self::Error(e) => (e.status_code(), None),
        };

        let mut response = (status, Json(self)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Everything one `analyze` call produced.
pub struct AnalysisRun {
    pub outcome: AnalysisOutcome,
    /// States visited, in order
    pub trace: Vec<PipelineState>,
    /// Deferred storage write; run it after the outcome has been delivered
    pub persist: Option<PersistJob>,
}

impl AnalysisRun {
    pub fn final_state(&self) -> PipelineState {
        self.trace.last().copied().unwrap_or(PipelineState::Idle)
    }
}

/// Redis key for a cached text-only analysis.
pub fn cache_key(model: ModelTier, text: &str) -> String {
    format!("analysis:{}:{:x}", model.as_str(), Sha256::digest(text.as_bytes()))
}

pub struct AnalysisOrchestrator {
    validator: SecurityValidator,
    limiter: Arc<RateLimiter>,
    analysis: Arc<dyn AnalysisService>,
    cache: Option<Arc<dyn ResultCache>>,
    persistence: PersistenceGateway,
}

impl AnalysisOrchestrator {
    pub fn new(
        validator: SecurityValidator,
        limiter: Arc<RateLimiter>,
        analysis: Arc<dyn AnalysisService>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            validator,
            limiter,
            analysis,
            cache: None,
            persistence: PersistenceGateway::new(store),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[instrument(skip(self, request), fields(model = request.model.as_str(), files = request.files.len()))]
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        caller: Caller,
        request_id: Option<&str>,
    ) -> AnalysisRun {
        let mut trace = vec![PipelineState::Idle];

        match self.run(request, caller, request_id, &mut trace).await {
            Ok((reconciled, persist)) => {
                enter(&mut trace, PipelineState::Succeeded);
                AnalysisRun {
                    outcome: AnalysisOutcome::Ok(reconciled.result),
                    trace,
                    persist,
                }
            }
            Err(e) => {
                if e.is_pre_flight() {
                    tracing::warn!(kind = ?e.kind(), error = %e, "Analysis rejected");
                } else {
                    tracing::error!(kind = ?e.kind(), error = %e, "Analysis failed");
                }
                enter(&mut trace, PipelineState::Failed);
                AnalysisRun {
                    outcome: AnalysisOutcome::Error(e),
                    trace,
                    persist: None,
                }
            }
        }
    }

    async fn run(
        &self,
        request: AnalysisRequest,
        caller: Caller,
        request_id: Option<&str>,
        trace: &mut Vec<PipelineState>,
    ) -> Result<(Reconciled, Option<PersistJob>), PipelineError> {
        enter(trace, PipelineState::Validating);
        let text = self.validator.validate(request.text.as_deref(), &request.files)?;

        let bucket = caller.user_id.map(|id| id.to_string());
        let allowed = self.limiter.is_allowed(bucket.as_deref());
        enter(trace, PipelineState::RateChecked);
        if !allowed {
            return Err(PipelineError::RateLimitExceeded {
                retry_after_minutes: self.limiter.window().as_secs().div_ceil(60),
            });
        }

        let no_cache = request.no_cache.unwrap_or(false) || caller.loopback;
        let model = request.model;
        let file_names: Vec<String> = request.files.iter().map(|f| f.name().to_string()).collect();

        let payload = if request.has_files() {
            enter(trace, PipelineState::Normalizing);
            let files = normalize(request.files)?;
            SimplifyPayload::Multipart {
                files,
                text: (!text.is_empty()).then(|| text.clone()),
                model,
                no_cache,
            }
        } else {
            SimplifyPayload::Json {
                text: text.clone(),
                model,
                no_cache,
            }
        };

        enter(trace, PipelineState::Invoking);
        let cache = match (&self.cache, &payload) {
            (Some(cache), SimplifyPayload::Json { .. }) if !no_cache => {
                Some((cache, cache_key(model, &text)))
            }
            _ => None,
        };

        let cached = match &cache {
            Some((cache, key)) => cache.get_raw(key).await,
            None => None,
        };
        let from_cache = cached.is_some();
        let raw = match cached {
            Some(raw) => {
                tracing::debug!("Serving analysis from cache");
                raw
            }
            None => self.analysis.simplify(payload, request_id).await?,
        };

        enter(trace, PipelineState::Reconciling);
        let to_store = (!from_cache && cache.is_some()).then(|| raw.clone());
        let reconciled = reconcile(raw)?;

        if let (Some((cache, key)), Some(raw)) = (&cache, to_store) {
            cache.put_raw(key, &raw).await;
        }

        let persist = caller.user_id.map(|user_id| {
            self.persistence
                .job(&reconciled, describe_original_text(&text, &file_names), user_id)
        });

        Ok((reconciled, persist))
    }
}

fn enter(trace: &mut Vec<PipelineState>, state: PipelineState) {
    tracing::debug!(?state, "Pipeline state");
    trace.push(state);
}
