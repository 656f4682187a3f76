//! Client for the document-understanding AI service.
//!
//! Two endpoints are used:
//! - `POST /v1/simplify`: JSON for text-only requests, multipart when files are attached
//! - `POST /v1/draft`: drafting of a reply document
//!
//! Calls are never retried. Every failure surfaces as
//! [`PipelineError::RemoteService`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::domain::{DraftRequest, DraftResponse, ModelTier, TransportFile};
use crate::error::PipelineError;

use super::{AnalysisService, DraftingService, SimplifyPayload};

/// Client for the AI service.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
    token: String,
}

/// Error body returned by the AI service. Different versions use different keys.
#[derive(Debug, Deserialize)]
struct AiErrorResponse {
    message: Option<String>,
    error: Option<String>,
    detail: Option<String>,
}

impl AiErrorResponse {
    fn into_message(self) -> Option<String> {
        self.message.or(self.error).or(self.detail)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimplifyJson<'a> {
    text: &'a str,
    model: ModelTier,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    no_cache: bool,
}

impl AiClient {
    pub fn new(base_url: &str, token: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "AI client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn request(&self, path: &str, request_id: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "AI service request");

        let mut req = self
            .client
            .post(&url)
            .header("X-Internal-Token", &self.token);

        if let Some(rid) = request_id {
            req = req.header("x-request-id", rid);
        }

        req
    }

    /// Send a prepared request and decode the body.
    async fn send<R: DeserializeOwned>(&self, req: RequestBuilder) -> Result<R, PipelineError> {
        let response = req.send().await.map_err(|e| {
            error!(error = %e, "AI service request failed");
            if e.is_timeout() {
                PipelineError::RemoteService("request timed out".to_string())
            } else {
                PipelineError::RemoteService(format!("service unavailable: {e}"))
            }
        })?;

        let status = response.status();

        if status.is_success() {
            return response.json::<R>().await.map_err(|e| {
                error!(error = %e, "Failed to parse AI service response");
                PipelineError::RemoteService(format!("invalid response: {e}"))
            });
        }

        let message = response
            .json::<AiErrorResponse>()
            .await
            .ok()
            .and_then(AiErrorResponse::into_message)
            .unwrap_or_else(|| format!("status {status}"));

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!(status = %status, "AI service authentication failed");
            return Err(PipelineError::RemoteService("service authentication failed".to_string()));
        }

        error!(status = %status, message = %message, "AI service error");
        Err(PipelineError::RemoteService(message))
    }

    fn multipart_form(
        files: Vec<TransportFile>,
        text: Option<String>,
        model: ModelTier,
        no_cache: bool,
    ) -> Result<Form, PipelineError> {
        let mut form = Form::new().text("model", model.as_str());

        for file in files {
            let part = Part::bytes(file.bytes)
                .file_name(file.name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| {
                    PipelineError::RemoteService(format!(
                        "cannot send file '{}' as {}: {e}",
                        file.name, file.content_type
                    ))
                })?;
            form = form.part("files", part);
        }

        if let Some(text) = text {
            form = form.text("text", text);
        }
        if no_cache {
            form = form.text("noCache", "true");
        }

        Ok(form)
    }

    /// Check AI service health.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("AI service health check failed")?
            .error_for_status()
            .context("AI service unhealthy")?;

        Ok(())
    }
}

#[async_trait]
impl AnalysisService for AiClient {
    #[instrument(skip(self, payload), fields(multipart = payload.is_multipart()))]
    async fn simplify(
        &self,
        payload: SimplifyPayload,
        request_id: Option<&str>,
    ) -> Result<Value, PipelineError> {
        let req = self.request("/v1/simplify", request_id);

        let req = match payload {
            SimplifyPayload::Json { text, model, no_cache } => req.json(&SimplifyJson {
                text: &text,
                model,
                no_cache,
            }),
            SimplifyPayload::Multipart {
                files,
                text,
                model,
                no_cache,
            } => req.multipart(Self::multipart_form(files, text, model, no_cache)?),
        };

        self.send(req).await
    }

    async fn health_check(&self) -> Result<()> {
        AiClient::health_check(self).await
    }
}

#[async_trait]
impl DraftingService for AiClient {
    #[instrument(skip(self, request), fields(kind = %request.belge_turu))]
    async fn draft(
        &self,
        request: &DraftRequest,
        request_id: Option<&str>,
    ) -> Result<DraftResponse, PipelineError> {
        let req = self.request("/v1/draft", request_id).json(request);
        self.send(req).await
    }
}
