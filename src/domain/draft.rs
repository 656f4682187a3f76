//! Drafting service request and response.
//!
//! Field names follow the drafting service contract, which is Turkish.

use serde::{Deserialize, Serialize};

use super::analysis::{AnalysisResult, ExtractedEntity, RiskItem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    /// Document kind to produce, e.g. "İtiraz Dilekçesi"
    pub belge_turu: String,
    pub kullanici_girdileri: DraftInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<DraftAnalysisContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftInputs {
    /// Authority the document is addressed to
    pub makam_adi: String,
    /// Case or enforcement file number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosya_no: Option<String>,
    /// Person raising the objection
    pub itiraz_eden_kisi: String,
    /// Grounds for the objection
    pub itiraz_nedenleri: Vec<String>,
    /// Requested relief
    pub talep_sonucu: String,
    /// Attachments
    pub ekler: Vec<String>,
}

/// The part of an analysis the drafting service uses as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftAnalysisContext {
    pub document_type: String,
    pub summary: String,
    pub simplified_text: String,
    pub extracted_entities: Vec<ExtractedEntity>,
    pub risk_items: Vec<RiskItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

impl From<&AnalysisResult> for DraftAnalysisContext {
    fn from(r: &AnalysisResult) -> Self {
        Self {
            document_type: r.document_type.clone(),
            summary: r.summary.clone(),
            simplified_text: r.simplified_text.clone(),
            extracted_entities: r.extracted_entities.clone(),
            risk_items: r.risk_items.clone(),
            original_text: None,
        }
    }
}

/// Raw drafting service reply; `drafted_document` may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    #[serde(default)]
    pub drafted_document: Option<String>,
}

/// Body of `POST /draft`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftApiRequest {
    pub analysis: AnalysisResult,
    #[serde(default)]
    pub original_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftApiResponse {
    pub draft_request: DraftRequest,
    pub drafted_document: String,
}
