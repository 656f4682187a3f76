//! Canonical analysis model.
//!
//! Every response from the simplification service, whichever schema it used,
//! is reconciled into [`AnalysisResult`]. These types are also the JSON shape
//! returned to clients, hence the camelCase field names.

use serde::{Deserialize, Deserializer, Serialize};

use super::files::FileHandle;

/// Model tier requested from the simplification service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheaper, faster tier
    #[default]
    Flash,
    /// Higher quality, higher cost
    Pro,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Pro => "pro",
        }
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "flash" => Ok(Self::Flash),
            "pro" => Ok(Self::Pro),
            other => Err(format!("unknown model '{other}'")),
        }
    }
}

/// One analysis submission, after the HTTP layer has collected its parts.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub text: Option<String>,
    pub files: Vec<FileHandle>,
    pub model: ModelTier,
    pub no_cache: Option<bool>,
}

impl AnalysisRequest {
    pub fn text(text: impl Into<String>, model: ModelTier) -> Self {
        Self {
            text: Some(text.into()),
            files: Vec::new(),
            model,
            no_cache: None,
        }
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalFact {
    #[serde(rename = "type")]
    pub fact_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub entity: String,
    pub value: String,
}

impl ExtractedEntity {
    pub fn new(entity: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateDocument,
    InfoOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionableStep {
    pub description: String,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_to_create: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

// The service is not consistent about casing.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["high", "medium", "low"],
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskItem {
    pub risk_type: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Draft skeleton the service may produce alongside the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratedDocument {
    pub addressee: String,
    pub case_reference: String,
    pub parties: Vec<Party>,
    pub subject: String,
    pub explanations: Vec<String>,
    pub legal_grounds: String,
    pub conclusion_and_request: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
    pub signature_block: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub simplified_text: String,
    pub document_type: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub critical_facts: Vec<CriticalFact>,
    #[serde(default)]
    pub extracted_entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub actionable_steps: Vec<ActionableStep>,
    #[serde(default)]
    pub risk_items: Vec<RiskItem>,
    #[serde(default)]
    pub generated_document: Option<GeneratedDocument>,
}
