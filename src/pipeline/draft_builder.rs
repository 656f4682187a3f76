//! Builds drafting requests from analysis results and calls the drafting service.

use std::sync::Arc;

use crate::domain::{
    ActionType, AnalysisResult, DraftAnalysisContext, DraftInputs, DraftRequest,
    GeneratedDocument,
};
use crate::error::PipelineError;
use crate::services::DraftingService;

use super::entity_role::{classify_entity_role, fold, names_authority, EntityRole};

pub const DEFAULT_DOCUMENT_KIND: &str = "İtiraz Dilekçesi";
pub const PLACEHOLDER_AUTHORITY: &str = "[İlgili Makam]";
pub const PLACEHOLDER_APPLICANT: &str = "[Ad Soyad]";
pub const DEFAULT_RELIEF: &str =
    "Yukarıda açıklanan nedenlerle itirazımın kabulüne karar verilmesini saygılarımla arz ederim.";

const MAX_SKELETON_REASONS: usize = 5;
const MAX_SYNTHESIZED_REASONS: usize = 7;
const MAX_CONTEXT_CHARS: usize = 4_000;

const APPLICANT_ROLES: &[&str] = &[
    "itiraz eden",
    "davacı",
    "başvuran",
    "borçlu",
    "müşteki",
    "kiracı",
    "applicant",
];

pub fn build_draft_request(result: &AnalysisResult, original_text: Option<&str>) -> DraftRequest {
    let inputs = match &result.generated_document {
        Some(doc) => inputs_from_skeleton(doc, result),
        None => synthesize_inputs(result),
    };

    let mut context = DraftAnalysisContext::from(result);
    context.original_text = original_text
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().take(MAX_CONTEXT_CHARS).collect());

    DraftRequest {
        belge_turu: document_kind(result),
        kullanici_girdileri: inputs,
        analysis: Some(context),
    }
}

fn document_kind(result: &AnalysisResult) -> String {
    result
        .actionable_steps
        .iter()
        .filter(|s| s.action_type == ActionType::CreateDocument)
        .find_map(|s| s.document_to_create.as_deref())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(DEFAULT_DOCUMENT_KIND)
        .to_string()
}

fn inputs_from_skeleton(doc: &GeneratedDocument, result: &AnalysisResult) -> DraftInputs {
    let makam_adi = strip_addressee_suffix(&doc.addressee);
    let dosya_no = Some(strip_reference_label(&doc.case_reference)).filter(|s| !s.is_empty());

    let itiraz_eden_kisi = doc
        .parties
        .iter()
        .find(|p| {
            let role = fold(&p.role);
            APPLICANT_ROLES.iter().any(|r| role.contains(&fold(r)))
        })
        .map(|p| p.name.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_APPLICANT.to_string());

    let itiraz_nedenleri = doc
        .explanations
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .take(MAX_SKELETON_REASONS)
        .map(str::to_string)
        .collect();

    let talep_sonucu = Some(doc.conclusion_and_request.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| relief_from_steps(result));

    DraftInputs {
        makam_adi: if makam_adi.is_empty() {
            PLACEHOLDER_AUTHORITY.to_string()
        } else {
            makam_adi
        },
        dosya_no,
        itiraz_eden_kisi,
        itiraz_nedenleri,
        talep_sonucu,
        ekler: doc.attachments.clone().unwrap_or_default(),
    }
}

fn synthesize_inputs(result: &AnalysisResult) -> DraftInputs {
    let addressee = result
        .extracted_entities
        .iter()
        .find(|e| classify_entity_role(&e.entity) == EntityRole::Addressee);
    let case_ref = result
        .extracted_entities
        .iter()
        .find(|e| classify_entity_role(&e.entity) == EntityRole::CaseRef);

    let makam_adi = addressee
        .map(|e| {
            let value = e.value.trim();
            if value.is_empty() {
                e.entity.trim().to_string()
            } else if names_authority(value) {
                value.to_string()
            } else {
                // "Ankara 1." + "İcra Müdürlüğü"
                format!("{} {}", value, e.entity.trim())
            }
        })
        .unwrap_or_else(|| PLACEHOLDER_AUTHORITY.to_string());

    let dosya_no = case_ref
        .map(|e| strip_reference_label(&e.value))
        .filter(|v| !v.is_empty());

    let mut itiraz_nedenleri: Vec<String> = result
        .risk_items
        .iter()
        .filter(|r| !r.description.trim().is_empty())
        .take(MAX_SYNTHESIZED_REASONS)
        .map(|r| {
            let refs: Vec<&str> = [r.article.as_deref(), r.legal_reference.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if refs.is_empty() {
                r.description.trim().to_string()
            } else {
                format!("{} ({})", r.description.trim(), refs.join(", "))
            }
        })
        .collect();

    if itiraz_nedenleri.is_empty() && !result.summary.trim().is_empty() {
        itiraz_nedenleri.push(result.summary.trim().to_string());
    }

    DraftInputs {
        makam_adi,
        dosya_no,
        itiraz_eden_kisi: PLACEHOLDER_APPLICANT.to_string(),
        itiraz_nedenleri,
        talep_sonucu: relief_from_steps(result),
        ekler: Vec::new(),
    }
}

/// A document-creating step is the most specific relief, then any step.
fn relief_from_steps(result: &AnalysisResult) -> String {
    let steps = &result.actionable_steps;
    steps
        .iter()
        .find(|s| s.action_type == ActionType::CreateDocument)
        .or_else(|| steps.first())
        .map(|s| s.description.trim())
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_RELIEF)
        .to_string()
}

const DATIVE_SUFFIXES: &[&str] = &["ne", "na", "ye", "ya", "e", "a"];
const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'ö', 'u', 'ü'];

/// Drop a trailing dative/vocative suffix: "İcra Müdürlüğü'ne" and
/// "İCRA MÜDÜRLÜĞÜNE" both become the bare authority name.
pub fn strip_addressee_suffix(addressee: &str) -> String {
    let trimmed = addressee
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ':' | ';'))
        .trim_end();

    if let Some(idx) = trimmed.rfind(|c: char| matches!(c, '\'' | '’' | '`')) {
        let apostrophe_len = trimmed[idx..].chars().next().map_or(1, char::len_utf8);
        let suffix = fold(&trimmed[idx + apostrophe_len..]);
        if DATIVE_SUFFIXES.contains(&suffix.as_str()) {
            return trimmed[..idx].trim_end().to_string();
        }
        return trimmed.to_string();
    }

    let last_word = trimmed.rsplit(char::is_whitespace).next().unwrap_or_default();
    let folded: Vec<char> = fold(last_word).chars().collect();
    let n = folded.len();
    let dative = n >= 6
        && matches!(folded[n - 1], 'e' | 'a')
        && folded[n - 2] == 'n'
        && VOWELS.contains(&folded[n - 3]);

    if dative {
        let cut = trimmed
            .char_indices()
            .rev()
            .nth(1)
            .map_or(trimmed.len(), |(i, _)| i);
        trimmed[..cut].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Drop a leading label such as "Dosya No:" or "Esas No :".
pub fn strip_reference_label(reference: &str) -> String {
    let trimmed = reference.trim();
    match trimmed.split_once(':') {
        Some((label, rest))
            if !label.trim().is_empty()
                && label.chars().count() <= 30
                && label
                    .chars()
                    .all(|c| c.is_alphabetic() || c.is_whitespace() || c == '.') =>
        {
            rest.trim().to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Turns an analysis into a drafted document via the drafting service.
#[derive(Clone)]
pub struct DraftComposer {
    drafting: Arc<dyn DraftingService>,
}

impl DraftComposer {
    pub fn new(drafting: Arc<dyn DraftingService>) -> Self {
        Self { drafting }
    }

    /// Build the request and call the service. Errors only affect this draft;
    /// the analysis it came from stays valid and can be drafted again.
    pub async fn compose(
        &self,
        result: &AnalysisResult,
        original_text: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<(DraftRequest, String), PipelineError> {
        let request = build_draft_request(result, original_text);

        tracing::info!(
            document_kind = %request.belge_turu,
            from_skeleton = result.generated_document.is_some(),
            reasons = request.kullanici_girdileri.itiraz_nedenleri.len(),
            "Requesting draft document"
        );

        let response = self
            .drafting
            .draft(&request, request_id)
            .await
            .map_err(|e| match e {
                PipelineError::RemoteService(message) => PipelineError::DraftGeneration(message),
                other => PipelineError::DraftGeneration(other.to_string()),
            })?;

        let document = response
            .drafted_document
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::DraftGeneration("drafting service returned no document".to_string())
            })?;

        Ok((request, document))
    }
}
