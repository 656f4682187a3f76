//! Best-effort storage of finished analyses.
//!
//! Persistence runs after the caller already has its result. Failures are
//! collected as warnings and never turn a successful analysis into an error.

use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::NewDocument;
use crate::error::PipelineError;
use crate::services::DocumentStore;

use super::reconcile::{Reconciled, ResponseShape};

/// Key marking an `action_plan` column that holds the structured envelope.
pub const STRUCTURED_MARKER: &str = "__structured";

/// `original_text` column value: the text, prefixed with the file names.
pub fn describe_original_text(text: &str, file_names: &[String]) -> String {
    if file_names.is_empty() {
        text.to_string()
    } else {
        format!("[Files: {}] {}", file_names.join(", "), text)
    }
}

/// Serialize the action plan for the `action_plan` column. The table has no
/// column for the richer structured shape, so it travels as a JSON string.
pub fn encode_action_plan(reconciled: &Reconciled) -> String {
    match reconciled.shape {
        ResponseShape::Structured => {
            let result = &reconciled.result;
            json!({
                STRUCTURED_MARKER: true,
                "actionable_steps": result.actionable_steps,
                "extracted_entities": result.extracted_entities,
                "risk_items": result.risk_items,
                "legacy_action_plan": reconciled.action_plan_text,
            })
            .to_string()
        }
        ResponseShape::Legacy => reconciled.action_plan_text.clone(),
    }
}

pub fn build_document(reconciled: &Reconciled, original_text: String, user_id: Uuid) -> NewDocument {
    let result = &reconciled.result;
    NewDocument {
        user_id,
        original_text,
        simplified_text: result.simplified_text.clone(),
        summary: result.summary.clone(),
        action_plan: encode_action_plan(reconciled),
        entities: serde_json::to_value(&result.extracted_entities)
            .unwrap_or_else(|_| Value::Array(Vec::new())),
    }
}

/// What happened while persisting one analysis.
#[derive(Debug, Default)]
pub struct PersistenceReport {
    pub document_id: Option<Uuid>,
    pub credit_decremented: bool,
    pub warnings: Vec<PipelineError>,
}

impl PersistenceReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Prepare a deferred write; nothing touches the store until it runs.
    pub fn job(&self, reconciled: &Reconciled, original_text: String, user_id: Uuid) -> PersistJob {
        PersistJob {
            store: Arc::clone(&self.store),
            document: build_document(reconciled, original_text, user_id),
        }
    }

    pub async fn persist(
        &self,
        reconciled: &Reconciled,
        original_text: String,
        user_id: Uuid,
    ) -> PersistenceReport {
        self.job(reconciled, original_text, user_id).run().await
    }
}

/// A prepared document write plus the credit decrement that follows it.
pub struct PersistJob {
    store: Arc<dyn DocumentStore>,
    document: NewDocument,
}

impl PersistJob {
    pub fn document(&self) -> &NewDocument {
        &self.document
    }

    pub async fn run(self) -> PersistenceReport {
        let user_id = self.document.user_id;
        let mut report = PersistenceReport::default();

        match self.store.insert_document(&self.document).await {
            Ok(id) => {
                tracing::info!(user_id = %user_id, document_id = %id, "Analysis saved");
                report.document_id = Some(id);
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to save analysis");
                report.warnings.push(e);
                // No document, no charge
                return report;
            }
        }

        match self.store.decrement_credits(user_id).await {
            Ok(()) => report.credit_decremented = true,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to decrement credits");
                report.warnings.push(e);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionType, ActionableStep, AnalysisResult, ExtractedEntity};

    fn reconciled(shape: ResponseShape) -> Reconciled {
        Reconciled {
            result: AnalysisResult {
                simplified_text: "Sade metin".into(),
                document_type: "Ödeme Emri".into(),
                summary: "Özet".into(),
                critical_facts: vec![],
                extracted_entities: vec![ExtractedEntity::new("Borçlu", "Ayşe")],
                actionable_steps: vec![ActionableStep {
                    description: "İtiraz edin".into(),
                    action_type: ActionType::CreateDocument,
                    document_to_create: None,
                }],
                risk_items: vec![],
                generated_document: None,
            },
            shape,
            action_plan_text: "İtiraz edin".into(),
        }
    }

    #[test]
    fn test_original_text_prefix() {
        assert_eq!(describe_original_text("metin", &[]), "metin");
        assert_eq!(
            describe_original_text("metin", &["a.jpg".into(), "b.pdf".into()]),
            "[Files: a.jpg, b.pdf] metin"
        );
        assert_eq!(describe_original_text("", &["a.jpg".into()]), "[Files: a.jpg] ");
    }

    #[test]
    fn test_structured_action_plan_is_a_json_envelope() {
        let plan = encode_action_plan(&reconciled(ResponseShape::Structured));
        let parsed: Value = serde_json::from_str(&plan).unwrap();

        assert_eq!(parsed[STRUCTURED_MARKER], json!(true));
        assert_eq!(parsed["actionable_steps"][0]["actionType"], json!("CREATE_DOCUMENT"));
        assert_eq!(parsed["extracted_entities"][0]["entity"], json!("Borçlu"));
        assert_eq!(parsed["risk_items"], json!([]));
        assert_eq!(parsed["legacy_action_plan"], json!("İtiraz edin"));
    }

    #[test]
    fn test_legacy_action_plan_is_plain_text() {
        let plan = encode_action_plan(&reconciled(ResponseShape::Legacy));
        assert_eq!(plan, "İtiraz edin");
    }

    #[test]
    fn test_document_carries_entities_as_json() {
        let user_id = Uuid::new_v4();
        let doc = build_document(&reconciled(ResponseShape::Legacy), "metin".into(), user_id);

        assert_eq!(doc.user_id, user_id);
        assert_eq!(doc.entities, json!([{"entity": "Borçlu", "value": "Ayşe"}]));
        assert_eq!(doc.simplified_text, "Sade metin");
    }
}
