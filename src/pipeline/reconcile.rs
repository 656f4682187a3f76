//! Maps both simplification response schemas onto [`AnalysisResult`].
//!
//! The service changed its contract over time and old deployments still
//! answer with the legacy shape, so both stay supported.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    ActionType, ActionableStep, AnalysisResult, CriticalFact, ExtractedEntity, GeneratedDocument,
    RiskItem,
};
use crate::error::PipelineError;

/// Entity name used when a legacy entry has none.
pub const UNKNOWN_ENTITY: &str = "Bilinmeyen";

/// Fields whose joint presence marks the structured schema.
pub const STRUCTURED_FIELDS: [&str; 4] = [
    "simplifiedText",
    "documentType",
    "extractedEntities",
    "actionableSteps",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    Structured,
    Legacy,
}

/// Decide which schema a raw response uses.
pub fn classify(raw: &Value) -> ResponseShape {
    let has_all = raw.as_object().is_some_and(|obj| {
        STRUCTURED_FIELDS
            .iter()
            .all(|field| obj.get(*field).is_some_and(|v| !v.is_null()))
    });

    if has_all {
        ResponseShape::Structured
    } else {
        ResponseShape::Legacy
    }
}

/// A canonical result plus what persistence needs to know about its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub result: AnalysisResult,
    pub shape: ResponseShape,
    /// Free-text action plan: the legacy `actionPlan`, or the step
    /// descriptions when the structured response has none.
    pub action_plan_text: String,
}

pub fn reconcile(raw: Value) -> Result<Reconciled, PipelineError> {
    let shape = classify(&raw);
    let Value::Object(obj) = raw else {
        return Err(PipelineError::RemoteService(
            "unexpected response format from analysis service".to_string(),
        ));
    };

    match shape {
        ResponseShape::Structured => reconcile_structured(obj),
        ResponseShape::Legacy => Ok(reconcile_legacy(&obj)),
    }
}

fn reconcile_structured(obj: Map<String, Value>) -> Result<Reconciled, PipelineError> {
    let result = AnalysisResult {
        simplified_text: required_text(&obj, "simplifiedText")?,
        document_type: required_text(&obj, "documentType")?,
        summary: string_field(&obj, &["summary"]).unwrap_or_default(),
        critical_facts: lenient_list::<CriticalFact>(&obj, "criticalFacts"),
        extracted_entities: list_entries(&obj, "extractedEntities")
            .iter()
            .map(legacy_entity)
            .collect(),
        actionable_steps: list_entries(&obj, "actionableSteps")
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| actionable_step(index, entry))
            .collect(),
        risk_items: lenient_list::<RiskItem>(&obj, "riskItems"),
        generated_document: generated_document(&obj),
    };

    let action_plan_text = action_plan_from(&obj).unwrap_or_else(|| {
        result
            .actionable_steps
            .iter()
            .map(|s| s.description.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    });

    Ok(Reconciled {
        result,
        shape: ResponseShape::Structured,
        action_plan_text,
    })
}

fn required_text(obj: &Map<String, Value>, key: &str) -> Result<String, PipelineError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            tracing::error!(field = key, "Structured analysis response lacks a text field");
            PipelineError::RemoteService(format!(
                "malformed analysis response: `{key}` must be a string"
            ))
        })
}

/// Decode one step. A step with a usable description but an unknown action
/// type is kept as information only.
fn actionable_step(index: usize, entry: &Value) -> Option<ActionableStep> {
    let error = match serde_json::from_value::<ActionableStep>(entry.clone()) {
        Ok(step) => return Some(step),
        Err(e) => e,
    };

    let description = entry
        .get("description")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty());

    match description {
        Some(description) => {
            tracing::warn!(index, error = %error, "Keeping unrecognized step as information only");
            Some(ActionableStep {
                description: description.to_string(),
                action_type: ActionType::InfoOnly,
                document_to_create: None,
            })
        }
        None => {
            tracing::warn!(field = "actionableSteps", index, error = %error, "Skipping malformed entry");
            None
        }
    }
}

fn generated_document(obj: &Map<String, Value>) -> Option<GeneratedDocument> {
    match obj.get("generatedDocument") {
        None | Some(Value::Null) => None,
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| tracing::warn!(error = %e, "Ignoring malformed generated document"))
            .ok(),
    }
}

fn reconcile_legacy(obj: &Map<String, Value>) -> Reconciled {
    let entity_key = if obj.get("entities").is_some_and(Value::is_array) {
        "entities"
    } else {
        "extractedEntities"
    };
    let entities = list_entries(obj, entity_key).iter().map(legacy_entity).collect();

    let result = AnalysisResult {
        simplified_text: string_field(obj, &["simplifiedText", "simplified_text"]).unwrap_or_default(),
        document_type: string_field(obj, &["documentType", "document_type"])
            .unwrap_or_else(|| UNKNOWN_ENTITY.to_string()),
        summary: string_field(obj, &["summary"]).unwrap_or_default(),
        critical_facts: lenient_list::<CriticalFact>(obj, "criticalFacts"),
        extracted_entities: entities,
        actionable_steps: Vec::new(),
        risk_items: lenient_list::<RiskItem>(obj, "riskItems"),
        generated_document: None,
    };

    Reconciled {
        result,
        shape: ResponseShape::Legacy,
        action_plan_text: action_plan_from(obj).unwrap_or_default(),
    }
}

/// Map one legacy entry (`{tip|entity, değer|value}`) to the canonical pair.
fn legacy_entity(entry: &Value) -> ExtractedEntity {
    match entry {
        Value::Object(fields) => {
            let name = ["tip", "entity"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(scalar_text))
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ENTITY.to_string());
            let value = ["değer", "value"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(scalar_text))
                .unwrap_or_default();
            ExtractedEntity::new(name, value)
        }
        other => ExtractedEntity::new(UNKNOWN_ENTITY, scalar_text(other).unwrap_or_default()),
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

fn action_plan_from(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("actionPlan").or_else(|| obj.get("action_plan"))? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

/// Entries of an optional list field. Anything other than a list is ignored.
fn list_entries<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    match obj.get(key) {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => &[],
        Some(_) => {
            tracing::warn!(field = key, "Expected a list, ignoring field");
            &[]
        }
    }
}

/// Parse the entries of an optional list field, skipping malformed ones.
fn lenient_list<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Vec<T> {
    list_entries(obj, key)
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(field = key, index, error = %e, "Skipping malformed entry");
                None
            }
        })
        .collect()
}
