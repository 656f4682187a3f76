//! In-memory collaborators shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use legalease_backend::api::PaginationParams;
use legalease_backend::app::Collaborators;
use legalease_backend::config::Settings;
use legalease_backend::domain::{DraftRequest, DraftResponse, NewDocument, PersistedDocument};
use legalease_backend::error::PipelineError;
use legalease_backend::services::{
    AnalysisService, DocumentStore, DraftingService, ResultCache, SimplifyPayload,
};

pub const JWT_SECRET: &str = "integration-secret";

/// Analysis service answering every call with the same reply.
pub struct FakeAnalysis {
    reply: Mutex<Result<Value, PipelineError>>,
    calls: Mutex<Vec<SimplifyPayload>>,
}

impl FakeAnalysis {
    pub fn replying(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Ok(reply)),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: PipelineError) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Err(error)),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<SimplifyPayload> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl AnalysisService for FakeAnalysis {
    async fn simplify(
        &self,
        payload: SimplifyPayload,
        _request_id: Option<&str>,
    ) -> Result<Value, PipelineError> {
        self.calls.lock().push(payload);
        self.reply.lock().clone()
    }
}

pub struct FakeDrafting {
    reply: Result<DraftResponse, PipelineError>,
    requests: Mutex<Vec<DraftRequest>>,
}

impl FakeDrafting {
    pub fn replying(document: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(DraftResponse {
                drafted_document: document.map(str::to_string),
            }),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: PipelineError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<DraftRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DraftingService for FakeDrafting {
    async fn draft(
        &self,
        request: &DraftRequest,
        _request_id: Option<&str>,
    ) -> Result<DraftResponse, PipelineError> {
        self.requests.lock().push(request.clone());
        self.reply.clone()
    }
}

/// Document store keeping rows and credit decrements in memory.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<PersistedDocument>>,
    decrements: Mutex<Vec<Uuid>>,
    pub fail_insert: bool,
    pub fail_decrement: bool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_failures(fail_insert: bool, fail_decrement: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_insert,
            fail_decrement,
            ..Self::default()
        })
    }

    pub fn documents(&self) -> Vec<PersistedDocument> {
        self.documents.lock().clone()
    }

    pub fn decrements(&self) -> Vec<Uuid> {
        self.decrements.lock().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document(&self, document: &NewDocument) -> Result<Uuid, PipelineError> {
        if self.fail_insert {
            return Err(PipelineError::Persistence("connection refused".into()));
        }

        let id = Uuid::new_v4();
        self.documents.lock().push(PersistedDocument {
            id,
            user_id: document.user_id,
            original_text: document.original_text.clone(),
            simplified_text: document.simplified_text.clone(),
            summary: document.summary.clone(),
            action_plan: document.action_plan.clone(),
            entities: document.entities.clone(),
            created_at: chrono::Utc::now(),
        });
        Ok(id)
    }

    async fn decrement_credits(&self, user_id: Uuid) -> Result<(), PipelineError> {
        if self.fail_decrement {
            return Err(PipelineError::Persistence("function decrement_credits failed".into()));
        }
        self.decrements.lock().push(user_id);
        Ok(())
    }

    async fn list_documents(
        &self,
        user_id: Uuid,
        page: &PaginationParams,
    ) -> Result<(Vec<PersistedDocument>, u64), PipelineError> {
        let mut mine: Vec<_> = self
            .documents
            .lock()
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = mine.len() as u64;
        let page_items = mine
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok((page_items, total))
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get_raw(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    async fn put_raw(&self, key: &str, value: &Value) {
        self.entries.lock().insert(key.to_string(), value.clone());
    }
}

pub fn test_settings() -> Settings {
    Settings {
        auth_jwt_secret: JWT_SECRET.to_string(),
        ai_service_token: "internal".to_string(),
        ..Settings::default()
    }
}

pub fn collaborators(
    analysis: Arc<FakeAnalysis>,
    drafting: Arc<FakeDrafting>,
    store: Arc<MemoryStore>,
) -> Collaborators {
    Collaborators {
        analysis,
        drafting,
        store,
        cache: None,
    }
}

/// Structured reply for an enforcement notice.
pub fn structured_reply() -> Value {
    json!({
        "simplifiedText": "Hakkınızda 5.000 TL için icra takibi başlatılmış.",
        "documentType": "Ödeme Emri",
        "summary": "Borca itiraz için yedi gününüz var.",
        "extractedEntities": [
            {"entity": "İcra Müdürlüğü", "value": "Ankara 1."},
            {"entity": "Dosya No", "value": "2024/1234 E."},
            {"entity": "Borçlu", "value": "Ayşe Yılmaz"}
        ],
        "actionableSteps": [
            {
                "description": "Yedi gün içinde ödeme emrine itiraz edin.",
                "actionType": "CREATE_DOCUMENT",
                "documentToCreate": "İtiraz Dilekçesi"
            }
        ],
        "riskItems": [
            {"riskType": "deadline", "description": "İtiraz süresi kaçarsa takip kesinleşir.", "severity": "high"}
        ]
    })
}

/// Reply in the older entity-list schema.
pub fn legacy_reply() -> Value {
    json!({
        "simplifiedText": "Kira artışı bildirimi.",
        "entities": [
            {"tip": "Kiraya Veren", "değer": "Mehmet Demir"},
            {"değer": "12.000 TL"}
        ],
        "actionPlan": "Artış oranını kontrol edin."
    })
}

/// Sign an access token for `user_id` with the test secret.
pub fn token_for(user_id: Uuid) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use legalease_backend::auth::Claims;

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        aud: "authenticated".to_string(),
        iat: Some(now),
        exp: now + 3600,
        email: None,
        role: Some("authenticated".to_string()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token encodes")
}
