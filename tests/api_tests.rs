//! HTTP surface tests driving the router with `oneshot`.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use common::{
    collaborators, structured_reply, test_settings, token_for, FakeAnalysis, FakeDrafting,
    MemoryStore,
};
use legalease_backend::app::{create_app, AppState};
use legalease_backend::error::PipelineError;

struct Harness {
    app: Router,
    analysis: Arc<FakeAnalysis>,
    store: Arc<MemoryStore>,
}

fn harness_with(analysis: Arc<FakeAnalysis>, drafting: Arc<FakeDrafting>) -> Harness {
    let store = MemoryStore::new();
    let state = AppState::new(
        test_settings(),
        collaborators(analysis.clone(), drafting, store.clone()),
    );
    Harness {
        app: create_app(state),
        analysis,
        store,
    }
}

fn harness() -> Harness {
    harness_with(
        FakeAnalysis::replying(structured_reply()),
        FakeDrafting::replying(Some("SAYIN MAKAM\nİtiraz ediyorum.")),
    )
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_healthy_without_cache() {
    let h = harness();
    let response = h
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["services"]["cache"], json!("disabled"));
}

#[tokio::test]
async fn test_analyze_text_returns_ok_outcome() {
    let h = harness();
    let response = h
        .app
        .oneshot(json_post("/analyze", json!({"text": "Ödeme emri aldım.", "model": "flash"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["result"]["documentType"], json!("Ödeme Emri"));
    assert_eq!(body["result"]["criticalFacts"], json!([]));
    assert_eq!(h.analysis.call_count(), 1);
}

#[tokio::test]
async fn test_empty_analyze_is_unprocessable() {
    let h = harness();
    let response = h.app.oneshot(json_post("/analyze", json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["kind"], json!("ValidationError"));
    assert_eq!(h.analysis.call_count(), 0);
}

#[tokio::test]
async fn test_injection_is_a_bad_request() {
    let h = harness();
    let response = h
        .app
        .oneshot(json_post("/analyze", json!({"text": "<img src=x onerror=alert(1)>"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["kind"], json!("SecurityViolation"));
}

#[tokio::test]
async fn test_remote_failure_is_bad_gateway() {
    let h = harness_with(
        FakeAnalysis::failing(PipelineError::RemoteService("status 503".into())),
        FakeDrafting::replying(None),
    );
    let response = h
        .app
        .oneshot(json_post("/analyze", json!({"text": "metin"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["kind"], json!("RemoteServiceError"));
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let h = harness();
    let mut request = json_post("/analyze", json!({"text": "metin"}));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer forged.token.value".parse().unwrap());

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.analysis.call_count(), 0);
}

#[tokio::test]
async fn test_error_bodies_carry_the_request_id() {
    let h = harness();
    let mut request = json_post("/analyze", json!({"text": "metin"}));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer forged.token.value".parse().unwrap());
    request
        .headers_mut()
        .insert("x-request-id", "trace-401".parse().unwrap());

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("UNAUTHORIZED"));
    assert_eq!(body["request_id"], json!("trace-401"));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let h = harness();
    let mut request = json_post("/analyze", json!({"text": "metin"}));
    request
        .headers_mut()
        .insert("x-request-id", "trace-123".parse().unwrap());

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-123");
}

#[tokio::test]
async fn test_authenticated_analysis_shows_up_in_history() {
    let h = harness();
    let user_id = Uuid::new_v4();
    let bearer = format!("Bearer {}", token_for(user_id));

    let mut request = json_post("/analyze", json!({"text": "Ödeme emri aldım."}));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, bearer.parse().unwrap());
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Persistence runs in the background after the response
    for _ in 0..100 {
        if !h.store.documents().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.store.documents().len(), 1);
    assert_eq!(h.store.decrements(), vec![user_id]);

    let response = h
        .app
        .oneshot(
            Request::get("/documents?page=1&per_page=10")
                .header(header::AUTHORIZATION, bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total_items"], json!(1));
    assert_eq!(body["data"][0]["original_text"], json!("Ödeme emri aldım."));
}

#[tokio::test]
async fn test_documents_require_a_token() {
    let h = harness();
    let response = h
        .app
        .oneshot(Request::get("/documents").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_multipart_upload_mixes_binary_and_captured_files() {
    let h = harness();
    let boundary = "XBOUNDARYX";
    let captured = json!([{"name": "kamera.png", "type": "image/png", "data": "iVBORw0KGgo="}]);
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\nEkteki belge\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"model\"\r\n\r\npro\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"tebligat.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.7\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"captured\"\r\n\r\n{captured}\r\n\
         --{b}--\r\n",
        b = boundary,
        captured = captured
    );

    let request = Request::post("/analyze/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = h.analysis.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        legalease_backend::services::SimplifyPayload::Multipart { files, text, .. } => {
            let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["tebligat.pdf", "kamera.png"]);
            assert_eq!(files[0].bytes, b"%PDF-1.7".to_vec());
            assert_eq!(text.as_deref(), Some("Ekteki belge"));
        }
        other => panic!("expected multipart payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_draft_endpoint_returns_request_and_document() {
    let h = harness();
    let response = h
        .app
        .oneshot(json_post(
            "/draft",
            json!({"analysis": structured_reply(), "originalText": "Ödeme emri"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["draftedDocument"], json!("SAYIN MAKAM\nİtiraz ediyorum."));
    assert!(body["draftRequest"]["kullanici_girdileri"]["makam_adi"]
        .as_str()
        .unwrap()
        .contains("Ankara 1."));
}

#[tokio::test]
async fn test_draft_failure_is_bad_gateway() {
    let h = harness_with(
        FakeAnalysis::replying(structured_reply()),
        FakeDrafting::replying(None),
    );
    let response = h
        .app
        .oneshot(json_post("/draft", json!({"analysis": structured_reply()})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let generated_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("DRAFT_GENERATION_ERROR"));
    assert_eq!(body["request_id"], json!(generated_id));
}
