use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::workflows::onboarding::persistence::MemoryStore;
use crate::workflows::onboarding::router::{onboarding_router, view_handler, SessionRegistry};

fn registry_over(store: Arc<MemoryStore>) -> SessionRegistry<MemoryStore> {
    SessionRegistry::new(
        store,
        Arc::new(MemoryUploader::failing_for(&["flaky.png"])),
        Arc::new(RecordingSubmissions::default()),
        Arc::new(RecordingNavigator::default()),
        settings(),
    )
}

fn registry() -> Arc<SessionRegistry<MemoryStore>> {
    Arc::new(registry_over(Arc::new(MemoryStore::default())))
}

fn put_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::put(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn view_handler_opens_fresh_session() {
    let registry = registry();
    let response =
        view_handler::<MemoryStore>(State(registry.clone()), Path(OWNER.to_string())).await;

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 1);
    assert_eq!(body["section"], "personal_details");
    assert_eq!(body["submitting"], false);
    assert_eq!(registry.active_sessions().await, 1);
}

#[tokio::test]
async fn next_route_rejects_incomplete_section() {
    let router = onboarding_router(registry());

    let response = router
        .oneshot(post(&format!("/api/v1/onboarding/{OWNER}/next")))
        .await
        .unwrap();

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["transition"]["accepted"], false);
    assert!(!body["wizard"]["notifications"].as_array().unwrap().is_empty());
    assert_eq!(body["wizard"]["errors"][0]["step"], "personal_details");
}

#[tokio::test]
async fn section_update_then_next_advances() {
    let router = onboarding_router(registry());

    let response = router
        .clone()
        .oneshot(put_json(
            &format!("/api/v1/onboarding/{OWNER}/sections/personal-details"),
            serde_json::to_value(personal_details()).unwrap(),
        ))
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draft"]["personal_details"]["full_name"], "Asha Verma");

    let response = router
        .oneshot(post(&format!("/api/v1/onboarding/{OWNER}/next")))
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wizard"]["step"], 2);
}

#[tokio::test]
async fn malformed_or_unknown_sections_are_rejected() {
    let router = onboarding_router(registry());

    let response = router
        .clone()
        .oneshot(put_json(
            &format!("/api/v1/onboarding/{OWNER}/sections/hobbies"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(put_json(
            &format!("/api/v1/onboarding/{OWNER}/sections/about"),
            json!({ "motivation": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn document_upload_commits_png() {
    let router = onboarding_router(registry());

    let response = router
        .oneshot(
            Request::put(format!("/api/v1/onboarding/{OWNER}/documents/aadhar-front"))
                .header(header::CONTENT_TYPE, "image/png")
                .header("x-file-name", "front.png")
                .body(Body::from(vec![0x89, b'P', b'N', b'G']))
                .unwrap(),
        )
        .await
        .unwrap();

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["status"], "committed");
    assert_eq!(
        body["state"]["url"],
        format!("https://files.example.org/{OWNER}/front.png")
    );
}

#[tokio::test]
async fn document_upload_status_codes() {
    let router = onboarding_router(registry());
    let uri = format!("/api/v1/onboarding/{OWNER}/documents/pan_front");

    let missing_type = Request::put(&uri).body(Body::from(vec![1])).unwrap();
    let response = router.clone().oneshot(missing_type).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let jpeg = Request::put(&uri)
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(vec![1]))
        .unwrap();
    let response = router.clone().oneshot(jpeg).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let flaky = Request::put(&uri)
        .header(header::CONTENT_TYPE, "image/png")
        .header("x-file-name", "flaky.png")
        .body(Body::from(vec![1]))
        .unwrap();
    let response = router.clone().oneshot(flaky).await.unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["state"]["status"], "empty");

    let unknown = Request::put(format!("/api/v1/onboarding/{OWNER}/documents/passport"))
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(vec![1]))
        .unwrap();
    let response = router.oneshot(unknown).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_route_requires_final_step() {
    let router = onboarding_router(registry());

    let response = router
        .oneshot(post(&format!("/api/v1/onboarding/{OWNER}/submit")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn submitted_sessions_are_closed() {
    let store = Arc::new(MemoryStore::default());
    drop(ready_to_submit(store.clone()));
    let registry = Arc::new(registry_over(store));
    let router = onboarding_router(registry.clone());

    let response = router
        .clone()
        .oneshot(post(&format!("/api/v1/onboarding/{OWNER}/submit")))
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "submitted");
    assert_eq!(registry.active_sessions().await, 0);

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/onboarding/{OWNER}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 1);
    assert_eq!(body["draft"]["personal_details"]["full_name"], "");
}

#[tokio::test]
async fn idle_sessions_close_unless_still_in_use() {
    let registry = registry_over(Arc::new(MemoryStore::default()))
        .with_idle_timeout(Duration::ZERO);

    drop(registry.session("cand-a").await);
    drop(registry.session("cand-b").await);
    assert_eq!(registry.active_sessions().await, 1);

    let held = registry.session("cand-c").await;
    drop(registry.session("cand-d").await);
    assert_eq!(registry.active_sessions().await, 2);

    held.session
        .lock()
        .await
        .update_about(|about| about.hours_per_day = "4".to_string());
    drop(held);
    let reopened = registry.session("cand-c").await;
    assert_eq!(reopened.session.lock().await.draft().about.hours_per_day, "4");
}

#[tokio::test]
async fn owner_ids_are_validated() {
    let router = onboarding_router(registry());

    let response = router
        .oneshot(
            Request::get("/api/v1/onboarding/bad.owner")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
