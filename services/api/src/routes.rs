use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use onboarding_wizard::workflows::onboarding::{
    onboarding_router, PersistenceStore, SessionRegistry,
};
use serde_json::json;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Directory served under `/files`.
#[derive(Debug, Clone)]
pub(crate) struct UploadsRoot(pub(crate) PathBuf);

pub(crate) fn with_onboarding_routes<S>(
    registry: Arc<SessionRegistry<S>>,
    uploads_root: PathBuf,
) -> axum::Router
where
    S: PersistenceStore + 'static,
{
    onboarding_router(registry)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/files/:owner/:name", axum::routing::get(uploaded_file_endpoint))
        .layer(Extension(UploadsRoot(uploads_root)))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

fn safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

pub(crate) async fn uploaded_file_endpoint(
    Extension(UploadsRoot(root)): Extension<UploadsRoot>,
    Path((owner, name)): Path<(String, String)>,
) -> Response {
    if !safe_segment(&owner) || !safe_segment(&name) {
        let payload = json!({ "error": "invalid file path" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    match tokio::fs::read(root.join(&owner).join(&name)).await {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(&name).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type.essence_str().to_string())],
                bytes,
            )
                .into_response()
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "file not found" }))).into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
