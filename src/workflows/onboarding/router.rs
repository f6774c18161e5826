use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::collaborators::{
    FileUploader, Navigator, Notification, NotificationLog, SubmissionService,
};
use super::controller::{NavigationError, SubmitError, WizardController, WizardSettings};
use super::domain::{
    About, DocumentSlot, DocumentState, Draft, Identification, PersonalDetails, Qualification,
    Reference, WizardStep,
};
use super::persistence::{PersistenceStore, DEFAULT_NAMESPACE};
use super::sections::ValidationReport;
use super::session::WizardSession;
use super::uploads::{LocalFile, UploadRejected, UploadResolution};

const FILE_NAME_HEADER: &str = "x-file-name";

/// One live wizard plus the notifications it has raised since the last response.
pub struct SessionHandle<S> {
    pub session: Arc<WizardSession<S, NotificationLog>>,
    pub notifications: Arc<NotificationLog>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            notifications: Arc::clone(&self.notifications),
        }
    }
}

/// Sessions untouched for this long are closed on the next registry access.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct OpenSession<S> {
    handle: SessionHandle<S>,
    last_seen: Instant,
}

/// Lazily opens one wizard session per candidate, all sharing a store and collaborators.
///
/// Drafts live in the store, so a closed session is rehydrated on the next request.
pub struct SessionRegistry<S> {
    store: Arc<S>,
    uploader: Arc<dyn FileUploader>,
    submitter: Arc<dyn SubmissionService>,
    navigator: Arc<dyn Navigator>,
    defaults: WizardSettings,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<String, OpenSession<S>>>,
}

impl<S> SessionRegistry<S>
where
    S: PersistenceStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        uploader: Arc<dyn FileUploader>,
        submitter: Arc<dyn SubmissionService>,
        navigator: Arc<dyn Navigator>,
        defaults: WizardSettings,
    ) -> Self {
        Self {
            store,
            uploader,
            submitter,
            navigator,
            defaults,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings_for(&self, owner_id: &str) -> WizardSettings {
        WizardSettings {
            owner_id: owner_id.to_string(),
            namespace: format!("{DEFAULT_NAMESPACE}.{owner_id}"),
            ..self.defaults.clone()
        }
    }

    pub async fn session(&self, owner_id: &str) -> SessionHandle<S> {
        let mut sessions = self.sessions.lock().await;
        self.close_idle(&mut sessions);
        if let Some(open) = sessions.get_mut(owner_id) {
            open.last_seen = Instant::now();
            return open.handle.clone();
        }

        let notifications = Arc::new(NotificationLog::default());
        let controller = WizardController::rehydrate(
            Arc::clone(&self.store),
            Arc::clone(&notifications),
            self.settings_for(owner_id),
        );
        let handle = SessionHandle {
            session: Arc::new(WizardSession::new(
                controller,
                Arc::clone(&self.uploader),
                Arc::clone(&self.submitter),
                Arc::clone(&self.navigator),
            )),
            notifications,
        };
        info!(owner = owner_id, "opened onboarding session");
        sessions.insert(
            owner_id.to_string(),
            OpenSession {
                handle: handle.clone(),
                last_seen: Instant::now(),
            },
        );
        handle
    }

    /// Forgets the live session for `owner_id`; returns whether one was open.
    pub async fn close(&self, owner_id: &str) -> bool {
        let closed = self.sessions.lock().await.remove(owner_id).is_some();
        if closed {
            info!(owner = owner_id, "closed onboarding session");
        }
        closed
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    // Sessions still referenced by a request or a background upload stay open.
    fn close_idle(&self, sessions: &mut HashMap<String, OpenSession<S>>) {
        let before = sessions.len();
        sessions.retain(|_, open| {
            open.last_seen.elapsed() < self.idle_timeout
                || Arc::strong_count(&open.handle.session) > 1
        });
        let closed = before - sessions.len();
        if closed > 0 {
            debug!(closed, "closed idle onboarding sessions");
        }
    }
}

/// Snapshot returned by every wizard endpoint.
#[derive(Debug, Serialize)]
pub struct WizardView {
    pub owner_id: String,
    pub step: u8,
    pub section: &'static str,
    pub submitting: bool,
    pub draft: Draft,
    pub errors: Vec<ValidationReport>,
    pub notifications: Vec<Notification>,
}

async fn wizard_view<S>(handle: &SessionHandle<S>) -> WizardView
where
    S: PersistenceStore + 'static,
{
    let controller = handle.session.lock().await;
    WizardView {
        owner_id: controller.settings().owner_id.clone(),
        step: controller.step().number(),
        section: controller.step().label(),
        submitting: controller.is_submitting(),
        draft: controller.draft().clone(),
        errors: controller.all_errors().cloned().collect(),
        notifications: handle.notifications.drain(),
    }
}

/// Router exposing the wizard over HTTP.
pub fn onboarding_router<S>(registry: Arc<SessionRegistry<S>>) -> Router
where
    S: PersistenceStore + 'static,
{
    let body_limit = registry.defaults.upload_policy.max_bytes().saturating_add(64 * 1024);

    Router::new()
        .route("/api/v1/onboarding/:owner_id", get(view_handler::<S>))
        .route(
            "/api/v1/onboarding/:owner_id/sections/:section",
            put(update_section_handler::<S>),
        )
        .route("/api/v1/onboarding/:owner_id/next", post(next_handler::<S>))
        .route(
            "/api/v1/onboarding/:owner_id/previous",
            post(previous_handler::<S>),
        )
        .route(
            "/api/v1/onboarding/:owner_id/documents/:slot",
            put(upload_handler::<S>),
        )
        .route("/api/v1/onboarding/:owner_id/submit", post(submit_handler::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(registry)
}

fn valid_owner(owner_id: &str) -> bool {
    !owner_id.is_empty()
        && owner_id.len() <= 64
        && owner_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, axum::Json(payload)).into_response()
}

fn invalid_owner(owner_id: &str) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        format!("invalid owner id `{owner_id}`"),
    )
}

pub(crate) async fn view_handler<S>(
    State(registry): State<Arc<SessionRegistry<S>>>,
    Path(owner_id): Path<String>,
) -> Response
where
    S: PersistenceStore + 'static,
{
    if !valid_owner(&owner_id) {
        return invalid_owner(&owner_id);
    }
    let handle = registry.session(&owner_id).await;
    (StatusCode::OK, axum::Json(wizard_view(&handle).await)).into_response()
}

pub(crate) async fn update_section_handler<S>(
    State(registry): State<Arc<SessionRegistry<S>>>,
    Path((owner_id, section)): Path<(String, String)>,
    axum::Json(body): axum::Json<Value>,
) -> Response
where
    S: PersistenceStore + 'static,
{
    if !valid_owner(&owner_id) {
        return invalid_owner(&owner_id);
    }
    let Some(step) = WizardStep::from_label(&section.replace('-', "_")) else {
        return error_response(StatusCode::NOT_FOUND, format!("unknown section `{section}`"));
    };

    let handle = registry.session(&owner_id).await;
    {
        let mut controller = handle.session.lock().await;
        let applied = match step {
            WizardStep::PersonalDetails => serde_json::from_value::<PersonalDetails>(body)
                .map(|incoming| controller.update_personal_details(|current| *current = incoming)),
            WizardStep::Qualification => serde_json::from_value::<Qualification>(body)
                .map(|incoming| controller.update_qualification(|current| *current = incoming)),
            WizardStep::About => serde_json::from_value::<About>(body)
                .map(|incoming| controller.update_about(|current| *current = incoming)),
            WizardStep::References => serde_json::from_value::<Vec<Reference>>(body)
                .map(|incoming| controller.update_references(|current| *current = incoming)),
            WizardStep::Identification => serde_json::from_value::<Identification>(body)
                .map(|incoming| controller.update_identification(|current| *current = incoming)),
        };
        if let Err(err) = applied {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("malformed {} section: {err}", step.label()),
            );
        }
    }

    (StatusCode::OK, axum::Json(wizard_view(&handle).await)).into_response()
}

pub(crate) async fn next_handler<S>(
    State(registry): State<Arc<SessionRegistry<S>>>,
    Path(owner_id): Path<String>,
) -> Response
where
    S: PersistenceStore + 'static,
{
    if !valid_owner(&owner_id) {
        return invalid_owner(&owner_id);
    }
    let handle = registry.session(&owner_id).await;
    let outcome = handle.session.lock().await.next();

    match outcome {
        Ok(transition) => {
            let status = if transition.accepted {
                StatusCode::OK
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            let view = wizard_view(&handle).await;
            let payload = json!({ "transition": transition, "wizard": view });
            (status, axum::Json(payload)).into_response()
        }
        Err(NavigationError::SubmitRequired) => {
            error_response(StatusCode::CONFLICT, NavigationError::SubmitRequired.to_string())
        }
        Err(other) => error_response(StatusCode::BAD_REQUEST, other.to_string()),
    }
}

pub(crate) async fn previous_handler<S>(
    State(registry): State<Arc<SessionRegistry<S>>>,
    Path(owner_id): Path<String>,
) -> Response
where
    S: PersistenceStore + 'static,
{
    if !valid_owner(&owner_id) {
        return invalid_owner(&owner_id);
    }
    let handle = registry.session(&owner_id).await;
    let transition = handle.session.lock().await.previous();
    let view = wizard_view(&handle).await;
    (
        StatusCode::OK,
        axum::Json(json!({ "transition": transition, "wizard": view })),
    )
        .into_response()
}

pub(crate) async fn upload_handler<S>(
    State(registry): State<Arc<SessionRegistry<S>>>,
    Path((owner_id, slot)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: PersistenceStore + 'static,
{
    if !valid_owner(&owner_id) {
        return invalid_owner(&owner_id);
    }
    let Some(slot) = DocumentSlot::from_key(&slot) else {
        return error_response(StatusCode::NOT_FOUND, format!("unknown document `{slot}`"));
    };
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
    else {
        return error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "a Content-Type header is required",
        );
    };
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| slot.key().to_string());

    let handle = registry.session(&owner_id).await;
    let file = LocalFile::new(file_name, content_type, body.to_vec());

    match handle.session.upload_document(slot, file).await {
        Ok(resolution) => {
            let status = match &resolution {
                UploadResolution::Committed { .. } => StatusCode::OK,
                UploadResolution::Failed { .. } => StatusCode::BAD_GATEWAY,
                UploadResolution::Stale { .. } => StatusCode::CONFLICT,
            };
            let state: DocumentState = handle.session.lock().await.document(slot).clone();
            let payload = json!({
                "slot": slot.key(),
                "state": state,
                "notifications": handle.notifications.drain(),
            });
            (status, axum::Json(payload)).into_response()
        }
        Err(rejected) => {
            let status = match rejected {
                UploadRejected::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                UploadRejected::UnsupportedType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                UploadRejected::EmptyFile { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            };
            let payload = json!({
                "error": rejected.to_string(),
                "notifications": handle.notifications.drain(),
            });
            (status, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn submit_handler<S>(
    State(registry): State<Arc<SessionRegistry<S>>>,
    Path(owner_id): Path<String>,
) -> Response
where
    S: PersistenceStore + 'static,
{
    if !valid_owner(&owner_id) {
        return invalid_owner(&owner_id);
    }
    let handle = registry.session(&owner_id).await;

    match handle.session.submit().await {
        Ok(ack) => {
            let payload = json!({
                "status": "submitted",
                "reference": ack.reference,
                "notifications": handle.notifications.drain(),
            });
            registry.close(&owner_id).await;
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(SubmitError::Invalid { reports }) => {
            let payload = json!({
                "error": "application is incomplete",
                "errors": reports,
                "notifications": handle.notifications.drain(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(err @ (SubmitError::NotOnFinalStep { .. } | SubmitError::AlreadySubmitting)) => {
            error_response(StatusCode::CONFLICT, err.to_string())
        }
        Err(SubmitError::Transform(err)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        Err(SubmitError::Service(err)) => {
            let payload = json!({
                "error": err.to_string(),
                "notifications": handle.notifications.drain(),
            });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
    }
}
