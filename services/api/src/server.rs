use crate::cli::ServeArgs;
use crate::infra::{
    wizard_defaults, AppState, LocalDirectoryUploader, LoggingNavigator, OutboxSubmissionService,
};
use crate::routes::with_onboarding_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use onboarding_wizard::config::AppConfig;
use onboarding_wizard::error::AppError;
use onboarding_wizard::telemetry;
use onboarding_wizard::workflows::onboarding::{FileStore, SessionRegistry};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let addr = config.server.socket_addr()?;
    let storage = &config.storage;
    let registry = SessionRegistry::new(
        Arc::new(FileStore::new(storage.drafts_dir())),
        Arc::new(LocalDirectoryUploader::new(
            storage.uploads_dir(),
            format!("http://{addr}/files"),
        )),
        Arc::new(OutboxSubmissionService::new(storage.outbox_dir())),
        Arc::new(LoggingNavigator::new(config.wizard.redirect_to.clone())),
        wizard_defaults(&config),
    )
    .with_idle_timeout(config.wizard.session_idle_timeout);
    let registry = Arc::new(registry);

    let app = with_onboarding_routes(registry, storage.uploads_dir())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_dir = %storage.data_dir.display(),
        "onboarding wizard ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
