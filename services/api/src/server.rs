use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_vaccination_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use univac::config::AppConfig;
use univac::error::AppError;
use univac::telemetry;
use univac::vaccination::{AlertPolicy, InMemoryAuditLog, InMemoryStore, VaccinationService};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let alert_policy = AlertPolicy::from(&config.rules);
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        alert_policy,
    };

    let store = Arc::new(InMemoryStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let service = Arc::new(
        VaccinationService::new(store, audit, alert_policy)
            .with_audit_page_size(config.rules.audit_page_size),
    );

    let app = with_vaccination_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        low_stock_threshold = alert_policy.low_stock_threshold,
        expiry_window_days = alert_policy.expiry_window_days,
        "univac vaccination service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
