use crate::infra::{deserialize_optional_date, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use univac::error::AppError;
use univac::snapshot::Snapshot;
use univac::vaccination::{
    vaccination_router, Alert, AuditRepository, PendencyRow, VaccinationService, VaccinationStore,
};

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotReportRequest {
    pub(crate) snapshot: Snapshot,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) include_csv: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SnapshotReportResponse {
    pub(crate) today: NaiveDate,
    pub(crate) active_employees: usize,
    pub(crate) pendency: Vec<PendencyRow>,
    pub(crate) alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) pendency_csv: Option<String>,
}

pub(crate) fn with_vaccination_routes<S, A>(
    service: Arc<VaccinationService<S, A>>,
) -> axum::Router
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    vaccination_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/reports/snapshot",
            axum::routing::post(snapshot_report_endpoint),
        )
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

/// Evaluate an uploaded snapshot without touching the live store.
pub(crate) async fn snapshot_report_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<SnapshotReportRequest>,
) -> Result<Json<SnapshotReportResponse>, AppError> {
    let SnapshotReportRequest {
        snapshot,
        today,
        include_csv,
    } = payload;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let pendency_csv = if include_csv {
        Some(snapshot.pendency_csv()?)
    } else {
        None
    };

    Ok(Json(SnapshotReportResponse {
        today,
        active_employees: snapshot.records().len(),
        pendency: snapshot.pendency(),
        alerts: snapshot.alerts(today, state.alert_policy),
        pendency_csv,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;
    use univac::vaccination::{AlertPolicy, InMemoryAuditLog, InMemoryStore};

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            alert_policy: AlertPolicy::default(),
        }
    }

    fn sample_snapshot() -> Snapshot {
        serde_json::from_value(json!({
            "employees": [
                {"id": 1, "name": "Ana Souza", "email": "ana@univac.test", "national_id": "111",
                 "registration_number": "R-0001", "role": "STAFF", "active": true}
            ],
            "vaccines": [
                {"id": 10, "name": "Hepatite B", "mandatory": true,
                 "lots": [{"id": 100, "vaccine_type_id": 10, "code": "HB-1", "quantity": 40,
                           "expiry_date": "2026-10-25"}]}
            ],
            "appointments": [
                {"id": 5, "employee_id": 1, "vaccine_type_id": 10,
                 "start": "2026-10-15T09:00:00", "end": "2026-10-15T09:30:00",
                 "status": "Scheduled"}
            ]
        }))
        .expect("snapshot fixture parses")
    }

    #[tokio::test]
    async fn snapshot_report_evaluates_rules() {
        let request = SnapshotReportRequest {
            snapshot: sample_snapshot(),
            today: NaiveDate::from_ymd_opt(2026, 10, 15),
            include_csv: true,
        };

        let Json(body) = snapshot_report_endpoint(Extension(state(true)), Json(request))
            .await
            .expect("report builds");

        assert_eq!(body.active_employees, 1);
        assert_eq!(body.pendency.len(), 1);
        let ids: Vec<&str> = body.alerts.iter().map(|alert| alert.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["low-stock-10", "lot-expiring-100", "appointments-today"]
        );
        let csv = body.pendency_csv.expect("csv requested");
        assert!(csv.starts_with("Nome,Email,Registro,Status,Vacinas Pendentes\n"));
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let app = axum::Router::new()
            .route("/ready", axum::routing::get(readiness_endpoint))
            .layer(Extension(state(false)));

        let response = app
            .oneshot(
                Request::get("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn health_and_api_routes_share_one_router() {
        let service = Arc::new(VaccinationService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryAuditLog::new()),
            AlertPolicy::default(),
        ));
        let app = with_vaccination_routes(service).layer(Extension(state(true)));

        let health = app
            .clone()
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(health.status(), StatusCode::OK);

        let employees = app
            .oneshot(
                Request::get("/api/v1/employees")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(employees.status(), StatusCode::OK);
    }
}
