use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    Actor, AppointmentId, EmployeeId, EmployeeUpdate, LotId, NewEmployee, NewLot, NewVaccineType,
    ProfileUpdate, Role, VaccineTypeId, VaccineTypeUpdate,
};
use super::intake::{AppointmentRequest, AppointmentUpdate, ApplicationRequest};
use super::repository::{AuditRepository, VaccinationStore};
use super::service::{ServiceError, VaccinationService};

pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_EMPLOYEE_HEADER: &str = "x-actor-employee-id";

type SharedService<S, A> = Arc<VaccinationService<S, A>>;

/// Router builder exposing the roster, catalog, scheduling and reporting endpoints.
pub fn vaccination_router<S, A>(service: SharedService<S, A>) -> Router
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/employees",
            get(list_employees_handler::<S, A>).post(register_employee_handler::<S, A>),
        )
        .route(
            "/api/v1/employees/:employee_id",
            get(employee_record_handler::<S, A>)
                .put(update_employee_handler::<S, A>)
                .delete(remove_employee_handler::<S, A>),
        )
        .route(
            "/api/v1/employees/:employee_id/profile",
            put(update_profile_handler::<S, A>),
        )
        .route(
            "/api/v1/vaccines",
            get(list_vaccines_handler::<S, A>).post(create_vaccine_handler::<S, A>),
        )
        .route(
            "/api/v1/vaccines/:vaccine_id",
            put(update_vaccine_handler::<S, A>).delete(delete_vaccine_handler::<S, A>),
        )
        .route(
            "/api/v1/vaccines/:vaccine_id/lots",
            post(add_lot_handler::<S, A>),
        )
        .route(
            "/api/v1/lots/:lot_id",
            put(set_lot_quantity_handler::<S, A>).delete(remove_lot_handler::<S, A>),
        )
        .route(
            "/api/v1/applications",
            get(list_applications_handler::<S, A>).post(record_application_handler::<S, A>),
        )
        .route(
            "/api/v1/appointments",
            get(list_appointments_handler::<S, A>).post(schedule_appointment_handler::<S, A>),
        )
        .route(
            "/api/v1/appointments/availability",
            post(availability_handler::<S, A>),
        )
        .route(
            "/api/v1/appointments/:appointment_id",
            put(update_appointment_handler::<S, A>).delete(cancel_appointment_handler::<S, A>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<S, A>))
        .route("/api/v1/alerts", get(alerts_handler::<S, A>))
        .route(
            "/api/v1/reports/pendency.csv",
            get(pendency_csv_handler::<S, A>),
        )
        .route("/api/v1/audit", get(audit_handler::<S, A>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DateQuery {
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

impl DateQuery {
    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuditQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotQuantityUpdate {
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    #[serde(flatten)]
    pub slot: AppointmentRequest,
    #[serde(default)]
    pub exclude_appointment_id: Option<AppointmentId>,
}

/// Read the acting identity asserted by the upstream session layer.
///
/// Values are decoded as UTF-8, so accented names pass through unchanged.
pub fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let name = text(ACTOR_NAME_HEADER)?.to_string();
    let role = Role::parse(text(ACTOR_ROLE_HEADER)?)?;
    let employee_id = text(ACTOR_EMPLOYEE_HEADER)
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(EmployeeId);

    Some(Actor {
        name,
        role,
        employee_id,
    })
}

fn unauthenticated() -> Response {
    let payload = json!({
        "kind": "unauthenticated",
        "error": "request carries no acting identity",
    });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

pub(crate) fn error_response(error: ServiceError) -> Response {
    let status = match &error {
        ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Conflict(_) | ServiceError::Integrity(_) | ServiceError::Duplicate { .. } => {
            StatusCode::CONFLICT
        }
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Export(_) | ServiceError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "kind": error.kind(),
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

macro_rules! actor_or_reject {
    ($headers:expr) => {
        match actor_from_headers(&$headers) {
            Some(actor) => actor,
            None => return unauthenticated(),
        }
    };
}

pub(crate) async fn list_employees_handler<S, A>(
    State(service): State<SharedService<S, A>>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    respond(StatusCode::OK, service.list_employees())
}

pub(crate) async fn register_employee_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    headers: HeaderMap,
    Json(employee): Json<NewEmployee>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::CREATED,
        service.register_employee(&actor, employee),
    )
}

pub(crate) async fn employee_record_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(employee_id): Path<u64>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.employee_record(EmployeeId(employee_id)),
    )
}

pub(crate) async fn update_employee_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(employee_id): Path<u64>,
    headers: HeaderMap,
    Json(update): Json<EmployeeUpdate>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.update_employee(&actor, EmployeeId(employee_id), update),
    )
}

pub(crate) async fn update_profile_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(employee_id): Path<u64>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.update_profile(&actor, EmployeeId(employee_id), update),
    )
}

pub(crate) async fn remove_employee_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(employee_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    let result = service
        .remove_employee(&actor, EmployeeId(employee_id))
        .map(|outcome| json!({ "employee_id": employee_id, "outcome": outcome }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_vaccines_handler<S, A>(
    State(service): State<SharedService<S, A>>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    respond(StatusCode::OK, service.list_vaccines())
}

pub(crate) async fn create_vaccine_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    headers: HeaderMap,
    Json(vaccine): Json<NewVaccineType>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(StatusCode::CREATED, service.create_vaccine(&actor, vaccine))
}

pub(crate) async fn update_vaccine_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(vaccine_id): Path<u64>,
    headers: HeaderMap,
    Json(update): Json<VaccineTypeUpdate>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.update_vaccine(&actor, VaccineTypeId(vaccine_id), update),
    )
}

pub(crate) async fn delete_vaccine_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(vaccine_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    match service.delete_vaccine(&actor, VaccineTypeId(vaccine_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_lot_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(vaccine_id): Path<u64>,
    headers: HeaderMap,
    Json(lot): Json<NewLot>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::CREATED,
        service.add_lot(&actor, VaccineTypeId(vaccine_id), lot),
    )
}

pub(crate) async fn set_lot_quantity_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(lot_id): Path<u64>,
    headers: HeaderMap,
    Json(update): Json<LotQuantityUpdate>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.set_lot_quantity(&actor, LotId(lot_id), update.quantity),
    )
}

pub(crate) async fn remove_lot_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(lot_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    match service.remove_lot(&actor, LotId(lot_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_applications_handler<S, A>(
    State(service): State<SharedService<S, A>>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    respond(StatusCode::OK, service.list_applications())
}

pub(crate) async fn record_application_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    headers: HeaderMap,
    Json(request): Json<ApplicationRequest>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    let today = Local::now().date_naive();
    respond(
        StatusCode::CREATED,
        service.record_application(&actor, request, today),
    )
}

pub(crate) async fn list_appointments_handler<S, A>(
    State(service): State<SharedService<S, A>>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    respond(StatusCode::OK, service.list_appointments())
}

pub(crate) async fn schedule_appointment_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    headers: HeaderMap,
    Json(request): Json<AppointmentRequest>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::CREATED,
        service.schedule_appointment(&actor, request),
    )
}

pub(crate) async fn update_appointment_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(appointment_id): Path<u64>,
    headers: HeaderMap,
    Json(update): Json<AppointmentUpdate>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.update_appointment(&actor, AppointmentId(appointment_id), update),
    )
}

pub(crate) async fn cancel_appointment_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Path(appointment_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    match service.cancel_appointment(&actor, AppointmentId(appointment_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn availability_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Json(request): Json<AvailabilityRequest>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let result = service
        .check_availability(&request.slot, request.exclude_appointment_id)
        .map(|available| json!({ "available": available }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn dashboard_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Query(query): Query<DateQuery>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    respond(StatusCode::OK, service.dashboard(query.today()))
}

pub(crate) async fn alerts_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    Query(query): Query<DateQuery>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    respond(StatusCode::OK, service.alerts(query.today()))
}

pub(crate) async fn pendency_csv_handler<S, A>(
    State(service): State<SharedService<S, A>>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    match service.pendency_csv() {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"pendencias.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn audit_handler<S, A>(
    State(service): State<SharedService<S, A>>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> Response
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(StatusCode::OK, service.audit_log(&actor, query.limit))
}
