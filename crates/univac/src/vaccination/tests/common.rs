use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::vaccination::alerts::AlertPolicy;
use crate::vaccination::domain::{
    Actor, Appointment, AppointmentId, AppointmentStatus, AuditLogEntry, Employee, EmployeeId,
    Lot, LotId, NewApplication, NewAppointment, NewAuditEntry, NewEmployee, NewLot,
    NewVaccineType, Role, VaccineApplication, VaccineType, VaccineTypeId,
};
use crate::vaccination::memory::{InMemoryAuditLog, InMemoryStore};
use crate::vaccination::repository::{
    ApplicationRepository, AppointmentRepository, AuditRepository, EmployeeRepository,
    RepositoryError, VaccineRepository,
};
use crate::vaccination::service::VaccinationService;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).expect("valid date")
}

pub(super) fn at(hour: u32, minute: u32) -> NaiveDateTime {
    today().and_hms_opt(hour, minute, 0).expect("valid time")
}

pub(super) fn admin() -> Actor {
    Actor::admin("Coordenação")
}

pub(super) fn staff(employee_id: Option<EmployeeId>) -> Actor {
    Actor::staff("Enfermagem", employee_id)
}

pub(super) fn employee(id: u64, name: &str) -> Employee {
    Employee {
        id: EmployeeId(id),
        name: name.to_string(),
        email: format!("{}@univac.test", name.to_ascii_lowercase().replace(' ', ".")),
        national_id: format!("000.000.000-{id:02}"),
        registration_number: format!("R-{id:04}"),
        role: Role::Staff,
        active: true,
    }
}

pub(super) fn new_employee(name: &str, registration: &str) -> NewEmployee {
    NewEmployee {
        name: name.to_string(),
        email: format!("{}@univac.test", registration.to_ascii_lowercase()),
        national_id: format!("{registration}-CPF"),
        registration_number: registration.to_string(),
        role: Role::Staff,
    }
}

pub(super) fn vaccine(id: u64, name: &str, mandatory: bool) -> VaccineType {
    VaccineType {
        id: VaccineTypeId(id),
        name: name.to_string(),
        description: String::new(),
        mandatory,
        lots: Vec::new(),
    }
}

pub(super) fn lot(id: u64, vaccine: u64, quantity: u32, expires_in_days: i64) -> Lot {
    Lot {
        id: LotId(id),
        vaccine_type_id: VaccineTypeId(vaccine),
        code: format!("LOT-{id:03}"),
        quantity,
        expiry_date: today() + Duration::days(expires_in_days),
    }
}

pub(super) fn appointment(
    id: u64,
    employee: u64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Appointment {
    Appointment {
        id: AppointmentId(id),
        employee_id: EmployeeId(employee),
        vaccine_type_id: VaccineTypeId(1),
        start,
        end,
        status: AppointmentStatus::Scheduled,
    }
}

pub(super) type MemoryService = VaccinationService<InMemoryStore, InMemoryAuditLog>;

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryStore>, Arc<InMemoryAuditLog>) {
    let store = Arc::new(InMemoryStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let service = VaccinationService::new(store.clone(), audit.clone(), AlertPolicy::default());
    (service, store, audit)
}

/// Seeded roster: two employees, mandatory Hepatitis B and Tetanus, optional Flu.
pub(super) struct Seeded {
    pub(super) ana: Employee,
    pub(super) bruno: Employee,
    pub(super) hepatitis: VaccineType,
    pub(super) tetanus: VaccineType,
    pub(super) flu: VaccineType,
}

pub(super) fn seed(service: &MemoryService) -> Seeded {
    let actor = admin();
    let ana = service
        .register_employee(&actor, new_employee("Ana Souza", "R-0001"))
        .expect("ana registered");
    let bruno = service
        .register_employee(&actor, new_employee("Bruno Lima", "R-0002"))
        .expect("bruno registered");

    let hepatitis = service
        .create_vaccine(
            &actor,
            NewVaccineType {
                name: "Hepatitis B".to_string(),
                description: "Three-dose series".to_string(),
                mandatory: true,
            },
        )
        .expect("hepatitis created");
    let tetanus = service
        .create_vaccine(
            &actor,
            NewVaccineType {
                name: "Tetanus".to_string(),
                description: String::new(),
                mandatory: true,
            },
        )
        .expect("tetanus created");
    let flu = service
        .create_vaccine(
            &actor,
            NewVaccineType {
                name: "Flu".to_string(),
                description: String::new(),
                mandatory: false,
            },
        )
        .expect("flu created");

    service
        .add_lot(
            &actor,
            hepatitis.id,
            NewLot {
                code: "HB-2026".to_string(),
                quantity: 120,
                expiry_date: today() + Duration::days(200),
            },
        )
        .expect("lot added");

    Seeded {
        ana,
        bruno,
        hepatitis,
        tetanus,
        flu,
    }
}

/// Audit store that always fails, for checking that audit writes never fail an action.
#[derive(Default)]
pub(super) struct UnavailableAuditLog;

impl AuditRepository for UnavailableAuditLog {
    fn append(&self, _entry: NewAuditEntry) -> Result<AuditLogEntry, RepositoryError> {
        Err(RepositoryError::Unavailable("audit database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("audit database offline".to_string()))
    }
}

/// Store whose employees disappear right after they are looked up, as if an administrator
/// deleted them between the service's existence check and its write.
#[derive(Default)]
pub(super) struct VanishingEmployeeStore {
    pub(super) inner: InMemoryStore,
}

impl EmployeeRepository for VanishingEmployeeStore {
    fn insert_employee(&self, employee: NewEmployee) -> Result<Employee, RepositoryError> {
        self.inner.insert_employee(employee)
    }

    fn update_employee(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        self.inner.update_employee(employee)
    }

    fn fetch_employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let found = self.inner.fetch_employee(id)?;
        if found.is_some() {
            self.inner.delete_employee(id)?;
        }
        Ok(found)
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.inner.list_employees()
    }

    fn delete_employee(&self, id: EmployeeId) -> Result<(), RepositoryError> {
        self.inner.delete_employee(id)
    }
}

impl VaccineRepository for VanishingEmployeeStore {
    fn insert_vaccine(&self, vaccine: NewVaccineType) -> Result<VaccineType, RepositoryError> {
        self.inner.insert_vaccine(vaccine)
    }

    fn update_vaccine(&self, vaccine: VaccineType) -> Result<VaccineType, RepositoryError> {
        self.inner.update_vaccine(vaccine)
    }

    fn fetch_vaccine(&self, id: VaccineTypeId) -> Result<Option<VaccineType>, RepositoryError> {
        self.inner.fetch_vaccine(id)
    }

    fn list_vaccines(&self) -> Result<Vec<VaccineType>, RepositoryError> {
        self.inner.list_vaccines()
    }

    fn delete_vaccine(&self, id: VaccineTypeId) -> Result<(), RepositoryError> {
        self.inner.delete_vaccine(id)
    }

    fn insert_lot(&self, vaccine: VaccineTypeId, lot: NewLot) -> Result<Lot, RepositoryError> {
        self.inner.insert_lot(vaccine, lot)
    }

    fn set_lot_quantity(&self, id: LotId, quantity: u32) -> Result<Lot, RepositoryError> {
        self.inner.set_lot_quantity(id, quantity)
    }

    fn delete_lot(&self, id: LotId) -> Result<(), RepositoryError> {
        self.inner.delete_lot(id)
    }
}

impl ApplicationRepository for VanishingEmployeeStore {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<VaccineApplication, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn list_applications(&self) -> Result<Vec<VaccineApplication>, RepositoryError> {
        self.inner.list_applications()
    }

    fn applications_for_employee(
        &self,
        id: EmployeeId,
    ) -> Result<Vec<VaccineApplication>, RepositoryError> {
        self.inner.applications_for_employee(id)
    }
}

impl AppointmentRepository for VanishingEmployeeStore {
    fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        self.inner.insert_appointment(appointment)
    }

    fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, RepositoryError> {
        self.inner.update_appointment(appointment)
    }

    fn fetch_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        self.inner.fetch_appointment(id)
    }

    fn list_appointments(&self) -> Result<Vec<Appointment>, RepositoryError> {
        self.inner.list_appointments()
    }

    fn delete_appointment(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        self.inner.delete_appointment(id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

pub(super) async fn assert_conflict_response(response: Response, kind: &str) {
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], kind);
}
