use super::domain::{
    Appointment, AppointmentId, AuditLogEntry, Employee, EmployeeId, Lot, LotId, NewApplication,
    NewAppointment, NewAuditEntry, NewEmployee, NewLot, NewVaccineType, VaccineApplication,
    VaccineType, VaccineTypeId,
};
use super::scheduling::ScheduleConflict;

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("referenced {resource} {id} does not exist")]
    MissingReference { resource: &'static str, id: u64 },
    #[error("a record with the same {field} already exists")]
    Duplicate { field: &'static str },
    #[error("record is still referenced by {count} {dependents}")]
    Referenced {
        dependents: &'static str,
        count: usize,
    },
    #[error(transparent)]
    Overlap(#[from] ScheduleConflict),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Roster storage. Deleting an employee with vaccination history must fail with
/// [`RepositoryError::Referenced`].
pub trait EmployeeRepository: Send + Sync {
    fn insert_employee(&self, employee: NewEmployee) -> Result<Employee, RepositoryError>;
    fn update_employee(&self, employee: Employee) -> Result<Employee, RepositoryError>;
    fn fetch_employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError>;
    fn delete_employee(&self, id: EmployeeId) -> Result<(), RepositoryError>;
}

/// Catalog and stock storage. Vaccine types are returned with their lots attached.
pub trait VaccineRepository: Send + Sync {
    fn insert_vaccine(&self, vaccine: NewVaccineType) -> Result<VaccineType, RepositoryError>;
    fn update_vaccine(&self, vaccine: VaccineType) -> Result<VaccineType, RepositoryError>;
    fn fetch_vaccine(&self, id: VaccineTypeId) -> Result<Option<VaccineType>, RepositoryError>;
    fn list_vaccines(&self) -> Result<Vec<VaccineType>, RepositoryError>;
    fn delete_vaccine(&self, id: VaccineTypeId) -> Result<(), RepositoryError>;
    fn insert_lot(&self, vaccine: VaccineTypeId, lot: NewLot) -> Result<Lot, RepositoryError>;
    fn set_lot_quantity(&self, id: LotId, quantity: u32) -> Result<Lot, RepositoryError>;
    fn delete_lot(&self, id: LotId) -> Result<(), RepositoryError>;
}

/// Append-only vaccination history. Inserts verify the employee and vaccine type still
/// exist in the same atomic step, failing with [`RepositoryError::MissingReference`].
pub trait ApplicationRepository: Send + Sync {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<VaccineApplication, RepositoryError>;
    fn list_applications(&self) -> Result<Vec<VaccineApplication>, RepositoryError>;
    fn applications_for_employee(
        &self,
        id: EmployeeId,
    ) -> Result<Vec<VaccineApplication>, RepositoryError>;
}

/// Appointment storage. Inserts and updates are conditional writes: the overlap check
/// and the write happen atomically, rejecting double bookings with
/// [`RepositoryError::Overlap`] and dangling references with
/// [`RepositoryError::MissingReference`].
pub trait AppointmentRepository: Send + Sync {
    fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError>;
    fn update_appointment(&self, appointment: Appointment)
        -> Result<Appointment, RepositoryError>;
    fn fetch_appointment(&self, id: AppointmentId)
        -> Result<Option<Appointment>, RepositoryError>;
    fn list_appointments(&self) -> Result<Vec<Appointment>, RepositoryError>;
    fn delete_appointment(&self, id: AppointmentId) -> Result<(), RepositoryError>;
}

/// Append-only audit storage.
pub trait AuditRepository: Send + Sync {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, RepositoryError>;
    /// Most recent entries first.
    fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, RepositoryError>;
}

/// Everything the vaccination service needs from its primary store.
pub trait VaccinationStore:
    EmployeeRepository + VaccineRepository + ApplicationRepository + AppointmentRepository
{
}

impl<T> VaccinationStore for T where
    T: EmployeeRepository + VaccineRepository + ApplicationRepository + AppointmentRepository
{
}
