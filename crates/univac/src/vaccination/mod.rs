//! Vaccination management: roster compliance, scheduling, stock alerts and the audit trail.
//!
//! Evaluators (`compliance`, `scheduling`, `alerts`) are pure functions over snapshots handed
//! to them by the service layer; storage sits behind the traits in `repository`.

pub mod alerts;
pub mod audit;
pub mod compliance;
pub mod domain;
pub mod intake;
pub mod memory;
pub mod report;
pub mod repository;
pub mod router;
pub mod scheduling;
pub mod service;

#[cfg(test)]
mod tests;

pub use alerts::{evaluate_alerts, Alert, AlertEngine, AlertKind, AlertPolicy, AlertSeverity};
pub use audit::AuditLogWriter;
pub use compliance::{compliance_rate, evaluate_compliance, ComplianceStatus, MissingVaccine};
pub use domain::{
    Actor, ApplicationId, Appointment, AppointmentId, AppointmentStatus, AuditEntryId,
    AuditLogEntry, Employee, EmployeeId, EmployeeRecord, EmployeeUpdate, Lot, LotId,
    NewApplication, NewAppointment, NewAuditEntry, NewEmployee, NewLot, NewVaccineType,
    ProfileUpdate, Role, VaccineApplication, VaccineType, VaccineTypeId, VaccineTypeUpdate,
};
pub use intake::{AppointmentRequest, ApplicationRequest, ValidationError};
pub use memory::{InMemoryAuditLog, InMemoryStore};
pub use report::{DashboardSummary, PendencyRow};
pub use repository::{
    ApplicationRepository, AppointmentRepository, AuditRepository, EmployeeRepository,
    RepositoryError, VaccinationStore, VaccineRepository,
};
pub use router::vaccination_router;
pub use scheduling::{has_conflict, ScheduleConflict};
pub use service::{
    ComplianceEntry, EmployeeRecordView, IntegrityViolation, RemovalOutcome, ServiceError,
    VaccinationService,
};
