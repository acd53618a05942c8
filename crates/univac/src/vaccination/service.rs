use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::alerts::{Alert, AlertEngine, AlertPolicy};
use super::audit::AuditLogWriter;
use super::compliance::{evaluate_record, mandatory_vaccines, ComplianceStatus};
use super::domain::{
    Actor, Appointment, AppointmentId, AppointmentStatus, AuditLogEntry, Employee, EmployeeId,
    EmployeeRecord, EmployeeUpdate, Lot, LotId, NewEmployee, NewLot, NewVaccineType,
    ProfileUpdate, VaccineApplication, VaccineType, VaccineTypeId, VaccineTypeUpdate,
};
use super::intake::{
    require_email, require_text, validate_employee, validate_lot, validate_vaccine,
    AppointmentRequest, AppointmentUpdate, ApplicationRequest, ValidationError,
};
use super::report::{
    pendency_rows, todays_scheduled_appointments, write_pendency_csv, DashboardSummary,
    PendencyRow,
};
use super::repository::{AuditRepository, RepositoryError, VaccinationStore};
use super::scheduling::{has_conflict, ScheduleConflict};

pub const DEFAULT_AUDIT_PAGE_SIZE: usize = 50;

/// Audit action names, kept in the vocabulary the audit trail has always used.
pub mod actions {
    pub const CREATE: &str = "CRIACAO";
    pub const EDIT: &str = "EDICAO";
    pub const DELETE: &str = "EXCLUSAO";
    pub const DEACTIVATE: &str = "DESATIVACAO";
    pub const APPLICATION: &str = "APLICACAO";
    pub const SCHEDULE: &str = "AGENDAMENTO";
    pub const CANCEL: &str = "CANCELAMENTO";
    pub const STOCK: &str = "ESTOQUE";
}

/// Deletion refused because dependent records exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("cannot delete {resource} {id}: still referenced by {count} {dependents}")]
pub struct IntegrityViolation {
    pub resource: &'static str,
    pub id: u64,
    pub dependents: &'static str,
    pub count: usize,
}

/// Error raised by the vaccination service. Each kind maps to a distinct response.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] ScheduleConflict),
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: u64 },
    #[error(transparent)]
    Integrity(#[from] IntegrityViolation),
    #[error("a {resource} with the same {field} already exists")]
    Duplicate {
        resource: &'static str,
        field: &'static str,
    },
    #[error("{0} requires administrator access")]
    Forbidden(&'static str),
    #[error("failed to render report: {0}")]
    Export(#[from] csv::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "schedule_conflict",
            Self::NotFound { .. } => "not_found",
            Self::Integrity(_) => "integrity",
            Self::Duplicate { .. } => "duplicate",
            Self::Forbidden(_) => "forbidden",
            Self::Export(_) | Self::Repository(_) => "infrastructure",
        }
    }
}

/// Translate a store failure on a specific record into the service taxonomy.
fn store_error(resource: &'static str, id: u64) -> impl FnOnce(RepositoryError) -> ServiceError {
    move |error| match error {
        RepositoryError::NotFound => ServiceError::NotFound { resource, id },
        RepositoryError::MissingReference {
            resource: referenced,
            id: referenced_id,
        } => ServiceError::NotFound {
            resource: referenced,
            id: referenced_id,
        },
        RepositoryError::Duplicate { field } => ServiceError::Duplicate { resource, field },
        RepositoryError::Referenced { dependents, count } => {
            ServiceError::Integrity(IntegrityViolation {
                resource,
                id,
                dependents,
                count,
            })
        }
        RepositoryError::Overlap(conflict) => ServiceError::Conflict(conflict),
        other => ServiceError::Repository(other),
    }
}

/// What happened to an employee removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    Deleted,
    /// History exists, so the employee was deactivated instead.
    Deactivated,
}

/// Employee, derived vaccine set and compliance, as shown on the employee page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRecordView {
    #[serde(flatten)]
    pub record: EmployeeRecord,
    pub applications: Vec<VaccineApplication>,
    pub compliance: ComplianceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceEntry {
    pub employee_id: EmployeeId,
    pub name: String,
    pub compliance: ComplianceStatus,
}

/// Service composing the store, the audit writer and the rule evaluators.
pub struct VaccinationService<S, A> {
    store: Arc<S>,
    audit: AuditLogWriter<A>,
    alerts: AlertEngine,
    audit_page_size: usize,
}

impl<S, A> VaccinationService<S, A>
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    pub fn new(store: Arc<S>, audit: Arc<A>, policy: AlertPolicy) -> Self {
        Self {
            store,
            audit: AuditLogWriter::new(audit),
            alerts: AlertEngine::new(policy),
            audit_page_size: DEFAULT_AUDIT_PAGE_SIZE,
        }
    }

    pub fn with_audit_page_size(mut self, page_size: usize) -> Self {
        self.audit_page_size = page_size.max(1);
        self
    }

    // Roster

    pub fn list_employees(&self) -> Result<Vec<Employee>, ServiceError> {
        Ok(self.store.list_employees()?)
    }

    pub fn employee_record(&self, id: EmployeeId) -> Result<EmployeeRecordView, ServiceError> {
        let employee = self.fetch_employee(id)?;
        let applications = self.store.applications_for_employee(id)?;
        let catalog = self.store.list_vaccines()?;
        let mandatory = mandatory_vaccines(&catalog);

        let record = EmployeeRecord::derive(employee, &applications);
        let compliance = evaluate_record(&record, &mandatory);

        Ok(EmployeeRecordView {
            record,
            applications,
            compliance,
        })
    }

    pub fn register_employee(
        &self,
        actor: &Actor,
        employee: NewEmployee,
    ) -> Result<Employee, ServiceError> {
        require_admin(actor, "registering employees")?;
        let employee = validate_employee(employee)?;

        let stored = self
            .store
            .insert_employee(employee)
            .map_err(store_error("employee", 0))?;

        info!(employee_id = %stored.id, author = %actor.name, "employee registered");
        self.audit.record(
            actions::CREATE,
            "employee",
            &format!("{} ({})", stored.name, stored.registration_number),
            &actor.name,
        );
        Ok(stored)
    }

    pub fn update_employee(
        &self,
        actor: &Actor,
        id: EmployeeId,
        update: EmployeeUpdate,
    ) -> Result<Employee, ServiceError> {
        require_admin(actor, "editing employees")?;
        let mut employee = self.fetch_employee(id)?;

        if let Some(name) = update.name {
            employee.name = require_text("name", &name)?;
        }
        if let Some(email) = update.email {
            employee.email = require_email(&email)?;
        }
        if let Some(national_id) = update.national_id {
            employee.national_id = require_text("national_id", &national_id)?;
        }
        if let Some(registration_number) = update.registration_number {
            employee.registration_number =
                require_text("registration_number", &registration_number)?;
        }
        if let Some(role) = update.role {
            employee.role = role;
        }
        if let Some(active) = update.active {
            employee.active = active;
        }

        let stored = self
            .store
            .update_employee(employee)
            .map_err(store_error("employee", id.0))?;

        info!(employee_id = %id, author = %actor.name, "employee updated");
        self.audit
            .record(actions::EDIT, "employee", &stored.name, &actor.name);
        Ok(stored)
    }

    /// Self-service edit: an employee may change their own contact details.
    pub fn update_profile(
        &self,
        actor: &Actor,
        id: EmployeeId,
        update: ProfileUpdate,
    ) -> Result<Employee, ServiceError> {
        if !actor.is_admin() && actor.employee_id != Some(id) {
            return Err(ServiceError::Forbidden("editing another employee's profile"));
        }

        let mut employee = self.fetch_employee(id)?;
        if let Some(name) = update.name {
            employee.name = require_text("name", &name)?;
        }
        if let Some(email) = update.email {
            employee.email = require_email(&email)?;
        }

        let stored = self
            .store
            .update_employee(employee)
            .map_err(store_error("employee", id.0))?;

        self.audit
            .record(actions::EDIT, "profile", &stored.name, &actor.name);
        Ok(stored)
    }

    /// Hard-delete an employee, falling back to deactivation when history exists.
    pub fn remove_employee(
        &self,
        actor: &Actor,
        id: EmployeeId,
    ) -> Result<RemovalOutcome, ServiceError> {
        require_admin(actor, "removing employees")?;

        match self.store.delete_employee(id) {
            Ok(()) => {
                info!(employee_id = %id, author = %actor.name, "employee deleted");
                self.audit
                    .record(actions::DELETE, "employee", &id.to_string(), &actor.name);
                Ok(RemovalOutcome::Deleted)
            }
            Err(RepositoryError::Referenced { dependents, count }) => {
                let mut employee = self.fetch_employee(id)?;
                employee.active = false;
                self.store
                    .update_employee(employee)
                    .map_err(store_error("employee", id.0))?;

                info!(
                    employee_id = %id,
                    author = %actor.name,
                    count,
                    dependents,
                    "employee deactivated instead of deleted"
                );
                self.audit.record(
                    actions::DEACTIVATE,
                    "employee",
                    &format!("{id}: {count} {dependents}"),
                    &actor.name,
                );
                Ok(RemovalOutcome::Deactivated)
            }
            Err(error) => Err(store_error("employee", id.0)(error)),
        }
    }

    // Catalog and stock

    pub fn list_vaccines(&self) -> Result<Vec<VaccineType>, ServiceError> {
        Ok(self.store.list_vaccines()?)
    }

    pub fn create_vaccine(
        &self,
        actor: &Actor,
        vaccine: NewVaccineType,
    ) -> Result<VaccineType, ServiceError> {
        require_admin(actor, "creating vaccine types")?;
        let vaccine = validate_vaccine(vaccine)?;

        let stored = self
            .store
            .insert_vaccine(vaccine)
            .map_err(store_error("vaccine type", 0))?;

        info!(vaccine_id = %stored.id, author = %actor.name, "vaccine type created");
        self.audit
            .record(actions::CREATE, "vaccine", &stored.name, &actor.name);
        Ok(stored)
    }

    pub fn update_vaccine(
        &self,
        actor: &Actor,
        id: VaccineTypeId,
        update: VaccineTypeUpdate,
    ) -> Result<VaccineType, ServiceError> {
        require_admin(actor, "editing vaccine types")?;
        let mut vaccine = self.fetch_vaccine(id)?;

        if let Some(name) = update.name {
            vaccine.name = require_text("name", &name)?;
        }
        if let Some(description) = update.description {
            vaccine.description = description.trim().to_string();
        }
        if let Some(mandatory) = update.mandatory {
            vaccine.mandatory = mandatory;
        }

        let stored = self
            .store
            .update_vaccine(vaccine)
            .map_err(store_error("vaccine type", id.0))?;

        self.audit
            .record(actions::EDIT, "vaccine", &stored.name, &actor.name);
        Ok(stored)
    }

    pub fn delete_vaccine(&self, actor: &Actor, id: VaccineTypeId) -> Result<(), ServiceError> {
        require_admin(actor, "deleting vaccine types")?;

        self.store
            .delete_vaccine(id)
            .map_err(store_error("vaccine type", id.0))?;

        info!(vaccine_id = %id, author = %actor.name, "vaccine type deleted");
        self.audit
            .record(actions::DELETE, "vaccine", &id.to_string(), &actor.name);
        Ok(())
    }

    pub fn add_lot(
        &self,
        actor: &Actor,
        vaccine: VaccineTypeId,
        lot: NewLot,
    ) -> Result<Lot, ServiceError> {
        let lot = validate_lot(lot)?;

        let stored = self
            .store
            .insert_lot(vaccine, lot)
            .map_err(store_error("vaccine type", vaccine.0))?;

        self.audit.record(
            actions::STOCK,
            "lot",
            &format!("{} +{} ({})", stored.code, stored.quantity, vaccine),
            &actor.name,
        );
        Ok(stored)
    }

    /// Stock is only ever set explicitly; applications do not consume doses.
    pub fn set_lot_quantity(
        &self,
        actor: &Actor,
        id: LotId,
        quantity: u32,
    ) -> Result<Lot, ServiceError> {
        let stored = self
            .store
            .set_lot_quantity(id, quantity)
            .map_err(store_error("lot", id.0))?;

        self.audit.record(
            actions::STOCK,
            "lot",
            &format!("{} = {}", stored.code, stored.quantity),
            &actor.name,
        );
        Ok(stored)
    }

    pub fn remove_lot(&self, actor: &Actor, id: LotId) -> Result<(), ServiceError> {
        self.store
            .delete_lot(id)
            .map_err(store_error("lot", id.0))?;

        self.audit
            .record(actions::DELETE, "lot", &id.to_string(), &actor.name);
        Ok(())
    }

    // Vaccination history

    pub fn list_applications(&self) -> Result<Vec<VaccineApplication>, ServiceError> {
        Ok(self.store.list_applications()?)
    }

    pub fn record_application(
        &self,
        actor: &Actor,
        request: ApplicationRequest,
        today: NaiveDate,
    ) -> Result<VaccineApplication, ServiceError> {
        let application = request.validate(today)?;
        let employee = self.fetch_employee(application.employee_id)?;
        let vaccine = self.fetch_vaccine(application.vaccine_type_id)?;

        let stored = self
            .store
            .insert_application(application)
            .map_err(store_error("application", 0))?;

        info!(
            application_id = %stored.id,
            employee_id = %employee.id,
            vaccine_id = %vaccine.id,
            "vaccine application recorded"
        );
        self.audit.record(
            actions::APPLICATION,
            "application",
            &format!("{} <- {} (lot {})", employee.name, vaccine.name, stored.lot_code),
            &actor.name,
        );
        Ok(stored)
    }

    // Scheduling

    pub fn list_appointments(&self) -> Result<Vec<Appointment>, ServiceError> {
        Ok(self.store.list_appointments()?)
    }

    pub fn schedule_appointment(
        &self,
        actor: &Actor,
        request: AppointmentRequest,
    ) -> Result<Appointment, ServiceError> {
        let slot = request.validate()?;
        self.fetch_employee(slot.employee_id)?;
        self.fetch_vaccine(slot.vaccine_type_id)?;

        let stored = self.store.insert_appointment(slot).map_err(|error| {
            if let RepositoryError::Overlap(conflict) = &error {
                debug!(employee_id = %conflict.employee_id, "appointment rejected: overlap");
            }
            store_error("appointment", 0)(error)
        })?;

        info!(appointment_id = %stored.id, employee_id = %stored.employee_id, "appointment scheduled");
        self.audit.record(
            actions::SCHEDULE,
            "appointment",
            &format!("{} {} - {}", stored.employee_id, stored.start, stored.end),
            &actor.name,
        );
        Ok(stored)
    }

    /// Move an appointment; absent request fields keep their stored values.
    pub fn reschedule_appointment(
        &self,
        actor: &Actor,
        id: AppointmentId,
        request: AppointmentRequest,
    ) -> Result<Appointment, ServiceError> {
        self.update_appointment(
            actor,
            id,
            AppointmentUpdate {
                slot: request,
                status: None,
            },
        )
    }

    pub fn set_appointment_status(
        &self,
        actor: &Actor,
        id: AppointmentId,
        status: AppointmentStatus,
    ) -> Result<Appointment, ServiceError> {
        self.update_appointment(
            actor,
            id,
            AppointmentUpdate {
                slot: AppointmentRequest::default(),
                status: Some(status),
            },
        )
    }

    /// Apply a slot change and/or a status change as one store write and one audit entry.
    pub fn update_appointment(
        &self,
        actor: &Actor,
        id: AppointmentId,
        update: AppointmentUpdate,
    ) -> Result<Appointment, ServiceError> {
        if update.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }

        let current = self.fetch_appointment(id)?;
        let AppointmentUpdate { slot, status } = update;
        let merged = AppointmentRequest {
            employee_id: slot.employee_id.or(Some(current.employee_id)),
            vaccine_type_id: slot.vaccine_type_id.or(Some(current.vaccine_type_id)),
            start: slot.start.or(Some(current.start)),
            end: slot.end.or(Some(current.end)),
        };
        let slot = merged.validate()?;
        if slot.employee_id != current.employee_id {
            self.fetch_employee(slot.employee_id)?;
        }
        if slot.vaccine_type_id != current.vaccine_type_id {
            self.fetch_vaccine(slot.vaccine_type_id)?;
        }

        let updated = Appointment {
            id,
            employee_id: slot.employee_id,
            vaccine_type_id: slot.vaccine_type_id,
            start: slot.start,
            end: slot.end,
            status: status.unwrap_or(current.status),
        };
        let stored = self
            .store
            .update_appointment(updated)
            .map_err(store_error("appointment", id.0))?;

        self.audit.record(
            actions::EDIT,
            "appointment",
            &format!(
                "{} {} - {} ({})",
                stored.id,
                stored.start,
                stored.end,
                stored.status.label()
            ),
            &actor.name,
        );
        Ok(stored)
    }

    pub fn cancel_appointment(&self, actor: &Actor, id: AppointmentId) -> Result<(), ServiceError> {
        self.store
            .delete_appointment(id)
            .map_err(store_error("appointment", id.0))?;

        info!(appointment_id = %id, author = %actor.name, "appointment cancelled");
        self.audit
            .record(actions::CANCEL, "appointment", &id.to_string(), &actor.name);
        Ok(())
    }

    /// Dry-run of the conflict check; `true` means the slot is free.
    pub fn check_availability(
        &self,
        request: &AppointmentRequest,
        exclude: Option<AppointmentId>,
    ) -> Result<bool, ServiceError> {
        let slot = request.validate()?;
        let existing = self.store.list_appointments()?;

        Ok(!has_conflict(
            &existing,
            slot.employee_id,
            slot.start,
            slot.end,
            exclude,
        ))
    }

    // Reporting

    pub fn compliance_overview(&self) -> Result<Vec<ComplianceEntry>, ServiceError> {
        let (records, catalog) = self.active_records()?;
        let mandatory = mandatory_vaccines(&catalog);

        Ok(records
            .iter()
            .map(|record| ComplianceEntry {
                employee_id: record.employee.id,
                name: record.employee.name.clone(),
                compliance: evaluate_record(record, &mandatory),
            })
            .collect())
    }

    pub fn pendency_report(&self) -> Result<Vec<PendencyRow>, ServiceError> {
        let (records, catalog) = self.active_records()?;
        let mandatory = mandatory_vaccines(&catalog);
        Ok(pendency_rows(&records, &mandatory))
    }

    pub fn pendency_csv(&self) -> Result<String, ServiceError> {
        let rows = self.pendency_report()?;
        Ok(write_pendency_csv(&rows)?)
    }

    pub fn alerts(&self, today: NaiveDate) -> Result<Vec<Alert>, ServiceError> {
        let vaccines = self.store.list_vaccines()?;
        let appointments = self.store.list_appointments()?;
        let todays = todays_scheduled_appointments(&appointments, today);

        Ok(self.alerts.evaluate(&vaccines, today, todays))
    }

    pub fn dashboard(&self, today: NaiveDate) -> Result<DashboardSummary, ServiceError> {
        let (records, catalog) = self.active_records()?;
        let mandatory = mandatory_vaccines(&catalog);
        let statuses: Vec<ComplianceStatus> = records
            .iter()
            .map(|record| evaluate_record(record, &mandatory))
            .collect();

        let total_applications = self.store.list_applications()?.len();
        let appointments = self.store.list_appointments()?;
        let todays = todays_scheduled_appointments(&appointments, today);
        let alerts = self.alerts.evaluate(&catalog, today, todays);

        Ok(DashboardSummary::build(
            today,
            &statuses,
            total_applications,
            todays,
            &catalog,
            &alerts,
        ))
    }

    // Audit

    pub fn audit_log(
        &self,
        actor: &Actor,
        limit: Option<usize>,
    ) -> Result<Vec<AuditLogEntry>, ServiceError> {
        require_admin(actor, "reading the audit log")?;
        let limit = limit.unwrap_or(self.audit_page_size).max(1);
        Ok(self.audit.recent(limit)?)
    }

    fn active_records(&self) -> Result<(Vec<EmployeeRecord>, Vec<VaccineType>), ServiceError> {
        let employees = self.store.list_employees()?;
        let applications = self.store.list_applications()?;
        let catalog = self.store.list_vaccines()?;

        let records = employees
            .into_iter()
            .filter(|employee| employee.active)
            .map(|employee| EmployeeRecord::derive(employee, &applications))
            .collect();

        Ok((records, catalog))
    }

    fn fetch_employee(&self, id: EmployeeId) -> Result<Employee, ServiceError> {
        self.store
            .fetch_employee(id)?
            .ok_or(ServiceError::NotFound {
                resource: "employee",
                id: id.0,
            })
    }

    fn fetch_vaccine(&self, id: VaccineTypeId) -> Result<VaccineType, ServiceError> {
        self.store
            .fetch_vaccine(id)?
            .ok_or(ServiceError::NotFound {
                resource: "vaccine type",
                id: id.0,
            })
    }

    fn fetch_appointment(&self, id: AppointmentId) -> Result<Appointment, ServiceError> {
        self.store
            .fetch_appointment(id)?
            .ok_or(ServiceError::NotFound {
                resource: "appointment",
                id: id.0,
            })
    }
}

fn require_admin(actor: &Actor, operation: &'static str) -> Result<(), ServiceError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(operation))
    }
}
