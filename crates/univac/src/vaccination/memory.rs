use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    ApplicationId, Appointment, AppointmentId, AppointmentStatus, AuditEntryId, AuditLogEntry,
    Employee, EmployeeId, Lot, LotId, NewApplication, NewAppointment, NewAuditEntry,
    NewEmployee, NewLot, NewVaccineType, VaccineApplication, VaccineType, VaccineTypeId,
};
use super::repository::{
    ApplicationRepository, AppointmentRepository, AuditRepository, EmployeeRepository,
    RepositoryError, VaccineRepository,
};
use super::scheduling::find_conflict;

#[derive(Debug, Default)]
struct StoreState {
    sequence: u64,
    employees: BTreeMap<EmployeeId, Employee>,
    vaccines: BTreeMap<VaccineTypeId, VaccineType>,
    lots: BTreeMap<LotId, Lot>,
    applications: BTreeMap<ApplicationId, VaccineApplication>,
    appointments: BTreeMap<AppointmentId, Appointment>,
}

impl StoreState {
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn with_lots(&self, vaccine: &VaccineType) -> VaccineType {
        let mut vaccine = vaccine.clone();
        vaccine.lots = self
            .lots
            .values()
            .filter(|lot| lot.vaccine_type_id == vaccine.id)
            .cloned()
            .collect();
        vaccine
    }

    fn employee_conflicts(&self, candidate: &Employee) -> Option<&'static str> {
        self.employees
            .values()
            .filter(|existing| existing.id != candidate.id)
            .find_map(|existing| {
                if existing.email.eq_ignore_ascii_case(&candidate.email) {
                    Some("email")
                } else if existing.registration_number == candidate.registration_number {
                    Some("registration_number")
                } else {
                    None
                }
            })
    }

    fn vaccine_name_taken(&self, id: VaccineTypeId, name: &str) -> bool {
        self.vaccines
            .values()
            .any(|existing| existing.id != id && existing.name.eq_ignore_ascii_case(name))
    }

    fn check_references(
        &self,
        employee: EmployeeId,
        vaccine: VaccineTypeId,
    ) -> Result<(), RepositoryError> {
        if !self.employees.contains_key(&employee) {
            return Err(RepositoryError::MissingReference {
                resource: "employee",
                id: employee.0,
            });
        }
        if !self.vaccines.contains_key(&vaccine) {
            return Err(RepositoryError::MissingReference {
                resource: "vaccine type",
                id: vaccine.0,
            });
        }
        Ok(())
    }

    fn appointments_snapshot(&self) -> Vec<Appointment> {
        self.appointments.values().cloned().collect()
    }
}

/// Mutex-guarded store used by the API binary, the demo and the tests.
///
/// Every conditional write (overlap check, reference check) runs under the same lock as
/// the write itself.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl EmployeeRepository for InMemoryStore {
    fn insert_employee(&self, employee: NewEmployee) -> Result<Employee, RepositoryError> {
        let mut state = self.state()?;
        let id = EmployeeId(state.next_id());
        let record = Employee {
            id,
            name: employee.name,
            email: employee.email,
            national_id: employee.national_id,
            registration_number: employee.registration_number,
            role: employee.role,
            active: true,
        };

        if let Some(field) = state.employee_conflicts(&record) {
            return Err(RepositoryError::Duplicate { field });
        }

        state.employees.insert(id, record.clone());
        Ok(record)
    }

    fn update_employee(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut state = self.state()?;
        if !state.employees.contains_key(&employee.id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(field) = state.employee_conflicts(&employee) {
            return Err(RepositoryError::Duplicate { field });
        }

        state.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    fn fetch_employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.state()?.employees.get(&id).cloned())
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self.state()?.employees.values().cloned().collect())
    }

    fn delete_employee(&self, id: EmployeeId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.employees.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }

        let applications = state
            .applications
            .values()
            .filter(|application| application.employee_id == id)
            .count();
        if applications > 0 {
            return Err(RepositoryError::Referenced {
                dependents: "vaccine applications",
                count: applications,
            });
        }

        let appointments = state
            .appointments
            .values()
            .filter(|appointment| appointment.employee_id == id)
            .count();
        if appointments > 0 {
            return Err(RepositoryError::Referenced {
                dependents: "appointments",
                count: appointments,
            });
        }

        state.employees.remove(&id);
        Ok(())
    }
}

impl VaccineRepository for InMemoryStore {
    fn insert_vaccine(&self, vaccine: NewVaccineType) -> Result<VaccineType, RepositoryError> {
        let mut state = self.state()?;
        let id = VaccineTypeId(state.next_id());
        if state.vaccine_name_taken(id, &vaccine.name) {
            return Err(RepositoryError::Duplicate { field: "name" });
        }

        let record = VaccineType {
            id,
            name: vaccine.name,
            description: vaccine.description,
            mandatory: vaccine.mandatory,
            lots: Vec::new(),
        };
        state.vaccines.insert(id, record.clone());
        Ok(record)
    }

    fn update_vaccine(&self, vaccine: VaccineType) -> Result<VaccineType, RepositoryError> {
        let mut state = self.state()?;
        if !state.vaccines.contains_key(&vaccine.id) {
            return Err(RepositoryError::NotFound);
        }
        if state.vaccine_name_taken(vaccine.id, &vaccine.name) {
            return Err(RepositoryError::Duplicate { field: "name" });
        }

        let stored = VaccineType {
            lots: Vec::new(),
            ..vaccine
        };
        state.vaccines.insert(stored.id, stored.clone());
        Ok(state.with_lots(&stored))
    }

    fn fetch_vaccine(&self, id: VaccineTypeId) -> Result<Option<VaccineType>, RepositoryError> {
        let state = self.state()?;
        Ok(state.vaccines.get(&id).map(|vaccine| state.with_lots(vaccine)))
    }

    fn list_vaccines(&self) -> Result<Vec<VaccineType>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .vaccines
            .values()
            .map(|vaccine| state.with_lots(vaccine))
            .collect())
    }

    fn delete_vaccine(&self, id: VaccineTypeId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.vaccines.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }

        let applications = state
            .applications
            .values()
            .filter(|application| application.vaccine_type_id == id)
            .count();
        if applications > 0 {
            return Err(RepositoryError::Referenced {
                dependents: "vaccine applications",
                count: applications,
            });
        }

        let appointments = state
            .appointments
            .values()
            .filter(|appointment| appointment.vaccine_type_id == id)
            .count();
        if appointments > 0 {
            return Err(RepositoryError::Referenced {
                dependents: "appointments",
                count: appointments,
            });
        }

        state.lots.retain(|_, lot| lot.vaccine_type_id != id);
        state.vaccines.remove(&id);
        Ok(())
    }

    fn insert_lot(&self, vaccine: VaccineTypeId, lot: NewLot) -> Result<Lot, RepositoryError> {
        let mut state = self.state()?;
        if !state.vaccines.contains_key(&vaccine) {
            return Err(RepositoryError::NotFound);
        }

        let id = LotId(state.next_id());
        let record = Lot {
            id,
            vaccine_type_id: vaccine,
            code: lot.code,
            quantity: lot.quantity,
            expiry_date: lot.expiry_date,
        };
        state.lots.insert(id, record.clone());
        Ok(record)
    }

    fn set_lot_quantity(&self, id: LotId, quantity: u32) -> Result<Lot, RepositoryError> {
        let mut state = self.state()?;
        let lot = state.lots.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        lot.quantity = quantity;
        Ok(lot.clone())
    }

    fn delete_lot(&self, id: LotId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state
            .lots
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<VaccineApplication, RepositoryError> {
        let mut state = self.state()?;
        state.check_references(application.employee_id, application.vaccine_type_id)?;

        let id = ApplicationId(state.next_id());
        let record = VaccineApplication {
            id,
            employee_id: application.employee_id,
            vaccine_type_id: application.vaccine_type_id,
            applied_on: application.applied_on,
            lot_code: application.lot_code,
            responsible: application.responsible,
        };
        state.applications.insert(id, record.clone());
        Ok(record)
    }

    fn list_applications(&self) -> Result<Vec<VaccineApplication>, RepositoryError> {
        Ok(self.state()?.applications.values().cloned().collect())
    }

    fn applications_for_employee(
        &self,
        id: EmployeeId,
    ) -> Result<Vec<VaccineApplication>, RepositoryError> {
        Ok(self
            .state()?
            .applications
            .values()
            .filter(|application| application.employee_id == id)
            .cloned()
            .collect())
    }
}

impl AppointmentRepository for InMemoryStore {
    fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        let mut state = self.state()?;
        state.check_references(appointment.employee_id, appointment.vaccine_type_id)?;

        let existing = state.appointments_snapshot();
        if let Some(conflict) = find_conflict(
            &existing,
            appointment.employee_id,
            appointment.start,
            appointment.end,
            None,
        ) {
            return Err(RepositoryError::Overlap(conflict));
        }

        let id = AppointmentId(state.next_id());
        let record = Appointment {
            id,
            employee_id: appointment.employee_id,
            vaccine_type_id: appointment.vaccine_type_id,
            start: appointment.start,
            end: appointment.end,
            status: AppointmentStatus::Scheduled,
        };
        state.appointments.insert(id, record.clone());
        Ok(record)
    }

    fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, RepositoryError> {
        let mut state = self.state()?;
        if !state.appointments.contains_key(&appointment.id) {
            return Err(RepositoryError::NotFound);
        }
        state.check_references(appointment.employee_id, appointment.vaccine_type_id)?;

        let existing = state.appointments_snapshot();
        if let Some(conflict) = find_conflict(
            &existing,
            appointment.employee_id,
            appointment.start,
            appointment.end,
            Some(appointment.id),
        ) {
            return Err(RepositoryError::Overlap(conflict));
        }

        state.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    fn fetch_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        Ok(self.state()?.appointments.get(&id).cloned())
    }

    fn list_appointments(&self) -> Result<Vec<Appointment>, RepositoryError> {
        Ok(self.state()?.appointments.values().cloned().collect())
    }

    fn delete_appointment(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state
            .appointments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// Append-only audit log kept in memory, newest entries last.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditLogEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditRepository for InMemoryAuditLog {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, RepositoryError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RepositoryError::Unavailable("audit mutex poisoned".to_string()))?;
        let record = AuditLogEntry {
            id: AuditEntryId(entries.len() as u64 + 1),
            action: entry.action,
            resource: entry.resource,
            detail: entry.detail,
            author: entry.author,
            timestamp: Utc::now(),
        };
        entries.push(record.clone());
        Ok(record)
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| RepositoryError::Unavailable("audit mutex poisoned".to_string()))?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vaccination::domain::Role;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .expect("valid date")
            .and_hms_opt(hour, minute, 0)
            .expect("valid time")
    }

    fn hire(store: &InMemoryStore, registration: &str) -> EmployeeId {
        store
            .insert_employee(NewEmployee {
                name: format!("Employee {registration}"),
                email: format!("{}@univac.test", registration.to_ascii_lowercase()),
                national_id: format!("{registration}-CPF"),
                registration_number: registration.to_string(),
                role: Role::Staff,
            })
            .expect("employee")
            .id
    }

    fn catalog(store: &InMemoryStore, name: &str) -> VaccineTypeId {
        store
            .insert_vaccine(NewVaccineType {
                name: name.to_string(),
                description: String::new(),
                mandatory: true,
            })
            .expect("vaccine")
            .id
    }

    fn slot(
        employee: EmployeeId,
        vaccine: VaccineTypeId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> NewAppointment {
        NewAppointment {
            employee_id: employee,
            vaccine_type_id: vaccine,
            start,
            end,
        }
    }

    fn dose(employee: EmployeeId, vaccine: VaccineTypeId) -> NewApplication {
        NewApplication {
            employee_id: employee,
            vaccine_type_id: vaccine,
            applied_on: NaiveDate::from_ymd_opt(2026, 1, 10).expect("valid date"),
            lot_code: "N/A".to_string(),
            responsible: "Sistema".to_string(),
        }
    }

    #[test]
    fn insert_refuses_overlapping_booking_for_same_employee() {
        let store = InMemoryStore::new();
        let ana = hire(&store, "R-0001");
        let bruno = hire(&store, "R-0002");
        let flu = catalog(&store, "Flu");

        store
            .insert_appointment(slot(ana, flu, at(10, 0), at(10, 30)))
            .expect("first booking");

        let overlap = store.insert_appointment(slot(ana, flu, at(10, 15), at(10, 45)));
        assert!(matches!(overlap, Err(RepositoryError::Overlap(_))));

        store
            .insert_appointment(slot(ana, flu, at(10, 30), at(11, 0)))
            .expect("adjacent booking allowed");
        store
            .insert_appointment(slot(bruno, flu, at(10, 15), at(10, 45)))
            .expect("other employee unaffected");

        assert_eq!(store.list_appointments().expect("list").len(), 3);
    }

    #[test]
    fn update_may_keep_its_own_slot() {
        let store = InMemoryStore::new();
        let ana = hire(&store, "R-0001");
        let flu = catalog(&store, "Flu");
        let booked = store
            .insert_appointment(slot(ana, flu, at(9, 0), at(9, 30)))
            .expect("booking");

        let mut edited = booked.clone();
        edited.end = at(9, 20);
        let saved = store.update_appointment(edited).expect("self overlap ignored");
        assert_eq!(saved.end, at(9, 20));
    }

    #[test]
    fn vaccine_with_history_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let ana = hire(&store, "R-0001");
        let hepatitis = catalog(&store, "Hepatitis B");
        store
            .insert_application(dose(ana, hepatitis))
            .expect("application");

        assert!(matches!(
            store.delete_vaccine(hepatitis),
            Err(RepositoryError::Referenced { count: 1, .. })
        ));
        assert!(store.fetch_vaccine(hepatitis).expect("fetch").is_some());
    }

    #[test]
    fn history_cannot_reference_a_deleted_employee() {
        let store = InMemoryStore::new();
        let ana = hire(&store, "R-0001");
        let hepatitis = catalog(&store, "Hepatitis B");
        store.delete_employee(ana).expect("no history yet");

        match store.insert_application(dose(ana, hepatitis)) {
            Err(RepositoryError::MissingReference { resource, id }) => {
                assert_eq!(resource, "employee");
                assert_eq!(id, ana.0);
            }
            other => panic!("expected missing reference, got {other:?}"),
        }
        assert!(store.list_applications().expect("list").is_empty());
    }

    #[test]
    fn bookings_cannot_reference_a_deleted_vaccine() {
        let store = InMemoryStore::new();
        let ana = hire(&store, "R-0001");
        let flu = catalog(&store, "Flu");
        let booked = store
            .insert_appointment(slot(ana, flu, at(9, 0), at(9, 30)))
            .expect("booking");
        let tetanus = catalog(&store, "Tetanus");
        store.delete_vaccine(tetanus).expect("unused vaccine deleted");

        assert!(matches!(
            store.insert_appointment(slot(ana, tetanus, at(11, 0), at(11, 30))),
            Err(RepositoryError::MissingReference {
                resource: "vaccine type",
                ..
            })
        ));

        let mut moved = booked.clone();
        moved.vaccine_type_id = tetanus;
        assert!(matches!(
            store.update_appointment(moved),
            Err(RepositoryError::MissingReference { .. })
        ));
        assert_eq!(store.list_appointments().expect("list"), vec![booked]);
    }

    #[test]
    fn audit_log_lists_newest_first() {
        let log = InMemoryAuditLog::new();
        for action in ["LOGIN", "CRIACAO", "EXCLUSAO"] {
            log.append(NewAuditEntry {
                action: action.to_string(),
                resource: "employee".to_string(),
                detail: String::new(),
                author: "admin".to_string(),
            })
            .expect("append");
        }

        let recent = log.recent(2).expect("recent");
        let actions: Vec<&str> = recent.iter().map(|entry| entry.action.as_str()).collect();
        assert_eq!(actions, vec!["EXCLUSAO", "CRIACAO"]);
    }
}
