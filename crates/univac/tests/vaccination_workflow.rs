//! End-to-end checks of the rule evaluators and the service facade over the in-memory store.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use univac::vaccination::compliance::mandatory_vaccines;
use univac::vaccination::{
    evaluate_alerts, evaluate_compliance, has_conflict, Actor, AlertKind, AlertPolicy,
    Appointment, AppointmentId, AppointmentRequest, AppointmentStatus, ApplicationRequest,
    EmployeeId, InMemoryAuditLog, InMemoryStore, Lot, LotId, NewEmployee, NewLot, NewVaccineType,
    Role, ServiceError, VaccinationService, VaccineType, VaccineTypeId,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).expect("valid date")
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    today().and_hms_opt(hour, minute, 0).expect("valid time")
}

fn catalog_entry(id: u64, name: &str, mandatory: bool) -> VaccineType {
    VaccineType {
        id: VaccineTypeId(id),
        name: name.to_string(),
        description: String::new(),
        mandatory,
        lots: Vec::new(),
    }
}

fn flu_lot(quantity: u32, expires_in_days: i64) -> Lot {
    Lot {
        id: LotId(1),
        vaccine_type_id: VaccineTypeId(1),
        code: "FLU-26".to_string(),
        quantity,
        expiry_date: today() + Duration::days(expires_in_days),
    }
}

#[test]
fn employee_missing_a_mandatory_vaccine_is_out_of_compliance() {
    let catalog = vec![
        catalog_entry(1, "Hepatitis B", true),
        catalog_entry(2, "Tetanus", true),
        catalog_entry(3, "Yellow Fever", true),
    ];
    let applied: BTreeSet<VaccineTypeId> = [VaccineTypeId(1), VaccineTypeId(3)].into();

    let status = evaluate_compliance(&applied, &mandatory_vaccines(&catalog));

    assert!(!status.in_compliance);
    assert_eq!(status.missing.len(), 1);
    assert_eq!(status.missing[0].id, VaccineTypeId(2));
}

#[test]
fn overlapping_request_conflicts_and_touching_request_does_not() {
    let existing = vec![Appointment {
        id: AppointmentId(1),
        employee_id: EmployeeId(7),
        vaccine_type_id: VaccineTypeId(1),
        start: at(10, 0),
        end: at(10, 30),
        status: AppointmentStatus::Scheduled,
    }];

    assert!(has_conflict(
        &existing,
        EmployeeId(7),
        at(10, 15),
        at(10, 45),
        None
    ));
    assert!(!has_conflict(
        &existing,
        EmployeeId(7),
        at(10, 30),
        at(11, 0),
        None
    ));
}

#[test]
fn low_and_expiring_flu_stock_raise_two_warnings() {
    let mut flu = catalog_entry(1, "Flu", false);
    flu.lots = vec![flu_lot(40, 20)];

    let alerts = evaluate_alerts(&[flu.clone()], today(), 0);
    let kinds: Vec<AlertKind> = alerts.iter().map(|alert| alert.kind).collect();
    assert_eq!(kinds, vec![AlertKind::LowStock, AlertKind::LotExpiring]);

    flu.lots = vec![flu_lot(0, 365)];
    let alerts = evaluate_alerts(&[flu], today(), 0);
    let kinds: Vec<AlertKind> = alerts.iter().map(|alert| alert.kind).collect();
    assert_eq!(kinds, vec![AlertKind::StockExhausted]);
}

fn populated_service() -> VaccinationService<InMemoryStore, InMemoryAuditLog> {
    let service = VaccinationService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryAuditLog::new()),
        AlertPolicy::default(),
    );
    let admin = Actor::admin("Coordenação");

    let mut employees = Vec::new();
    for (name, registration) in [
        ("Ana Souza", "R-0001"),
        ("Bruno Lima", "R-0002"),
        ("Carla Dias", "R-0003"),
    ] {
        let employee = service
            .register_employee(
                &admin,
                NewEmployee {
                    name: name.to_string(),
                    email: format!("{}@univac.test", registration.to_ascii_lowercase()),
                    national_id: format!("{registration}-CPF"),
                    registration_number: registration.to_string(),
                    role: Role::Staff,
                },
            )
            .expect("employee registered");
        employees.push(employee);
    }

    let mut vaccines = Vec::new();
    for name in ["Hepatitis B", "Tetanus"] {
        let vaccine = service
            .create_vaccine(
                &admin,
                NewVaccineType {
                    name: name.to_string(),
                    description: String::new(),
                    mandatory: true,
                },
            )
            .expect("vaccine created");
        vaccines.push(vaccine);
    }

    service
        .add_lot(
            &admin,
            vaccines[0].id,
            NewLot {
                code: "HB-26".to_string(),
                quantity: 80,
                expiry_date: today() + Duration::days(90),
            },
        )
        .expect("lot added");

    for vaccine in &vaccines {
        service
            .record_application(
                &admin,
                ApplicationRequest {
                    employee_id: Some(employees[1].id),
                    vaccine_type_id: Some(vaccine.id),
                    ..ApplicationRequest::default()
                },
                today(),
            )
            .expect("application recorded");
    }
    service
        .record_application(
            &admin,
            ApplicationRequest {
                employee_id: Some(employees[2].id),
                vaccine_type_id: Some(vaccines[1].id),
                lot_code: Some("TT-9".to_string()),
                responsible: Some("Enf. Paula".to_string()),
                applied_on: Some(today() - Duration::days(3)),
            },
            today(),
        )
        .expect("application recorded");

    service
}

#[test]
fn pendency_export_is_stable_across_runs() {
    let service = populated_service();

    let first = service.pendency_csv().expect("first export");
    let second = service.pendency_csv().expect("second export");

    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(
        first,
        "Nome,Email,Registro,Status,Vacinas Pendentes\n\
         Ana Souza,r-0001@univac.test,R-0001,Pendente,\"Hepatitis B, Tetanus\"\n\
         Carla Dias,r-0003@univac.test,R-0003,Pendente,\"Hepatitis B\"\n"
    );
}

#[test]
fn dashboard_summarises_the_roster() {
    let service = populated_service();

    let summary = service.dashboard(today()).expect("dashboard builds");

    assert_eq!(summary.active_employees, 3);
    assert_eq!(summary.compliant_employees, 1);
    assert_eq!(summary.compliance_rate, Some(33));
    assert_eq!(summary.total_applications, 3);
    assert_eq!(summary.total_stock, 80);
    assert_eq!(summary.critical_alerts, 1);
    assert_eq!(summary.alert_count, 1);
}

#[test]
fn concurrent_bookings_for_one_slot_admit_exactly_one() {
    let service = Arc::new(populated_service());
    let employee = service.list_employees().expect("roster")[0].id;
    let vaccine = service.list_vaccines().expect("catalog")[0].id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                service.schedule_appointment(
                    &Actor::staff("Enfermagem", None),
                    AppointmentRequest {
                        employee_id: Some(employee),
                        vaccine_type_id: Some(vaccine),
                        start: Some(at(15, 0)),
                        end: Some(at(15, 30)),
                    },
                )
            })
        })
        .collect();

    let mut booked = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.join().expect("booking thread") {
            Ok(_) => booked += 1,
            Err(ServiceError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("expected booking or conflict, got {other:?}"),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(conflicts, 7);
}
