use chrono::{Duration, NaiveDate, NaiveTime};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use univac::vaccination::{
    Actor, AlertPolicy, AppointmentRequest, ApplicationRequest, AuditRepository, NewEmployee,
    NewLot, NewVaccineType, Role, ServiceError, VaccinationService, VaccinationStore,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) alert_policy: AlertPolicy,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

/// Populate an empty store with a small roster that exercises every alert rule.
pub(crate) fn seed_demo_data<S, A>(
    service: &VaccinationService<S, A>,
    today: NaiveDate,
) -> Result<(), ServiceError>
where
    S: VaccinationStore + 'static,
    A: AuditRepository + 'static,
{
    let admin = Actor::admin("Coordenação de Saúde");

    let mut roster = Vec::new();
    for (name, registration, role) in [
        ("Ana Souza", "2021-0001", Role::Staff),
        ("Bruno Lima", "2019-0142", Role::Staff),
        ("Carla Dias", "2023-0310", Role::Staff),
        ("Diego Ramos", "2015-0007", Role::Admin),
    ] {
        let email = format!(
            "{}@univac.edu.br",
            name.to_ascii_lowercase().replace(' ', ".")
        );
        roster.push(service.register_employee(
            &admin,
            NewEmployee {
                name: name.to_string(),
                email,
                national_id: format!("{registration}-CPF"),
                registration_number: registration.to_string(),
                role,
            },
        )?);
    }

    let mut catalog = Vec::new();
    for (name, description, mandatory) in [
        ("Hepatite B", "Esquema de três doses", true),
        ("Dupla Adulto (dT)", "Reforço a cada dez anos", true),
        ("Influenza", "Campanha anual", false),
        ("Febre Amarela", "Dose única", true),
    ] {
        catalog.push(service.create_vaccine(
            &admin,
            NewVaccineType {
                name: name.to_string(),
                description: description.to_string(),
                mandatory,
            },
        )?);
    }

    for (vaccine, code, quantity, expires_in) in [
        (0, "HB-2026-A", 120, 180),
        (1, "DT-2025-C", 35, 20),
        (3, "FA-2026-B", 60, 400),
        (3, "FA-2025-Z", 15, 12),
    ] {
        service.add_lot(
            &admin,
            catalog[vaccine].id,
            NewLot {
                code: code.to_string(),
                quantity,
                expiry_date: today + Duration::days(expires_in),
            },
        )?;
    }

    for (employee, vaccine, lot) in [
        (0, 0, Some("HB-2026-A")),
        (0, 1, Some("DT-2025-C")),
        (0, 3, None),
        (1, 0, Some("HB-2026-A")),
        (2, 2, None),
        (3, 0, None),
        (3, 1, None),
    ] {
        service.record_application(
            &admin,
            ApplicationRequest {
                employee_id: Some(roster[employee].id),
                vaccine_type_id: Some(catalog[vaccine].id),
                applied_on: Some(today - Duration::days(30)),
                lot_code: lot.map(str::to_string),
                responsible: Some("Enf. Paula Martins".to_string()),
            },
            today,
        )?;
    }

    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
    for (offset, employee, vaccine) in [(0, 1, 1), (30, 2, 0), (0, 3, 3)] {
        let start = today.and_time(nine) + Duration::minutes(offset);
        let day_shift = if employee == 3 { 1 } else { 0 };
        service.schedule_appointment(
            &admin,
            AppointmentRequest {
                employee_id: Some(roster[employee].id),
                vaccine_type_id: Some(catalog[vaccine].id),
                start: Some(start + Duration::days(day_shift)),
                end: Some(start + Duration::days(day_shift) + Duration::minutes(30)),
            },
        )?;
    }

    Ok(())
}
