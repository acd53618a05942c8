//! Request validation: turns loosely-typed inbound payloads into store-ready records.
//!
//! Optional fields are resolved here, so evaluators and repositories only ever see complete
//! records (e.g. an application without a lot code is stored as `"N/A"`).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{
    AppointmentStatus, EmployeeId, NewApplication, NewAppointment, NewEmployee, NewLot,
    NewVaccineType, VaccineTypeId,
};

pub const DEFAULT_LOT_CODE: &str = "N/A";
pub const DEFAULT_RESPONSIBLE: &str = "Sistema";

/// Missing or malformed fields on a create/update request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("field `{0}` is required")]
    MissingField(&'static str),
    #[error("field `{0}` must not be blank")]
    BlankField(&'static str),
    #[error("`{0}` is not a valid e-mail address")]
    InvalidEmail(String),
    #[error("appointment must end after it starts ({start} >= {end})")]
    InvertedInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("update carries no changes")]
    EmptyUpdate,
}

/// Inbound appointment payload; every field may be absent on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default)]
    pub vaccine_type_id: Option<VaccineTypeId>,
    #[serde(default)]
    pub start: Option<NaiveDateTime>,
    #[serde(default)]
    pub end: Option<NaiveDateTime>,
}

impl AppointmentRequest {
    pub fn validate(&self) -> Result<NewAppointment, ValidationError> {
        let employee_id = self
            .employee_id
            .ok_or(ValidationError::MissingField("employee_id"))?;
        let vaccine_type_id = self
            .vaccine_type_id
            .ok_or(ValidationError::MissingField("vaccine_type_id"))?;
        let start = self.start.ok_or(ValidationError::MissingField("start"))?;
        let end = self.end.ok_or(ValidationError::MissingField("end"))?;

        if end <= start {
            return Err(ValidationError::InvertedInterval { start, end });
        }

        Ok(NewAppointment {
            employee_id,
            vaccine_type_id,
            start,
            end,
        })
    }
}

/// Reschedule fields and/or a status change for an existing appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    #[serde(flatten)]
    pub slot: AppointmentRequest,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

impl AppointmentUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.slot == AppointmentRequest::default()
    }
}

/// Inbound vaccine application payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRequest {
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default)]
    pub vaccine_type_id: Option<VaccineTypeId>,
    #[serde(default)]
    pub applied_on: Option<NaiveDate>,
    #[serde(default)]
    pub lot_code: Option<String>,
    #[serde(default)]
    pub responsible: Option<String>,
}

impl ApplicationRequest {
    /// Resolve defaults: `applied_on` falls back to `today`, lot and responsible to placeholders.
    pub fn validate(&self, today: NaiveDate) -> Result<NewApplication, ValidationError> {
        let employee_id = self
            .employee_id
            .ok_or(ValidationError::MissingField("employee_id"))?;
        let vaccine_type_id = self
            .vaccine_type_id
            .ok_or(ValidationError::MissingField("vaccine_type_id"))?;

        Ok(NewApplication {
            employee_id,
            vaccine_type_id,
            applied_on: self.applied_on.unwrap_or(today),
            lot_code: non_blank_or(self.lot_code.as_deref(), DEFAULT_LOT_CODE),
            responsible: non_blank_or(self.responsible.as_deref(), DEFAULT_RESPONSIBLE),
        })
    }
}

fn non_blank_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn require_email(value: &str) -> Result<String, ValidationError> {
    let email = require_text("email", value)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::InvalidEmail(email)),
    }
}

pub fn validate_employee(employee: NewEmployee) -> Result<NewEmployee, ValidationError> {
    Ok(NewEmployee {
        name: require_text("name", &employee.name)?,
        email: require_email(&employee.email)?,
        national_id: require_text("national_id", &employee.national_id)?,
        registration_number: require_text("registration_number", &employee.registration_number)?,
        role: employee.role,
    })
}

pub fn validate_vaccine(vaccine: NewVaccineType) -> Result<NewVaccineType, ValidationError> {
    Ok(NewVaccineType {
        name: require_text("name", &vaccine.name)?,
        description: vaccine.description.trim().to_string(),
        mandatory: vaccine.mandatory,
    })
}

pub fn validate_lot(lot: NewLot) -> Result<NewLot, ValidationError> {
    Ok(NewLot {
        code: require_text("code", &lot.code)?,
        quantity: lot.quantity,
        expiry_date: lot.expiry_date,
    })
}
