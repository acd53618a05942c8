use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier wrapper for roster entries.
    EmployeeId
);
record_id!(
    /// Identifier wrapper for catalog entries.
    VaccineTypeId
);
record_id!(LotId);
record_id!(ApplicationId);
record_id!(AppointmentId);
record_id!(AuditEntryId);

/// Access level carried by an employee and by the acting identity of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Self::Admin),
            "STAFF" => Some(Self::Staff),
            _ => None,
        }
    }
}

/// Roster entry. Soft-deactivated through `active` once vaccination history exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub national_id: String,
    pub registration_number: String,
    pub role: Role,
    pub active: bool,
}

/// Administrator-supplied fields for a new roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub national_id: String,
    pub registration_number: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Staff
}

/// Partial admin edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Self-service edit limited to contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tracked batch of doses for one vaccine type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub vaccine_type_id: VaccineTypeId,
    pub code: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLot {
    pub code: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
}

/// Catalog entry together with its stock lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineType {
    pub id: VaccineTypeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mandatory: bool,
    #[serde(default)]
    pub lots: Vec<Lot>,
}

impl VaccineType {
    pub fn total_stock(&self) -> u64 {
        self.lots.iter().map(|lot| u64::from(lot.quantity)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVaccineType {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mandatory: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineTypeUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mandatory: Option<bool>,
}

/// Historical fact: one dose given to one employee. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineApplication {
    pub id: ApplicationId,
    pub employee_id: EmployeeId,
    pub vaccine_type_id: VaccineTypeId,
    pub applied_on: NaiveDate,
    pub lot_code: String,
    pub responsible: String,
}

/// Fully-resolved application ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub employee_id: EmployeeId,
    pub vaccine_type_id: VaccineTypeId,
    pub applied_on: NaiveDate,
    pub lot_code: String,
    pub responsible: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub employee_id: EmployeeId,
    pub vaccine_type_id: VaccineTypeId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: AppointmentStatus,
}

/// Validated slot for an appointment that has not been stored yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAppointment {
    pub employee_id: EmployeeId,
    pub vaccine_type_id: VaccineTypeId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Append-only record of an administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub action: String,
    pub resource: String,
    pub detail: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub action: String,
    pub resource: String,
    pub detail: String,
    pub author: String,
}

/// Identity performing a request, as asserted by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
}

impl Actor {
    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: Role::Admin,
            employee_id: None,
        }
    }

    pub fn staff(name: impl Into<String>, employee_id: Option<EmployeeId>) -> Self {
        Self {
            name: name.into(),
            role: Role::Staff,
            employee_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An employee combined with the vaccine types they have received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRecord {
    pub employee: Employee,
    pub applied_vaccine_ids: BTreeSet<VaccineTypeId>,
}

impl EmployeeRecord {
    /// Derive the applied-vaccine set from the full application history.
    pub fn derive(employee: Employee, applications: &[VaccineApplication]) -> Self {
        let applied_vaccine_ids = applications
            .iter()
            .filter(|application| application.employee_id == employee.id)
            .map(|application| application.vaccine_type_id)
            .collect();

        Self {
            employee,
            applied_vaccine_ids,
        }
    }
}
