use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{Appointment, AppointmentId, EmployeeId};

/// Raised when a proposed slot overlaps an existing appointment of the same employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("employee {employee_id} already has an appointment between {start} and {end}")]
pub struct ScheduleConflict {
    pub employee_id: EmployeeId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Half-open `[start, end)` overlap: touching endpoints do not overlap.
pub fn overlaps(
    start: NaiveDateTime,
    end: NaiveDateTime,
    other_start: NaiveDateTime,
    other_end: NaiveDateTime,
) -> bool {
    start < other_end && end > other_start
}

/// Decide whether `[start, end)` collides with any appointment of `employee_id`.
///
/// `exclude` skips the appointment being edited so it can be saved over its own slot.
pub fn has_conflict(
    existing: &[Appointment],
    employee_id: EmployeeId,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude: Option<AppointmentId>,
) -> bool {
    existing
        .iter()
        .filter(|appointment| appointment.employee_id == employee_id)
        .filter(|appointment| Some(appointment.id) != exclude)
        .any(|appointment| overlaps(start, end, appointment.start, appointment.end))
}

/// Like [`has_conflict`] but reports which booking was hit.
pub fn find_conflict(
    existing: &[Appointment],
    employee_id: EmployeeId,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude: Option<AppointmentId>,
) -> Option<ScheduleConflict> {
    existing
        .iter()
        .filter(|appointment| appointment.employee_id == employee_id)
        .filter(|appointment| Some(appointment.id) != exclude)
        .find(|appointment| overlaps(start, end, appointment.start, appointment.end))
        .map(|appointment| ScheduleConflict {
            employee_id,
            start: appointment.start,
            end: appointment.end,
        })
}
