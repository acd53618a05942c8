use chrono::NaiveDate;
use serde::Serialize;

use super::super::alerts::{Alert, AlertSeverity};
use super::super::compliance::{compliance_rate, ComplianceStatus};
use super::super::domain::{Appointment, AppointmentStatus, VaccineType};

/// Headline numbers for the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub active_employees: usize,
    pub compliant_employees: usize,
    /// `None` while the roster is empty.
    pub compliance_rate: Option<u8>,
    pub total_applications: usize,
    pub todays_appointments: usize,
    pub total_stock: u64,
    pub alert_count: usize,
    pub critical_alerts: usize,
}

impl DashboardSummary {
    pub fn build(
        today: NaiveDate,
        statuses: &[ComplianceStatus],
        total_applications: usize,
        todays_appointments: usize,
        vaccines: &[VaccineType],
        alerts: &[Alert],
    ) -> Self {
        Self {
            today,
            active_employees: statuses.len(),
            compliant_employees: statuses
                .iter()
                .filter(|status| status.in_compliance)
                .count(),
            compliance_rate: compliance_rate(statuses),
            total_applications,
            todays_appointments,
            total_stock: vaccines.iter().map(VaccineType::total_stock).sum(),
            alert_count: alerts.len(),
            critical_alerts: alerts
                .iter()
                .filter(|alert| alert.severity == AlertSeverity::Critical)
                .count(),
        }
    }
}

/// Scheduled appointments starting on `today`.
pub fn todays_scheduled_appointments(appointments: &[Appointment], today: NaiveDate) -> usize {
    appointments
        .iter()
        .filter(|appointment| appointment.status == AppointmentStatus::Scheduled)
        .filter(|appointment| appointment.start.date() == today)
        .count()
}
