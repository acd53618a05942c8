mod policy;
mod rules;

pub use policy::{AlertPolicy, DEFAULT_EXPIRY_WINDOW_DAYS, DEFAULT_LOW_STOCK_THRESHOLD};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::VaccineType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Which rule produced an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    LowStock,
    StockExhausted,
    LotExpiring,
    AppointmentsToday,
}

/// Ephemeral notice for the notification feed. Nothing about it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Stateless evaluator applying the stock, expiry and schedule rules to a snapshot.
#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    policy: AlertPolicy,
}

impl AlertEngine {
    pub fn new(policy: AlertPolicy) -> Self {
        Self { policy }
    }

    /// Alerts come out in insertion order: per vaccine the stock rule precedes its lot
    /// expiry rules, and the same-day appointment summary comes last.
    pub fn evaluate(
        &self,
        vaccines: &[VaccineType],
        today: NaiveDate,
        todays_appointments: usize,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for vaccine in vaccines {
            alerts.extend(rules::stock_alert(vaccine, &self.policy));
            alerts.extend(rules::expiry_alerts(vaccine, today, &self.policy));
        }

        alerts.extend(rules::todays_appointments_alert(todays_appointments));
        alerts
    }
}

/// Evaluate the notification rules with the default thresholds.
pub fn evaluate_alerts(
    vaccines: &[VaccineType],
    today: NaiveDate,
    todays_appointments: usize,
) -> Vec<Alert> {
    AlertEngine::default().evaluate(vaccines, today, todays_appointments)
}
