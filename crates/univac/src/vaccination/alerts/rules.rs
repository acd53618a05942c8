use chrono::NaiveDate;

use super::super::domain::{Lot, VaccineType};
use super::policy::AlertPolicy;
use super::{Alert, AlertKind, AlertSeverity};

const STOCK_LINK: &str = "/vaccines";
const SCHEDULE_LINK: &str = "/appointments";

/// Low-stock and exhausted-stock checks for one vaccine. At most one alert fires.
pub(crate) fn stock_alert(vaccine: &VaccineType, policy: &AlertPolicy) -> Option<Alert> {
    let total = vaccine.total_stock();

    if total == 0 {
        return Some(Alert {
            id: format!("stock-exhausted-{}", vaccine.id),
            kind: AlertKind::StockExhausted,
            severity: AlertSeverity::Critical,
            title: "Stock Exhausted".to_string(),
            message: format!("{} has no doses left in stock", vaccine.name),
            link: Some(STOCK_LINK.to_string()),
        });
    }

    if total < policy.low_stock_threshold {
        return Some(Alert {
            id: format!("low-stock-{}", vaccine.id),
            kind: AlertKind::LowStock,
            severity: AlertSeverity::Warning,
            title: "Low Stock".to_string(),
            message: format!("{} has only {} dose(s) remaining", vaccine.name, total),
            link: Some(STOCK_LINK.to_string()),
        });
    }

    None
}

/// Lots whose expiry falls within `1..=expiry_window_days` days from `today`.
///
/// Lots already expired (including those expiring today) are not reported.
pub(crate) fn expiry_alerts(
    vaccine: &VaccineType,
    today: NaiveDate,
    policy: &AlertPolicy,
) -> Vec<Alert> {
    vaccine
        .lots
        .iter()
        .filter_map(|lot| {
            let days = days_until(lot, today);
            if days > 0 && days <= policy.expiry_window_days {
                Some(expiring_lot_alert(vaccine, lot, days))
            } else {
                None
            }
        })
        .collect()
}

fn days_until(lot: &Lot, today: NaiveDate) -> i64 {
    lot.expiry_date.signed_duration_since(today).num_days()
}

fn expiring_lot_alert(vaccine: &VaccineType, lot: &Lot, days: i64) -> Alert {
    Alert {
        id: format!("lot-expiring-{}", lot.id),
        kind: AlertKind::LotExpiring,
        severity: AlertSeverity::Warning,
        title: "Lot Expiring Soon".to_string(),
        message: format!(
            "Lot {} of {} expires on {} (in {} day(s))",
            lot.code, vaccine.name, lot.expiry_date, days
        ),
        link: Some(STOCK_LINK.to_string()),
    }
}

pub(crate) fn todays_appointments_alert(count: usize) -> Option<Alert> {
    if count == 0 {
        return None;
    }

    Some(Alert {
        id: "appointments-today".to_string(),
        kind: AlertKind::AppointmentsToday,
        severity: AlertSeverity::Info,
        title: "Appointments Today".to_string(),
        message: format!("{count} appointment(s) scheduled for today"),
        link: Some(SCHEDULE_LINK.to_string()),
    })
}
