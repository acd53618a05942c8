mod dashboard;
mod pendency;

pub use dashboard::{todays_scheduled_appointments, DashboardSummary};
pub use pendency::{
    pendency_rows, write_pendency_csv, PendencyRow, PENDENCY_HEADER, PENDING_STATUS,
};
