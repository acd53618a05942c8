use crate::infra::seed_demo_data;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;
use univac::config::AppConfig;
use univac::error::AppError;
use univac::vaccination::{
    Actor, Alert, AlertPolicy, DashboardSummary, InMemoryAuditLog, InMemoryStore,
    VaccinationService,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reporting date (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the raw pendency CSV instead of the formatted listing.
    #[arg(long)]
    pub(crate) csv: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, csv } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let config = AppConfig::load()?;

    let service = VaccinationService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryAuditLog::new()),
        AlertPolicy::from(&config.rules),
    )
    .with_audit_page_size(config.rules.audit_page_size);
    seed_demo_data(&service, today)?;

    println!("UniVac vaccination demo ({today})");
    render_dashboard(&service.dashboard(today)?);
    render_alerts(&service.alerts(today)?);

    let rows = service.pendency_report()?;
    if csv {
        println!("\nPendency export");
        print!("{}", service.pendency_csv()?);
    } else if rows.is_empty() {
        println!("\nPendency report: every active employee is up to date");
    } else {
        println!("\nPendency report");
        for row in &rows {
            println!(
                "- {} ({}, {}): {}",
                row.name,
                row.registration_number,
                row.email,
                row.pending_vaccines.join(", ")
            );
        }
    }

    let entries = service.audit_log(&Actor::admin("demo"), Some(5))?;
    println!("\nLatest audit entries");
    for entry in entries {
        println!(
            "- [{}] {} {}: {} (by {})",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.resource,
            entry.detail,
            entry.author
        );
    }

    Ok(())
}

pub(crate) fn render_dashboard(summary: &DashboardSummary) {
    println!("\nDashboard");
    println!(
        "- {} active employees | {} compliant ({})",
        summary.active_employees,
        summary.compliant_employees,
        match summary.compliance_rate {
            Some(rate) => format!("{rate}%"),
            None => "n/a".to_string(),
        }
    );
    println!(
        "- {} applications recorded | {} appointments today",
        summary.total_applications, summary.todays_appointments
    );
    println!(
        "- {} doses in stock | {} alerts ({} critical)",
        summary.total_stock, summary.alert_count, summary.critical_alerts
    );
}

pub(crate) fn render_alerts(alerts: &[Alert]) {
    if alerts.is_empty() {
        println!("\nAlerts: none");
        return;
    }

    println!("\nAlerts");
    for alert in alerts {
        println!(
            "- [{}] {}: {}",
            alert.severity.label(),
            alert.title,
            alert.message
        );
    }
}
