use crate::demo::render_alerts;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use tracing::debug;
use univac::config::AppConfig;
use univac::error::AppError;
use univac::snapshot::Snapshot;
use univac::vaccination::AlertPolicy;

#[derive(Args, Debug)]
pub(crate) struct PendencyReportArgs {
    /// JSON snapshot with employees, vaccines and applications
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct AlertReportArgs {
    /// JSON snapshot with vaccines (and their lots) and appointments
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Evaluation date for the alerts (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_pendency_report(args: PendencyReportArgs) -> Result<(), AppError> {
    let snapshot = Snapshot::from_path(&args.snapshot)?;
    debug!(
        path = %args.snapshot.display(),
        employees = snapshot.employees.len(),
        "snapshot loaded"
    );

    print!("{}", snapshot.pendency_csv()?);
    Ok(())
}

pub(crate) fn run_alert_report(args: AlertReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let snapshot = Snapshot::from_path(&args.snapshot)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let alerts = snapshot.alerts(today, AlertPolicy::from(&config.rules));
    println!("Alerts for {today} ({})", args.snapshot.display());
    render_alerts(&alerts);
    Ok(())
}
