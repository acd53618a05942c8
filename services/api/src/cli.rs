use crate::demo::{run_demo, DemoArgs};
use crate::report::{run_alert_report, run_pendency_report, AlertReportArgs, PendencyReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use univac::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "UniVac",
    about = "Run the UniVac vaccination service or evaluate its reports from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seed an in-memory roster and print the dashboard, alerts and pendency report
    Demo(DemoArgs),
    /// Evaluate reports offline against an exported JSON snapshot
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Print the pendency CSV for non-compliant active employees
    Pendency(PendencyReportArgs),
    /// Print the stock, expiry and schedule alerts
    Alerts(AlertReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Report {
            command: ReportCommand::Pendency(args),
        } => run_pendency_report(args),
        Command::Report {
            command: ReportCommand::Alerts(args),
        } => run_alert_report(args),
    }
}
