use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use freight_billing::billing::BillingPolicy;
use freight_billing::config::Settings;
use freight_billing::pipeline::{self, RunReport};
use freight_billing::{BillingError, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

const OUTPUT_ROOT: &str = "results";
const DEFAULT_WORKBOOK: &str = "input/shipments.xlsx";

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| BillingError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;
    let policy = BillingPolicy::default();
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let output_root = Path::new(OUTPUT_ROOT);

    let report = match cli.command {
        Command::Invoices { input_dir } => {
            pipeline::run_invoice_directory(&input_dir, output_root, &settings, &policy, &date)?
        }
        Command::Shipments { workbook } => {
            pipeline::run_shipment_workbook(&workbook, output_root, &settings, &policy, &date)?
        }
    };

    log_report(&report);
    Ok(())
}

fn log_report(report: &RunReport) {
    info!(
        records = report.record_count,
        accounts = report.workbooks.len(),
        output = %report.output_dir.display(),
        summary = %report.summary.display(),
        "run complete"
    );
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Re-attribute shipment invoices to accounts and build billing reports."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bill every CSV invoice export in a directory, matching accounts by name.
    Invoices {
        /// Directory containing the CSV files.
        input_dir: PathBuf,
    },
    /// Bill a shipment workbook, matching accounts by billing account number.
    Shipments {
        /// Workbook with the Export/Import Data and Destination Charges sheets.
        #[arg(default_value = DEFAULT_WORKBOOK)]
        workbook: PathBuf,
    },
}
