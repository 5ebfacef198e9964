mod billing;
mod config;
mod dates;
mod error;
mod filter;
mod invoice;
mod leads;
mod money;
mod preview;
mod render;
mod request;

use billing::Generated;
use clap::{Args, Parser, Subcommand};
use config::Config;
use error::BillingError;
use request::{BillingRequest, RequestOverrides};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "listing-billing",
    about = "Generate monthly MLS listing invoices from a Close.com lead export"
)]
struct Cli {
    /// TOML file with organization, defaults and column names.
    #[arg(long, global = true, default_value = ".config/billing.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the rows and totals the invoice would contain
    Preview {
        #[command(flatten)]
        billing: BillingArgs,

        /// Print the preview as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the invoice PDF
    Generate {
        #[command(flatten)]
        billing: BillingArgs,

        /// Directory the PDF is written to
        #[arg(long, short, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Args)]
struct BillingArgs {
    /// Close.com CSV export
    csv: PathBuf,

    /// Company being billed (price column header)
    #[arg(long)]
    payer: Option<String>,

    /// Dollar amount charged per MLS listing
    #[arg(long)]
    price: Option<String>,

    /// Billing month, 1-12 (defaults to the current month)
    #[arg(long)]
    month: Option<u8>,

    /// Billing year (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,

    /// Lead status to bill for
    #[arg(long)]
    status: Option<String>,

    /// Bill every status
    #[arg(long)]
    no_status_filter: bool,

    /// Keep leads regardless of listing date
    #[arg(long)]
    no_date_filter: bool,

    /// Keep leads that have no MLS number
    #[arg(long)]
    include_without_mls: bool,
}

impl BillingArgs {
    fn overrides(&self) -> RequestOverrides {
        RequestOverrides {
            payer: self.payer.clone(),
            price: self.price.clone(),
            month: self.month,
            year: self.year,
            status: self.status.clone(),
            filter_by_status: !self.no_status_filter,
            filter_by_date: !self.no_date_filter,
            require_mls: !self.include_without_mls,
        }
    }
}

fn main() -> ExitCode {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Invocation aborted");
            eprintln!("✗ {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BillingError> {
    let cfg = Config::load(&cli.config)?;

    let args = match &cli.command {
        Command::Preview { billing, .. } | Command::Generate { billing, .. } => billing,
    };

    // Reject bad configuration before touching the export.
    let (request, warnings) = BillingRequest::resolve(&cfg, &args.overrides(), request::today())?;
    let table = leads::load_leads(&args.csv, &cfg.columns)?;
    if table.is_empty() {
        warn!(path = %args.csv.display(), "CSV export has no data rows");
    }
    eprintln!("✓ Loaded {} leads", table.len());

    let prepared = billing::prepare(&table, &request, warnings)?;
    for step in &prepared.outcome.steps {
        eprintln!("  {step}");
    }
    for warning in &prepared.warnings {
        eprintln!("⚠ {warning}");
    }

    match cli.command {
        Command::Preview { json, .. } => {
            if prepared.outcome.is_empty() {
                return Ok(());
            }
            let out = if json {
                preview::render_json(&prepared.outcome, &request)
                    .map_err(|e| BillingError::Rendering(e.to_string()))?
            } else {
                preview::render_text(&prepared.outcome, &request)
            };
            println!("{out}");
        }
        Command::Generate { out_dir, .. } => match billing::generate(&prepared, &request, &out_dir)? {
            Generated::Written {
                path,
                line_items,
                total,
            } => {
                info!(line_items, total = %total, "Invoice generated");
                println!("{}", path.display());
            }
            Generated::Skipped => {
                warn!("Invoice not generated");
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_overrides() {
        let cli = Cli::parse_from([
            "listing-billing",
            "generate",
            "leads.csv",
            "--month",
            "3",
            "--year",
            "2025",
            "--price",
            "250",
            "--no-date-filter",
            "--include-without-mls",
        ]);
        let Command::Generate { billing, out_dir } = cli.command else {
            panic!("expected generate");
        };
        let overrides = billing.overrides();

        assert_eq!(out_dir, PathBuf::from("."));
        assert_eq!(billing.csv, PathBuf::from("leads.csv"));
        assert_eq!(overrides.month, Some(3));
        assert_eq!(overrides.price.as_deref(), Some("250"));
        assert!(overrides.filter_by_status);
        assert!(!overrides.filter_by_date);
        assert!(!overrides.require_mls);
    }
}
