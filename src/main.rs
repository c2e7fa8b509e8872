use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use dracve::app::correction_use_case::{CorrectionResult, CorrectionUseCase};
use dracve::app::reconcile_use_case::{ReconcileUseCase, SourceFileSet};
use dracve::config::Config;
use dracve::domain::{ConsolidatedView, Row};
use dracve::error::ReconError;
use dracve::infra::collaborator_client::CollaboratorClient;
use dracve::infra::source_reader::FsSourceReader;
use dracve::pipeline::tabular;
use dracve::{logging, report};

#[derive(Parser)]
#[command(name = "dracve")]
#[command(about = "Supply chain data reconciliation and visibility engine")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Legacy system export (.csv)
    #[arg(long)]
    legacy: PathBuf,

    /// Manually maintained spreadsheet export (.csv)
    #[arg(long)]
    spreadsheet: PathBuf,

    /// Supplier shipment feed (.csv)
    #[arg(long)]
    supplier: PathBuf,

    /// Reverse logistics / returns feed (.csv), optional
    #[arg(long)]
    returns: Option<PathBuf>,

    /// Historical backup export (.csv), optional
    #[arg(long)]
    historical: Option<PathBuf>,

    /// Directory for exported artifacts
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Field delimiter override (defaults to the configured delimiter)
    #[arg(long)]
    delimiter: Option<char>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the local reconciliation pipeline and export the consolidated view
    Reconcile {
        #[command(flatten)]
        sources: SourceArgs,
    },
    /// Run the pipeline plus the external correction round trip
    Correct {
        #[command(flatten)]
        sources: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Reconcile { sources } => run(sources, config, false).await,
        Commands::Correct { sources } => run(sources, config, true).await,
    }
}

async fn run(args: SourceArgs, mut config: Config, with_correction: bool) -> anyhow::Result<()> {
    if let Some(delimiter) = args.delimiter {
        config.reconcile.delimiter = delimiter;
    }
    let delimiter = config.reconcile.delimiter;

    let files = SourceFileSet {
        legacy: Some(args.legacy),
        spreadsheet: Some(args.spreadsheet),
        supplier: Some(args.supplier),
        reverse_logistics: args.returns,
        historical: args.historical,
    };

    println!("🔄 Reconciling source exports...");
    let use_case = ReconcileUseCase::new(Box::new(FsSourceReader), config.reconcile.clone());
    let outcome = use_case.run(&files).await?;

    println!("\n📊 {outcome}");
    write_consolidated(&outcome.consolidated, &args.out_dir, delimiter)?;
    println!("💾 Saved consolidated exports to {}", args.out_dir.display());

    if !with_correction {
        return Ok(());
    }

    println!("\n🤖 Requesting corrections from the collaborator...");
    let api_key = std::env::var("API_KEY")
        .context("API_KEY not set; export it or add it to a .env file")?;
    let client = CollaboratorClient::new(&config.collaborator, api_key)?;
    let correction = CorrectionUseCase::new(Box::new(client));

    match correction.run(&outcome).await {
        Ok(result) => {
            println!("\n{}", report::render_report(&result.corrected.report));
            write_corrected(&result, &args.out_dir, delimiter)?;
            println!("✅ Corrected exports saved to {}", args.out_dir.display());
        }
        // Both collaborator failure classes keep the local results on disk;
        // they differ only in how they are reported.
        Err(ReconError::Contract(message)) => {
            error!("collaborator contract violation: {message}");
            println!("❌ The collaborator returned a malformed response; the local reconciliation results above remain valid.");
        }
        Err(ReconError::Transport(cause)) => {
            error!("collaborator transport failure: {cause}");
            println!("❌ The correction service is unavailable; the local reconciliation results above remain valid.");
        }
        Err(other) => return Err(other.into()),
    }

    Ok(())
}

fn write_consolidated(
    view: &ConsolidatedView,
    out_dir: &Path,
    delimiter: char,
) -> std::io::Result<()> {
    std::fs::create_dir_all(out_dir)?;
    write_rows(&view.inventory, &out_dir.join("consolidated_inventory.csv"), delimiter)?;
    write_rows(&view.orders, &out_dir.join("consolidated_orders.csv"), delimiter)?;
    write_rows(&view.returns, &out_dir.join("consolidated_returns.csv"), delimiter)?;
    Ok(())
}

fn write_corrected(
    result: &CorrectionResult,
    out_dir: &Path,
    delimiter: char,
) -> std::io::Result<()> {
    std::fs::create_dir_all(out_dir)?;
    let corrected = &result.corrected;
    write_rows(
        &corrected.consolidated_inventory,
        &out_dir.join("corrected_inventory.csv"),
        delimiter,
    )?;
    write_rows(
        &corrected.consolidated_orders,
        &out_dir.join("corrected_orders.csv"),
        delimiter,
    )?;
    write_rows(
        &corrected.consolidated_returns,
        &out_dir.join("corrected_returns.csv"),
        delimiter,
    )?;

    // The per-source rows with fixes written back, for re-import into the
    // systems the exports came from.
    write_rows(
        &result.merged_sources.legacy,
        &out_dir.join("merged_legacy.csv"),
        delimiter,
    )?;
    write_rows(
        &result.merged_sources.spreadsheet,
        &out_dir.join("merged_spreadsheet.csv"),
        delimiter,
    )?;

    std::fs::write(
        out_dir.join("report.txt"),
        report::render_report(&corrected.report),
    )?;
    info!(out_dir = %out_dir.display(), "corrected artifacts written");
    Ok(())
}

fn write_rows(rows: &[Row], path: &Path, delimiter: char) -> std::io::Result<()> {
    std::fs::write(path, tabular::render_delimited(rows, delimiter))
}
