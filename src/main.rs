use std::path::PathBuf;

use betpool_resync::config::{BackendSettings, DEFAULT_BATCH_SIZE, ResyncOptions};
use betpool_resync::io::memory::MemoryBackend;
use betpool_resync::io::rest::RestBackend;
use betpool_resync::io::workbook::WorkbookSource;
use betpool_resync::orchestrator::run_full_resync;
use betpool_resync::{Result, ResyncError};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    init_logging()?;
    match cli.command {
        Command::Resync(args) => execute_resync(args),
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ResyncError::Logging(err.to_string()))
}

fn execute_resync(args: ResyncArgs) -> Result<i32> {
    let options = ResyncOptions::default().with_batch_size(args.batch_size)?;

    let report = if args.dry_run {
        run_full_resync(
            || Ok((WorkbookSource::open(&args.workbook)?, MemoryBackend::new())),
            options,
        )
    } else {
        run_full_resync(
            || {
                let settings = args.backend_settings()?;
                let sheets = WorkbookSource::open(&args.workbook)?;
                let backend = RestBackend::connect(&settings)?;
                Ok((sheets, backend))
            },
            options,
        )
    };

    print!("{report}");
    if let Some(path) = &args.report {
        if let Err(err) = report.write_json(path) {
            warn!(path = %path.display(), error = %err, "failed to write run report");
        }
    }

    Ok(report.exit_code())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Rebuild the betting pool backend from its spreadsheet."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wipe and rebuild every backend table from the workbook.
    Resync(ResyncArgs),
}

#[derive(clap::Args)]
struct ResyncArgs {
    /// Path of the `.xlsx` export of the pool spreadsheet.
    #[arg(long)]
    workbook: PathBuf,

    /// Base URL of the REST backend, e.g. `https://host/rest/v1`.
    #[arg(long, env = "BETPOOL_BACKEND_URL")]
    backend_url: Option<String>,

    /// API key sent with every backend request.
    #[arg(long, env = "BETPOOL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Records per upsert call.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Write the run report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Run against an in-memory backend instead of the real one.
    #[arg(long)]
    dry_run: bool,
}

impl ResyncArgs {
    fn backend_settings(&self) -> Result<BackendSettings> {
        match (&self.backend_url, &self.api_key) {
            (Some(base_url), Some(api_key)) => Ok(BackendSettings {
                base_url: base_url.clone(),
                api_key: api_key.clone(),
            }),
            _ => Err(ResyncError::Connection(
                "--backend-url and --api-key are required unless --dry-run is set".to_string(),
            )),
        }
    }
}
