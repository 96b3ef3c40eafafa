mod config;
mod logging;

use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use dalschema_core::{DatabaseSnapshot, Error as CoreError, validate_snapshot};
use dalschema_introspect::{LoaderOptions, SnapshotLoader, TiberiusExecutor};
use schemars::schema_for;
use thiserror::Error;

use config::{CONNECTION_ENV, ConfigError, FileConfig};
use logging::{LogFormat, init_logging};

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("snapshot of {database} is incomplete: {errors} phase error(s)")]
    PartialLoad { database: String, errors: usize },
}

#[derive(Parser, Debug)]
#[command(name = "dalschema", version, about = "SQL Server schema snapshot loader")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a schema snapshot and write it as JSON.
    Load(LoadArgs),
    /// Print the JSON schema of the snapshot format.
    Schema,
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Database to load.
    #[arg(long, short = 'd')]
    database: Option<String>,
    /// ADO.NET connection string (falls back to DALSCHEMA_CONNECTION).
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
    /// TOML file with `connection`, `database`, and `skip_phases` keys.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output path for the snapshot; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Phase to skip (columns, stored_procedures, functions, constraints, default_values).
    #[arg(long = "skip-phase", value_name = "PHASE")]
    skip_phases: Vec<String>,
    /// Fail when foreign keys reference tables or columns missing from the snapshot.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Accept the server certificate without validation.
    #[arg(long, default_value_t = false)]
    trust_server_certificate: bool,
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Load(args) => run_load(args).await,
        Command::Schema => print_json_schema(),
    }
}

async fn run_load(args: LoadArgs) -> Result<(), CliError> {
    init_logging(args.log_format).map_err(CliError::Logging)?;

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = config::resolve(
        args.database,
        args.conn,
        &args.skip_phases,
        file,
        std::env::var(CONNECTION_ENV).ok(),
    )?;

    tracing::info!(
        event = "run_started",
        database = %settings.database,
        connection = %settings.connection,
        skipped_phases = settings.skip_phases.len()
    );
    let timer = Instant::now();

    let executor = TiberiusExecutor::new().trust_server_certificate(args.trust_server_certificate);
    let options = LoaderOptions {
        skip_phases: settings.skip_phases,
    };
    let mut loader = SnapshotLoader::with_options(executor, options);
    let consistent = loader
        .load_snapshot(&settings.database, settings.connection)
        .await?;
    let snapshot = loader.into_snapshot();

    write_snapshot(&snapshot, args.out.as_deref())?;
    if let Some(path) = &args.out {
        tracing::info!(event = "snapshot_written", path = %path.display());
    }

    for error in &snapshot.errors {
        eprintln!("{error}");
    }

    if args.strict {
        validate_snapshot(&snapshot)?;
    }

    let duration_ms = timer.elapsed().as_millis();
    if !consistent {
        tracing::warn!(event = "run_finished", status = "partial", duration_ms = duration_ms);
        return Err(CliError::PartialLoad {
            database: snapshot.name.clone(),
            errors: snapshot.errors.len(),
        });
    }

    tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);
    Ok(())
}

fn write_snapshot(snapshot: &DatabaseSnapshot, out: Option<&Path>) -> Result<(), CliError> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(path)?;
            serde_json::to_writer_pretty(file, snapshot)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, snapshot)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn print_json_schema() -> Result<(), CliError> {
    let schema = schema_for!(DatabaseSnapshot);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
