use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    config::{load_settings_from, normalize_database_url, SETTINGS_FILE},
    RemoteClient, WsopClient,
};
use lifecycle::{
    Action, Collaborators, CommentOutcome, GridSurface, LifecycleError, MemoryGrid, Notifier,
    RemoteSurface, StateSynchronizer, SystemClock, TransitionReport, VisualSurface,
};
use shared::domain::CellCoordinate;
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Run one workshop operation action against a grid snapshot")]
struct Args {
    /// Grid snapshot to act on. Written back after the action.
    #[arg(long, default_value = "grid.json")]
    grid: PathBuf,
    /// Acted-on cell as ROW:COLUMN; defaults to the snapshot's active cell.
    #[arg(long)]
    cell: Option<String>,
    /// Where confirmed colours and notes are applied.
    #[arg(long, value_enum, default_value_t = PaintMode::Remote)]
    paint: PaintMode,
    #[arg(long, default_value = SETTINGS_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PaintMode {
    /// Write the snapshot directly.
    Local,
    /// Ask the backend to paint the shared sheet.
    Remote,
}

#[derive(Subcommand, Debug)]
enum Command {
    Start,
    Close {
        /// Used manhours in minutes.
        duration: String,
    },
    Comment {
        text: String,
    },
    DeleteComment,
    Edit {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    Clear,
    /// Show the resolved context of the acted-on cell.
    Context,
    Info,
    Update,
    Health,
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

fn parse_cell(raw: &str) -> Result<CellCoordinate> {
    let (row, column) = raw
        .split_once(':')
        .with_context(|| format!("cell must be ROW:COLUMN, got '{raw}'"))?;
    let row = row.trim().parse().context("invalid cell row")?;
    let column = column.trim().parse().context("invalid cell column")?;
    Ok(CellCoordinate::new(row, column)?)
}

fn print_report(report: &TransitionReport) -> Result<()> {
    let status = report.status.map_or("none", |s| s.as_str());
    println!("{} {} status={status}", report.cell, report.state());
    println!("{}", serde_json::to_string_pretty(&report.payload)?);
    if let Some(err) = &report.apply_error {
        eprintln!("cause: {err}");
    }
    Ok(())
}

async fn run(sync: &StateSynchronizer, command: Command) -> Result<(), LifecycleError> {
    let action = match command {
        Command::Start => Action::Start,
        Command::Close { duration } => Action::Close { duration },
        Command::Edit { start, end } => Action::Edit { start, end },
        Command::Clear => Action::Clear,
        Command::Comment { text } => {
            report_comment(sync.save_comment(&text).await?);
            return Ok(());
        }
        Command::DeleteComment => {
            report_comment(sync.delete_comment().await?);
            return Ok(());
        }
        Command::Context => {
            let context = sync.active_context().await?;
            print_json(&context);
            return Ok(());
        }
        Command::Info => {
            let info = sync.job_card_info().await?;
            print_json(&info);
            return Ok(());
        }
        Command::Update => {
            sync.dataflow_update().await?;
            println!("dataflow update complete");
            return Ok(());
        }
        Command::Health => {
            let health = sync.health().await?;
            println!("ok={} status={} body={}", health.ok, health.status, health.body);
            return Ok(());
        }
    };

    let report = sync.run(action).await?;
    if let Err(err) = print_report(&report) {
        eprintln!("failed to print report: {err}");
    }
    Ok(())
}

fn report_comment(outcome: CommentOutcome) {
    match outcome {
        CommentOutcome::Written(report) => {
            println!("{} comment saved", report.cell);
            if let Some(err) = report.apply_error {
                eprintln!("cause: {err}");
            }
        }
        CommentOutcome::Noop => println!("empty comment, nothing saved"),
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(raw) => println!("{raw}"),
        Err(err) => eprintln!("failed to encode output: {err}"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = load_settings_from(&args.config, |key| std::env::var(key).ok());
    settings.validate()?;

    let grid = Arc::new(MemoryGrid::load(&args.grid)?);
    if let Some(raw) = &args.cell {
        grid.select(Some(parse_cell(raw)?)).await;
    }

    let storage = Arc::new(Storage::new(&normalize_database_url(&settings.database_url)).await?);
    let wsop = Arc::new(WsopClient::new(RemoteClient::from_settings(&settings)));
    let surface: Arc<dyn VisualSurface> = match args.paint {
        PaintMode::Local => Arc::new(GridSurface::new(grid.clone())),
        PaintMode::Remote => Arc::new(RemoteSurface::new(wsop.clone())),
    };
    info!(
        api_base = %settings.api_base,
        sheet = %settings.operational_sheet,
        paint = ?args.paint,
        "operator action starting"
    );

    let sync = StateSynchronizer::new(
        Collaborators {
            grid: grid.clone(),
            grants: storage.clone(),
            backend: wsop,
            surface,
            audit: storage,
            notifier: Arc::new(ConsoleNotifier),
            clock: Arc::new(SystemClock::new(settings.time_zone())),
        },
        settings.operational_sheet.clone(),
    );

    let outcome = run(&sync, args.command).await;
    grid.save(&args.grid).await?;

    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        // Already shown to the operator by the notifier.
        Err(_) => ExitCode::FAILURE,
    })
}
