use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod explode;
mod export;
mod inputter;
mod loader;
mod model;
mod table;
mod ui;

use controller::Controller;
use domain::{Message, RexConfig, RexError};
use explode::{Selection, explode};
use model::{Model, Status};

#[derive(Parser, Debug)]
#[command(
    name = "rex",
    version,
    about = "Explode multi-line cells of tabular data into rows"
)]
struct Cli {
    /// Input file (csv, parquet, arrow ipc or xlsx)
    file: String,

    /// Target column name
    #[arg(short, long)]
    column: Option<String>,

    /// 0-based row index, selects a single cell of the target column
    #[arg(short, long)]
    row: Option<usize>,

    /// Literal cell text to match, \n escapes are expanded
    #[arg(short = 'm', long = "match")]
    match_text: Option<String>,

    /// Output file (.csv or .xlsx); skips the UI and runs one
    /// load -> explode -> write pipeline
    #[arg(short, long)]
    output: Option<String>,

    /// Maximum rendered column width
    #[arg(long)]
    max_column_width: Option<usize>,

    /// Append logs to this file (filtered by RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(cli: Cli) -> Result<(), RexError> {
    init_logging(cli.log_file.as_deref())?;

    let path = expand_path(&cli.file)?;
    if cli.output.is_some() {
        return run_headless(path, &cli);
    }

    let mut cfg = RexConfig::default();
    if let Some(width) = cli.max_column_width {
        cfg = cfg.max_column_width(width);
    }
    let mut model = Model::load(path, cfg.clone())?;
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), RexError> {
        let size = terminal.size()?;
        model.update(Message::Resize(size.width as usize, size.height as usize))?;

        while model.status != Status::QUITTING {
            terminal.draw(|f| ui::draw(&model, f))?;
            if let Some(message) = controller.handle_event(&model)? {
                model.update(message)?;
            }
        }
        Ok(())
    })();
    ratatui::restore();
    result
}

fn run_headless(path: PathBuf, cli: &Cli) -> Result<(), RexError> {
    let table = loader::load(path)?;
    let selection = selection_from_args(cli)?;
    info!("Headless explode with {selection:?}");

    let exploded = explode(&table, &selection)?;
    let output = expand_path(cli.output.as_deref().unwrap_or_default())?;
    export::write(&exploded, &output)?;
    println!(
        "Wrote {} rows ({} before) to {}",
        exploded.nrows(),
        table.nrows(),
        output.display()
    );
    Ok(())
}

fn selection_from_args(cli: &Cli) -> Result<Selection, RexError> {
    let column = cli.column.clone().ok_or_else(|| {
        RexError::InvalidSelection("--column is required together with --output".into())
    })?;
    match (cli.row, cli.match_text.as_deref()) {
        (Some(_), Some(_)) => Err(RexError::InvalidSelection(
            "--row and --match are mutually exclusive".into(),
        )),
        (Some(row), None) => Ok(Selection::SingleCell { row, column }),
        (None, Some(text)) => Ok(Selection::LiteralMatch {
            column,
            text: inputter::unescape(text),
        }),
        (None, None) => Ok(Selection::WholeColumn { column }),
    }
}

fn expand_path(raw: &str) -> Result<PathBuf, RexError> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| RexError::LoadingFailed(format!("bad path \"{raw}\": {e}")))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn init_logging(log_file: Option<&std::path::Path>) -> Result<(), RexError> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    info!("Started rex");
    Ok(())
}
