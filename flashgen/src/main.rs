//! flashgen - headless flashcard generation client
//!
//! Drives the full generation workflow against a backend job service:
//! reads the notes file, configures the request, submits the task, polls
//! until completion, and writes the downloaded file to disk.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use flashgen::{GenerationController, HttpTaskClient, SessionStore, ViewState, WorkflowPresenter};
use flashgen_common::models::{ExportFormat, Language, Mode};
use flashgen_common::GeneratorConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LangArg {
    En,
    De,
}

impl From<LangArg> for Language {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Language::English,
            LangArg::De => Language::German,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Practice,
    Definitions,
    MultipleChoice,
    OpenEnded,
}

impl From<ModeArg> for Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Practice => Mode::Practice,
            ModeArg::Definitions => Mode::Definitions,
            ModeArg::MultipleChoice => Mode::MultipleChoice,
            ModeArg::OpenEnded => Mode::OpenEnded,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Apkg,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Apkg => ExportFormat::Apkg,
        }
    }
}

/// Generate flashcards from a notes file
#[derive(Parser, Debug)]
#[command(name = "flashgen", version)]
struct Args {
    /// Notes file to generate flashcards from
    #[arg(long)]
    input: PathBuf,

    /// Flashcard language
    #[arg(long, value_enum)]
    lang: LangArg,

    /// Generation mode
    #[arg(long, value_enum)]
    mode: ModeArg,

    /// Export file format
    #[arg(long, value_enum, default_value = "csv")]
    format: FormatArg,

    /// Backend job service URL (overrides the config file)
    #[arg(long, env = "FLASHGEN_SERVER")]
    server: Option<String>,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session state database path
    #[arg(long, default_value = "flashgen-session.db")]
    state_db: PathBuf,

    /// Directory to write the generated file into
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Loading config from {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(server) = &args.server {
        config.base_url = server.clone();
    }

    info!("flashgen {} starting", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}", config.base_url);
    info!("Session database: {}", args.state_db.display());

    let input_text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Reading notes from {}", args.input.display()))?;

    let pool = flashgen::db::init_database_pool(&args.state_db).await?;
    let store = SessionStore::new(pool);
    let client = Arc::new(HttpTaskClient::new(&config.base_url)?);
    let controller = Arc::new(GenerationController::new(
        config.clone(),
        client,
        store,
    ));
    controller.initialize().await?;
    let presenter = WorkflowPresenter::new(Arc::clone(&controller), config);

    rewind_to_upload(&presenter).await?;

    presenter.set_input_text(input_text).await?;
    presenter.advance().await.context("Input text rejected")?;
    presenter.set_language(args.lang.into()).await?;
    presenter.set_mode(args.mode.into()).await?;
    presenter.set_export_format(args.format.into()).await?;

    let task_id = presenter.generate().await.context("Submission failed")?;
    info!("Task {} submitted, waiting for completion", task_id);

    let mut last_line = String::new();
    loop {
        match presenter.view().await {
            ViewState::Wait {
                task_state,
                current_batch,
                total_batches,
                percent_complete,
                error,
                ..
            } => {
                if let Some(error) = error {
                    bail!("Generation failed: {}", error);
                }
                let line = match (current_batch, total_batches, percent_complete) {
                    (Some(current), Some(total), Some(percent)) => {
                        format!("{}: batch {}/{} ({:.0}%)", task_state, current, total, percent)
                    }
                    _ => format!("{}", task_state),
                };
                if line != last_line {
                    info!("{}", line);
                    last_line = line;
                }
            }
            ViewState::Complete { .. } => break,
            other => bail!("Unexpected workflow state: {:?}", other),
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    let file = presenter.download().await.context("Download failed")?;
    let output_path = args.output_dir.join(&file.filename);
    std::fs::write(&output_path, &file.bytes)
        .with_context(|| format!("Writing {}", output_path.display()))?;
    info!("Saved {} ({} bytes)", output_path.display(), file.bytes.len());

    Ok(())
}

/// Bring a restored session back to the upload step so a fresh run can start
async fn rewind_to_upload(presenter: &WorkflowPresenter) -> Result<()> {
    loop {
        match presenter.view().await {
            ViewState::UploadText { .. } => return Ok(()),
            ViewState::Configure { .. } => presenter.back().await?,
            ViewState::Wait { .. } => presenter.cancel().await?,
            ViewState::Complete { .. } => presenter.reset().await?,
        };
    }
}
