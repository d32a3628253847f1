//! pdf-annotate
//!
//! Batch host for the annotation engine: inspects page geometry and replays
//! gesture scripts against a PDF, writing the committed result.

mod script;

use std::path::{Path, PathBuf};

use annotate_core::{EngineConfig, LopdfBackend, LopdfDocument, PdfSession, ToolProfile};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdf-annotate")]
#[command(version, about = "Draw redactions, text and form fields onto PDF pages")]
struct Args {
    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page geometry as JSON
    Info {
        /// Input PDF
        file: PathBuf,
    },
    /// Replay a gesture script and write the committed PDF
    Apply {
        /// Input PDF
        file: PathBuf,

        /// JSON gesture script
        #[arg(long)]
        script: PathBuf,

        /// Tool profile: redact, forms or text
        #[arg(long, default_value = "redact")]
        tool: ToolProfile,

        /// Render scale the script's pixel coordinates refer to
        #[arg(long)]
        scale: Option<f64>,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Info { file } => info(&file, config),
        Command::Apply {
            file,
            script,
            tool,
            scale,
            out,
        } => apply(&file, &script, tool, scale, &out, config),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    EngineConfig::from_toml_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn open(
    file: &Path,
    tool: ToolProfile,
    config: EngineConfig,
) -> Result<PdfSession<LopdfDocument>> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    PdfSession::open(&LopdfBackend, name, bytes, tool, config)
        .with_context(|| format!("Failed to open {}", file.display()))
}

fn info(file: &Path, config: EngineConfig) -> Result<()> {
    let session = open(file, ToolProfile::Redactor, config)?;
    let report = serde_json::json!({
        "file": session.name(),
        "page_count": session.page_count(),
        "pages": session.pages(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn apply(
    file: &Path,
    script_path: &Path,
    tool: ToolProfile,
    scale: Option<f64>,
    out: &Path,
    config: EngineConfig,
) -> Result<()> {
    let text = std::fs::read_to_string(script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let steps = script::parse(&text)?;

    let mut session = open(file, tool, config)?;
    if let Some(scale) = scale {
        session.set_scale(scale)?;
    }

    let created = script::replay(&mut session, &steps)?;
    tracing::info!(steps = steps.len(), created, "script replayed");

    let bytes = session.commit(&LopdfBackend)?;
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;
    let target = out.join(session.output_filename());
    std::fs::write(&target, &bytes)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!("{}", target.display());
    Ok(())
}
