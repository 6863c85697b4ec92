use anyhow::{Context, Result};
use clap::Parser;
use famtree::source::load_path;
use famtree::{pipeline, Config};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "famtree")]
#[command(about = "Render one family-tree diagram per person from TEI genealogy records")]
struct Args {
    /// TEI file or directory of TEI files (overrides dataset.path)
    input: Option<PathBuf>,

    /// Omit partner edges from the diagrams
    #[arg(long)]
    no_partners: bool,

    /// Only draw the tree of this person (repeatable)
    #[arg(short, long = "anchor", value_name = "ID")]
    anchors: Vec<String>,

    /// Output directory (overrides output.directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format: dot, json, pdf, svg or png (overrides output.format)
    #[arg(short, long)]
    format: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.general.log_level.as_str())
    ).init();

    if let Some(input) = args.input {
        config.dataset.path = input;
    }
    if args.no_partners {
        config.graph.include_partners = false;
    }
    if !args.anchors.is_empty() {
        config.graph.anchors = args.anchors;
    }
    if let Some(dir) = args.output_dir {
        config.output.directory = dir;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    config.validate()?;

    log::info!("Starting famtree v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Dataset: {}", config.dataset_path().display());
    log::info!("Output: {} ({})", config.output_dir().display(), config.output.format);

    let source = load_path(config.dataset_path())
        .with_context(|| format!("Failed to load dataset {}", config.dataset_path().display()))?;

    if source.is_empty() {
        log::warn!("No person records found. Check dataset.path in famtree.toml.");
        return Ok(());
    }

    let summary = pipeline::run(&source, &config)?;

    log::info!("=== Family trees complete ===");
    log::info!("Persons: {}", summary.persons);
    log::info!("Diagrams written: {}", summary.outputs.len());
    log::info!("Data integrity issues: {}", summary.issues.len());
    if !summary.failures.is_empty() {
        log::warn!("Failed anchors: {}", summary.failures.len());
    }

    if summary.outputs.is_empty() && !summary.failures.is_empty() {
        anyhow::bail!("every anchor failed to render");
    }

    Ok(())
}
