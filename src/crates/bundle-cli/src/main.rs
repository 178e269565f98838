//! # bundlectl
//!
//! Developer tool for bundle descriptors: print the topological order,
//! translate to an execution graph, render it, or just check it translates.

use anyhow::{Context, Result};
use bundle_graph::{
    topological_sort, visualize, BundleDescriptor, ExecutionGraph, TranslateConfig, Translator,
    VisualizationOptions,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bundlectl")]
#[command(about = "Inspect and translate bundle descriptors", long_about = None)]
#[command(version)]
struct Cli {
    /// Translator settings (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `bundle_graph=trace`
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print transforms in topological order with the producer of each collection
    Sort {
        /// Descriptor file (.json, .yaml or .yml)
        file: PathBuf,
    },

    /// Translate and print a JSON summary of the execution graph
    Translate {
        /// Descriptor file (.json, .yaml or .yml)
        file: PathBuf,
    },

    /// Translate and render the execution graph
    Render {
        /// Descriptor file (.json, .yaml or .yml)
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = RenderFormat::Ascii)]
        format: RenderFormat,

        /// Include function names, ports and coder ids
        #[arg(long)]
        details: bool,

        /// Diagram title (defaults to the descriptor id)
        #[arg(long)]
        title: Option<String>,
    },

    /// Report whether the descriptor translates
    Check {
        /// Descriptor file (.json, .yaml or .yml)
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RenderFormat {
    Dot,
    Mermaid,
    Ascii,
}

impl RenderFormat {
    fn options(self) -> VisualizationOptions {
        match self {
            Self::Dot => VisualizationOptions::dot(),
            Self::Mermaid => VisualizationOptions::mermaid(),
            Self::Ascii => VisualizationOptions::ascii(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log filter '{}'", cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => TranslateConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TranslateConfig::default(),
    };

    match cli.command {
        Commands::Sort { file } => sort_bundle(&file, &config),
        Commands::Translate { file } => translate_bundle(&file, &config),
        Commands::Render {
            file,
            format,
            details,
            title,
        } => render_bundle(&file, &config, format, details, title),
        Commands::Check { file } => check_bundle(&file, &config),
    }
}

fn load(file: &Path) -> Result<BundleDescriptor> {
    let descriptor = BundleDescriptor::from_file(file)
        .with_context(|| format!("failed to load descriptor {}", file.display()))?;
    tracing::info!(
        file = %file.display(),
        bundle = %descriptor.id,
        transforms = descriptor.transforms.len(),
        "loaded descriptor"
    );
    Ok(descriptor)
}

fn translate(descriptor: &BundleDescriptor, config: &TranslateConfig) -> Result<ExecutionGraph> {
    Translator::with_config(config.clone())
        .translate(descriptor)
        .with_context(|| format!("bundle '{}' failed to translate", descriptor.id))
}

fn sort_bundle(file: &Path, config: &TranslateConfig) -> Result<()> {
    let descriptor = load(file)?;
    let sorted = topological_sort(&descriptor, config.consumer_lookup)
        .with_context(|| format!("bundle '{}' could not be sorted", descriptor.id))?;

    println!("Order ({}):", sorted.order.len());
    for (position, id) in sorted.order.iter().enumerate() {
        println!("  {}. {}", position + 1, id);
    }

    let mut collections: Vec<&str> = descriptor.pcollections.keys().map(String::as_str).collect();
    collections.sort_unstable();

    println!("\nProducers:");
    for collection in collections {
        match sorted.provenance.producer(collection) {
            Some(producer) => println!("  {} <- {}", collection, producer.transform_id),
            None => println!("  {} <- (none)", collection),
        }
    }
    Ok(())
}

fn translate_bundle(file: &Path, config: &TranslateConfig) -> Result<()> {
    let descriptor = load(file)?;
    let graph = translate(&descriptor, config)?;
    println!("{}", serde_json::to_string_pretty(&graph.summary())?);
    Ok(())
}

fn render_bundle(
    file: &Path,
    config: &TranslateConfig,
    format: RenderFormat,
    details: bool,
    title: Option<String>,
) -> Result<()> {
    let descriptor = load(file)?;
    let graph = translate(&descriptor, config)?;

    let mut options = format
        .options()
        .with_title(title.unwrap_or_else(|| descriptor.id.clone()));
    if details {
        options = options.with_details();
    }
    print!("{}", visualize(&graph, &options));
    Ok(())
}

fn check_bundle(file: &Path, config: &TranslateConfig) -> Result<()> {
    let descriptor = load(file)?;
    let graph = translate(&descriptor, config)?;
    graph
        .check_invariants()
        .map_err(anyhow::Error::msg)
        .context("translated graph is inconsistent")?;

    println!("✓ Bundle '{}' translates", descriptor.id);
    println!("  Transforms: {}", descriptor.transforms.len());
    println!("  Nodes: {}", graph.nodes().len());
    println!("  Edges: {}", graph.edges().len());
    Ok(())
}
