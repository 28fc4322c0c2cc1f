use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use graph_document::import::build_forest;
use graph_document::persistence::{load_document, save_document};
use graph_document::{
    ConverterConfig, Diagnostics, Exporter, FileSystem, Graph, Importer, PrototypeRegistry,
};

/// Inspect, validate and convert graph documents
#[derive(Debug, Parser)]
#[command(name = "graph_document")]
#[command(version)]
struct Cli {
    /// Converter configuration file (JSON)
    #[arg(long, global = true, env = "GRAPH_DOCUMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize a document: containers by depth, creation order, counts
    Inspect { document: PathBuf },

    /// Import a document into a fresh graph and export it again
    Convert {
        document: PathBuf,

        /// Node type catalog (JSON); the built-in types are used when omitted
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Check document structure and container hierarchy only
    Validate { document: PathBuf },
}

fn main() {
    let Err(error) = run() else {
        process::exit(0);
    };
    log::error!("{:#}", error);
    eprintln!("Error: {:#}", error);
    process::exit(1);
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();

    let config = match &cli.config {
        Some(path) => ConverterConfig::load(path)?,
        None => ConverterConfig::default(),
    };

    match cli.command {
        Command::Inspect { document } => inspect(&document),
        Command::Validate { document } => validate(&document),
        Command::Convert {
            document,
            catalog,
            out,
        } => convert(&config, &document, catalog.as_deref(), out.as_deref()),
    }
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let document = load_document(&FileSystem, path)?;
    let mut diagnostics = Diagnostics::new();
    let forest = build_forest(&document, &mut diagnostics);
    let order = forest
        .creation_order(&mut diagnostics)
        .context("Failed to resolve container hierarchy")?;

    println!("{}", path.display());
    println!("  containers:  {}", forest.len());
    println!("  nodes:       {}", document.node_count());
    println!("  connections: {}", document.connection_count());
    println!("  creation order:");
    for id in &order {
        let depth = forest.depth_of(id)?;
        let nodes = document.group(id).map_or(0, |g| g.components.len());
        println!("    {}{} ({} nodes)", "  ".repeat(depth), id, nodes);
    }
    if !diagnostics.is_empty() {
        println!("{}", diagnostics.render());
    }
    Ok(())
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let document = load_document(&FileSystem, path)?;
    let mut diagnostics = Diagnostics::new();
    let forest = build_forest(&document, &mut diagnostics);
    forest.validate()?;
    forest.creation_order(&mut diagnostics)?;

    if !diagnostics.is_empty() {
        println!("{}", diagnostics.render());
    }
    if diagnostics.has_errors() {
        bail!("{} is not a valid document", path.display());
    }
    println!("{}: valid", path.display());
    Ok(())
}

fn convert(
    config: &ConverterConfig,
    path: &Path,
    catalog: Option<&Path>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let mut registry = match catalog {
        Some(catalog) => PrototypeRegistry::from_catalog(catalog)?,
        None => PrototypeRegistry::builtin(),
    };
    registry.extend_aliases(&config.aliases);

    let document = load_document(&FileSystem, path)?;
    let mut graph = Graph::new();
    let mut diagnostics = Diagnostics::new();

    let mut importer = Importer::new(&registry, config.import.clone());
    let imported = importer.import(&document, &mut graph, &mut diagnostics)?;
    log::info!(
        "Import: {} containers, {} nodes, {} connections",
        imported.containers,
        imported.nodes,
        imported.connections
    );

    let mut exporter = Exporter::new(config.export.clone());
    let exported = exporter.export(&graph, &mut diagnostics)?;

    match out {
        Some(out) => save_document(&FileSystem, out, &exported)?,
        None => println!("{}", exported.to_json_pretty()?),
    }

    for warning in diagnostics.warnings() {
        eprintln!("{}", warning);
    }
    Ok(())
}
