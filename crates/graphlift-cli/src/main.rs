//! graphlift command-line driver.
//!
//! Provides the `graphlift` binary: lift a source file into graph JSON,
//! lift a composite class, print a lifted graph re-lowered to source, and
//! check that re-lowering round-trips.
//!
//! Exit codes: 0 = success, 1 = round-trip mismatch, 2 = the unit could not
//! be read, parsed or lifted.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use graphlift_codegen::{check_roundtrip, relower_with_composites, CodegenError, CodegenOptions};
use graphlift_core::{CoreError, StaticRegistry};
use graphlift_lift::{lift_composite_module, lift_graph_module, LiftConfig, LiftError};
use graphlift_syntax::parse_module;
use tracing::Level;

/// Lift statement source into node graphs and back.
#[derive(Parser)]
#[command(name = "graphlift", about = "Lift statement source into node graphs and back")]
struct Cli {
    /// Node registry JSON (`{"nodes": [...]}`). Without one only the
    /// builtin branch, loop and local-variable kinds resolve.
    #[arg(long, global = true, env = "GRAPHLIFT_REGISTRY")]
    registry: Option<PathBuf>,

    /// Lift configuration JSON. Missing fields take their defaults.
    #[arg(long, global = true, env = "GRAPHLIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log more on stderr (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lift the graph class of a file; print `{graph, diagnostics}` JSON.
    Lift { file: PathBuf },

    /// Lift the first `@composite_class` class of a file; print its graph,
    /// pins and diagnostics as JSON.
    Composite { file: PathBuf },

    /// Lift a file and print the graph re-lowered to source.
    Relower {
        file: PathBuf,

        /// Spaces per indentation level.
        #[arg(long, default_value_t = 4)]
        indent: usize,

        /// First argument of every call; pass an empty string for none.
        #[arg(long, default_value = "self.game")]
        context: String,
    },

    /// Lift, re-lower and lift again; exit 1 when the graphs differ.
    CheckRoundtrip { file: PathBuf },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("registry: {0}")]
    Registry(#[from] CoreError),

    #[error(transparent)]
    Lift(#[from] LiftError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            2
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<i32, CliError> {
    let registry = match &cli.registry {
        Some(path) => StaticRegistry::from_json(&read(path)?)?,
        None => StaticRegistry::with_builtins(),
    };
    let config = match &cli.config {
        Some(path) => LiftConfig::from_json(&read(path)?)?,
        None => LiftConfig::default(),
    };
    tracing::debug!(nodes = registry.len(), "registry loaded");

    match &cli.command {
        Commands::Lift { file } => {
            let module = parse_module(&read(file)?).map_err(LiftError::from)?;
            let output = lift_graph_module(&module, &registry, &config)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(0)
        }
        Commands::Composite { file } => {
            let module = parse_module(&read(file)?).map_err(LiftError::from)?;
            let unit = lift_composite_module(&module, &registry, &config)?;
            println!("{}", serde_json::to_string_pretty(&unit)?);
            Ok(0)
        }
        Commands::Relower {
            file,
            indent,
            context,
        } => {
            let module = parse_module(&read(file)?).map_err(LiftError::from)?;
            let output = lift_graph_module(&module, &registry, &config)?;
            let options = CodegenOptions {
                context_argument: Some(context.clone()).filter(|c| !c.is_empty()),
                indent: *indent,
                event_method_prefix: config.event_method_prefix.clone(),
                ..CodegenOptions::default()
            };
            print!(
                "{}",
                relower_with_composites(&module, &output.graph, &registry, &options)?
            );
            Ok(0)
        }
        Commands::CheckRoundtrip { file } => {
            let round_trip = check_roundtrip(
                &read(file)?,
                &registry,
                &config,
                &CodegenOptions::default(),
            )?;
            if round_trip.is_idempotent() {
                println!(
                    "round trip ok: {} nodes, {} flow edges, {} data edges",
                    round_trip.after.node_count,
                    round_trip.after.flow_edges,
                    round_trip.after.data_edges
                );
                return Ok(0);
            }
            println!("round trip mismatch:");
            for line in round_trip.differences() {
                println!("  {line}");
            }
            println!("re-lowered source:\n{}", round_trip.relowered);
            Ok(1)
        }
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}
