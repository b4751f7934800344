//! AIG embedding CLI.
//!
//! Provides the `aigprop` binary:
//!
//! - `embed` runs a forward pass over a JSON circuit descriptor and prints
//!   the hidden states (and optionally per-node probabilities) as JSON
//! - `init` writes a freshly initialized parameter set and prints its
//!   size and content fingerprint
//! - `reconcile` matches a saved parameter set against the live model and
//!   prints the diagnostics
//!
//! Exit codes: 0 = success, 1 = invalid input, 3 = I/O error.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use aigprop_core::CircuitGraph;
use aigprop_model::{ExecutionContext, Model, ModelConfig, ModelError, TraceEntry};

/// Level-synchronous embedding propagation for And-Inverter Graphs.
#[derive(Debug, Parser)]
#[command(name = "aigprop", about = "AIG embedding propagation tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Embed every node of a circuit.
    Embed {
        /// Path to the circuit descriptor (JSON).
        #[arg(short, long)]
        graph: PathBuf,

        /// Parameter set to load before the pass (JSON).
        #[arg(short, long)]
        checkpoint: Option<PathBuf>,

        /// Model configuration (JSON, default: built-in defaults).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also print the readout probability of every node.
        #[arg(long)]
        probs: bool,

        /// Include the propagation trace in the output.
        #[arg(long)]
        trace: bool,
    },
    /// Write freshly initialized parameters.
    Init {
        /// Output file for the parameter set.
        #[arg(short, long)]
        out: PathBuf,

        /// Model configuration (JSON, default: built-in defaults).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Reconcile a saved parameter set with the configured model.
    Reconcile {
        /// Saved parameter set (JSON).
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Model configuration (JSON, default: built-in defaults).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    let exit_code = run(cli.command, &mut stdout);
    process::exit(exit_code);
}

/// Dispatches a subcommand and maps its outcome to an exit code.
fn run(command: Commands, out: &mut dyn Write) -> i32 {
    let result = match command {
        Commands::Embed {
            graph,
            checkpoint,
            config,
            probs,
            trace,
        } => run_embed(&graph, checkpoint.as_deref(), config.as_deref(), probs, trace, out),
        Commands::Init { out: path, config } => run_init(&path, config.as_deref(), out),
        Commands::Reconcile { checkpoint, config } => {
            run_reconcile(&checkpoint, config.as_deref(), out)
        }
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code(&e)
        }
    }
}

/// 3 for I/O failures, 1 for everything else.
fn exit_code(error: &ModelError) -> i32 {
    match error {
        ModelError::Io(_) => 3,
        _ => 1,
    }
}

#[derive(Serialize)]
struct EmbedOutput {
    hs: Vec<Vec<f32>>,
    hf: Vec<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prob: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<Vec<TraceEntry>>,
}

#[derive(Serialize)]
struct InitOutput {
    path: PathBuf,
    tensors: usize,
    scalars: usize,
    fingerprint: String,
}

fn load_config(path: Option<&Path>) -> Result<ModelConfig, ModelError> {
    match path {
        Some(path) => ModelConfig::load(path),
        None => Ok(ModelConfig::default()),
    }
}

fn load_graph(path: &Path) -> Result<CircuitGraph, ModelError> {
    let text = std::fs::read_to_string(path)?;
    let graph: CircuitGraph = serde_json::from_str(&text)?;
    graph.validate()?;
    Ok(graph)
}

fn rows(table: &ndarray::Array2<f32>) -> Vec<Vec<f32>> {
    table.outer_iter().map(|row| row.to_vec()).collect()
}

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<(), ModelError> {
    let json = serde_json::to_string_pretty(value)?;
    writeln!(out, "{}", json)?;
    Ok(())
}

/// Execute the embed subcommand.
fn run_embed(
    graph_path: &Path,
    checkpoint: Option<&Path>,
    config: Option<&Path>,
    probs: bool,
    trace: bool,
    out: &mut dyn Write,
) -> Result<(), ModelError> {
    let config = load_config(config)?;
    let graph = load_graph(graph_path)?;
    let mut model = Model::new(config)?;
    if let Some(path) = checkpoint {
        let diagnostics = model.load_checkpoint_file(path)?;
        tracing::debug!(count = diagnostics.len(), "checkpoint reconciled");
    }

    let ctx = ExecutionContext {
        trace_enabled: trace,
        ..ExecutionContext::cpu()
    };
    let propagation = model.propagate(&ctx, &graph)?;
    let prob = if probs {
        Some(model.pred_prob(&ctx, propagation.states.hf.view())?)
    } else {
        None
    };

    write_json(
        out,
        &EmbedOutput {
            hs: rows(&propagation.states.hs),
            hf: rows(&propagation.states.hf),
            prob,
            trace: propagation.trace,
        },
    )
}

/// Execute the init subcommand.
fn run_init(
    out_path: &Path,
    config: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), ModelError> {
    let model = Model::new(load_config(config)?)?;
    let params = model.state_dict();
    params.save(out_path)?;
    let fingerprint = params.fingerprint().to_hex().to_string();
    tracing::info!(path = %out_path.display(), %fingerprint, "parameters written");
    write_json(
        out,
        &InitOutput {
            path: out_path.to_path_buf(),
            tensors: params.len(),
            scalars: params.num_scalars(),
            fingerprint,
        },
    )
}

/// Execute the reconcile subcommand.
fn run_reconcile(
    checkpoint: &Path,
    config: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), ModelError> {
    let mut model = Model::new(load_config(config)?)?;
    let diagnostics = model.load_checkpoint_file(checkpoint)?;
    write_json(out, &diagnostics)
}
