// SPDX-License-Identifier: MIT OR Apache-2.0
//! `MacroBot` Editor command line.
//!
//! Works on saved `.macro` documents without opening a window: validate
//! them, summarize them, print the record handed to the executor, or list
//! the hotkeys they would register.

use clap::{Parser, Subcommand};
use macrobot_editor_app::files::{load_document, tab_name_from_path};
use macrobot_editor_app::hotkeys::gather_hotkeys;
use macrobot_editor_app::settings::{AppSettings, SETTINGS_FILE_NAME};
use macrobot_editor_app::{FileError, SettingsError};
use macrobot_editor_graph::{
    create_macro_registry, validate, CodecError, GraphError, Graph, LoadReport, MacroRecord, NodeId,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Inspect and check `MacroBot` macro documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to settings.ron in the working directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check execution wiring
    Validate {
        /// Document to check
        file: PathBuf,
    },
    /// Summarize a document
    Inspect {
        /// Document to summarize
        file: PathBuf,
    },
    /// Print the record handed to the macro executor
    Handoff {
        /// Document to package
        file: PathBuf,
        /// Start node id (defaults to the document's start node)
        #[arg(long)]
        start: Option<String>,
    },
    /// List the hotkeys the document would register
    Hotkeys {
        /// Document to read
        file: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Document has no start node")]
    NoEntry,
}

fn open(path: &Path) -> Result<(Graph, LoadReport), CliError> {
    let record = load_document(path)?;
    let (graph, _, report) = record.restore(Arc::new(create_macro_registry()));
    Ok((graph, report))
}

fn run(cli: Cli) -> Result<bool, CliError> {
    match cli.command {
        Command::Validate { file } => {
            let (graph, _) = open(&file)?;
            let report = validate(&graph);
            println!("{}", report.summary());
            Ok(report.is_valid())
        }
        Command::Inspect { file } => {
            let (graph, report) = open(&file)?;
            println!("Document: {}", tab_name_from_path(&file));
            println!("Nodes: {}", graph.node_count());
            println!("Connections: {}", graph.connection_count());
            for node in graph.entry_nodes() {
                println!("Start node: {}", node.id);
            }
            let refs = graph.cross_references();
            if !refs.functions.is_empty() {
                let names: Vec<&str> = refs.functions.iter().map(String::as_str).collect();
                println!("Functions: {}", names.join(", "));
            }
            if !refs.variables.is_empty() {
                let names: Vec<&str> = refs.variables.iter().map(String::as_str).collect();
                println!("Variables: {}", names.join(", "));
            }
            for skipped in &report.skipped_nodes {
                println!("Skipped {skipped}");
            }
            if report.dropped_connections > 0 {
                println!("Dropped {} invalid connection(s)", report.dropped_connections);
            }
            Ok(report.is_clean())
        }
        Command::Handoff { file, start } => {
            let (graph, _) = open(&file)?;
            let entry = match start {
                Some(id) => NodeId::from(id.as_str()),
                None => graph
                    .entry_nodes()
                    .next()
                    .map(|n| n.id.clone())
                    .ok_or(CliError::NoEntry)?,
            };
            let record = MacroRecord::capture(&graph, &entry)?;
            println!("{}", record.to_json_pretty()?);
            Ok(true)
        }
        Command::Hotkeys { file } => {
            let settings_path = cli.settings.unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME));
            let settings = AppSettings::load(&settings_path)?;
            let (graph, _) = open(&file)?;
            for (keys, action) in gather_hotkeys(&graph, &settings.hotkeys) {
                println!("{keys} -> {action}");
            }
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "macrobot_editor_app=debug"
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::DEBUG.into()),
    );

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("MacroBot Editor v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
