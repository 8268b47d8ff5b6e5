//! CoDA CLI - Command-line interface for CoDA
//!
//! This is the main entry point for users working with coral colony data.
//! It provides commands for serving an interactive session and for
//! inspecting colony tables and ancestry offline.

use clap::{Args, Parser, Subcommand};
use coda_graph::TraversalMode;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "coda")]
#[command(author = "CoDA Contributors")]
#[command(version)]
#[command(about = "Interactive analysis of coral colony data", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the colony data comes from.
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Vertex CSV file, may be repeated
    #[arg(long = "vertex", value_name = "CSV")]
    pub vertices: Vec<PathBuf>,

    /// Edge CSV file, may be repeated
    #[arg(long = "edge", value_name = "CSV")]
    pub edges: Vec<PathBuf>,

    /// Edge column holding the parent vertex id
    #[arg(long)]
    pub source_column: Option<String>,

    /// Edge column holding the child vertex id
    #[arg(long)]
    pub target_column: Option<String>,

    /// One-column CSV of per-vertex 0/1 flags used as initial selection
    #[arg(long, value_name = "CSV")]
    pub selection_mask: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize CoDA in a directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Start an interactive session server
    Serve {
        #[command(flatten)]
        sources: SourceArgs,

        /// Write the vertex selection to this CSV whenever it changes
        #[arg(long, value_name = "CSV")]
        vertex_selection: Option<PathBuf>,

        /// Write the edge selection to this CSV whenever it changes
        #[arg(long, value_name = "CSV")]
        edge_selection: Option<PathBuf>,

        /// Serve generated sample data instead of files, optionally seeded
        #[arg(long, value_name = "SEED", conflicts_with = "vertices")]
        random: Option<Option<u64>>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind to 0.0.0.0 for remote access
        #[arg(long)]
        headless: bool,

        /// Reload as soon as a source file changes
        #[arg(long)]
        auto_reload: bool,

        /// Traversal mode of the subgraph tool
        #[arg(short, long)]
        mode: Option<TraversalMode>,
    },

    /// Select the subgraph reachable from root vertices
    Select {
        /// Root vertex ids
        #[arg(required = true)]
        roots: Vec<usize>,

        #[command(flatten)]
        sources: SourceArgs,

        /// descendants, ancestors or component
        #[arg(short, long)]
        mode: Option<TraversalMode>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show dataset and graph statistics
    Status {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Describe the scalar columns of a table
    Stats {
        #[command(flatten)]
        sources: SourceArgs,

        /// Describe the edge table instead of the vertex table
        #[arg(long)]
        edges: bool,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Serve {
            sources,
            vertex_selection,
            edge_selection,
            random,
            port,
            headless,
            auto_reload,
            mode,
        } => {
            commands::serve(commands::ServeOptions {
                sources,
                vertex_selection,
                edge_selection,
                random,
                port,
                headless,
                auto_reload,
                mode,
            })
            .await
        }
        Commands::Select {
            roots,
            sources,
            mode,
            json,
        } => commands::select(&sources, &roots, mode, json),
        Commands::Status { sources } => commands::status(&sources),
        Commands::Stats {
            sources,
            edges,
            json,
        } => commands::stats(&sources, edges, json),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
