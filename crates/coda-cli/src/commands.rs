//! CLI command implementations.

use crate::config::{CodaConfig, CONFIG_DIR, CONFIG_FILE};
use crate::SourceArgs;
use coda_core::{describe, Dataset, EdgeColumns, Table};
use coda_graph::{GraphBuilder, GraphIndex, TraversalMode};
use coda_server::{watch_sources, CodaServer, ReloadState, ServerConfig, Session};
use coda_watcher::{DataProvider, FilesystemProvider, RandomProvider};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Initialize CoDA in a directory.
pub fn init(path: &Path) -> Result<()> {
    let coda_dir = path.join(CONFIG_DIR);
    let config_path = coda_dir.join(CONFIG_FILE);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    fs::create_dir_all(&coda_dir)?;
    CodaConfig::default().write(&config_path)?;

    println!("{} Initialized CoDA in {}", "✓".green(), path.display());
    println!(
        "  Run {} to start a session",
        "coda serve --vertex polyps.csv --edge edges.csv".cyan()
    );

    Ok(())
}

fn edge_columns(sources: &SourceArgs, config: &CodaConfig) -> EdgeColumns {
    let mut columns = config.edge_columns.clone();
    if let Some(source) = &sources.source_column {
        columns.source = source.clone();
    }
    if let Some(target) = &sources.target_column {
        columns.target = target.clone();
    }
    columns
}

fn filesystem_provider(sources: &SourceArgs, columns: EdgeColumns) -> Result<FilesystemProvider> {
    if sources.vertices.is_empty() {
        return Err("at least one --vertex file is required".into());
    }

    let mut provider = FilesystemProvider::new(columns);
    for path in &sources.vertices {
        provider.add_vertex_csv(path, None);
    }
    for path in &sources.edges {
        provider.add_edge_csv(path, None);
    }
    if let Some(mask) = &sources.selection_mask {
        provider = provider.with_selection_mask(mask);
    }
    Ok(provider)
}

/// Reads the sources once and builds the ancestry graph.
fn load(sources: &SourceArgs) -> Result<(FilesystemProvider, Dataset, GraphIndex)> {
    let config = CodaConfig::load(&std::env::current_dir()?)?;
    let columns = edge_columns(sources, &config);
    let mut provider = filesystem_provider(sources, columns.clone())?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Reading sources...");

    let dataset = provider.load();
    spinner.finish_and_clear();
    let dataset = dataset?;

    let mut builder = GraphBuilder::new(dataset.vertex_count());
    builder.add_table(&dataset.edges, &columns)?;
    let graph = builder.build()?;

    Ok((provider, dataset, graph))
}

/// Options of `coda serve`.
pub struct ServeOptions {
    pub sources: SourceArgs,
    pub vertex_selection: Option<PathBuf>,
    pub edge_selection: Option<PathBuf>,
    pub random: Option<Option<u64>>,
    pub port: Option<u16>,
    pub headless: bool,
    pub auto_reload: bool,
    pub mode: Option<TraversalMode>,
}

/// Start the CoDA session server.
pub async fn serve(options: ServeOptions) -> Result<()> {
    let root = std::env::current_dir()?;
    let mut config = CodaConfig::load(&root)?;
    if let Some(port) = options.port {
        config.port = port;
    }
    if let Some(mode) = options.mode {
        config.traversal_mode = mode;
    }
    if options.auto_reload {
        config.automatic_reload = true;
    }

    let provider: Box<dyn DataProvider> = match options.random {
        Some(seed) => Box::new(RandomProvider::new(seed)),
        None => {
            let columns = edge_columns(&options.sources, &config);
            let mut provider = filesystem_provider(&options.sources, columns)?;
            if let Some(path) = &options.vertex_selection {
                provider = provider.with_vertex_selection_output(path);
            }
            if let Some(path) = &options.edge_selection {
                provider = provider.with_edge_selection_output(path);
            }
            Box::new(provider)
        }
    };

    println!(
        "{}",
        format!("Starting CoDA session ({} data)...", provider.name()).cyan()
    );

    let watched = provider.watched_paths();
    let (session, _task) = Session::spawn(provider, config.orchestrator());

    // Subscribe before asking, so the outcome of the initial load is not missed.
    let mut events = session.subscribe();
    let mut generation = session.watch_generation();
    loop {
        let info = session.info().await?;
        if info.generation.id > 0 {
            println!(
                "{} Loaded {} vertices, {} edges",
                "✓".green(),
                info.generation.vertex_count.to_string().cyan(),
                info.generation.edge_count.to_string().cyan()
            );
            break;
        }
        if let ReloadState::Error(message) = info.reload {
            println!("{} Initial load failed: {}", "⚠".yellow(), message);
            println!("  Serving an empty session until the sources are fixed");
            break;
        }
        tokio::select! {
            _ = generation.changed() => {}
            _ = events.recv() => {}
        }
    }

    let _watcher = if watched.is_empty() {
        None
    } else {
        let debounce = Duration::from_millis(config.debounce_ms);
        let watcher = watch_sources(&session, &watched, debounce)?;
        println!(
            "{} Watching {} source files ({})",
            "✓".green(),
            watcher.paths().len(),
            if config.automatic_reload {
                "automatic reload"
            } else {
                "manual reload"
            }
        );
        Some(watcher)
    };

    let bind_addr = if options.headless {
        "0.0.0.0"
    } else {
        "127.0.0.1"
    };
    let addr = format!("{}:{}", bind_addr, config.port).parse()?;
    let server = CodaServer::new(session, ServerConfig { addr });

    println!("{} Listening on ws://{}", "✓".green(), addr);
    println!("  Press {} to stop", "Ctrl+C".cyan());

    server.run().await.map_err(|e| e.to_string())?;

    Ok(())
}

/// Select the closure of `roots` offline.
pub fn select(
    sources: &SourceArgs,
    roots: &[usize],
    mode: Option<TraversalMode>,
    json: bool,
) -> Result<()> {
    let config = CodaConfig::load(&std::env::current_dir()?)?;
    let mode = mode.unwrap_or(config.traversal_mode);
    let (_, _, graph) = load(sources)?;

    let vertices = graph.closure_with_depth(roots, mode)?;
    let ids: Vec<usize> = vertices.iter().map(|(v, _)| *v).collect();
    let edges = graph.induced_edges(&ids);

    if json {
        let output = serde_json::json!({
            "roots": roots,
            "mode": mode,
            "vertices": ids,
            "edges": edges
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {} vertices, {} edges ({} of {:?})",
        "Selection:".cyan().bold(),
        ids.len(),
        edges.len(),
        mode,
        roots
    );
    println!();
    for (vertex, depth) in &vertices {
        let marker = if *depth == 0 {
            "●".green()
        } else {
            "○".dimmed()
        };
        println!("  {} {} {}", marker, vertex, format!("(depth {})", depth).dimmed());
    }

    Ok(())
}

fn print_columns(title: &str, table: &Table) {
    println!("  {} {}", title.dimmed(), table.column_count());
    for (name, column) in table.columns() {
        println!("    {} {}", name, format!("[{}]", column.kind()).dimmed());
    }

    let labels = table.label_columns();
    if !labels.is_empty() {
        println!("    {} {}", "labels:".dimmed(), labels.join(", "));
    }
}

/// Show dataset and graph statistics.
pub fn status(sources: &SourceArgs) -> Result<()> {
    let (provider, dataset, graph) = load(sources)?;
    let stats = graph.stats();

    println!("{}", "CoDA Status".cyan().bold());
    println!();
    println!(
        "  {} {} vertex, {} edge",
        "Files:".dimmed(),
        provider.vertex_file_count(),
        provider.edge_file_count()
    );
    println!("  {} {}", "Vertices:".dimmed(), stats.vertex_count);
    println!("  {} {}", "Edges:".dimmed(), stats.edge_count);
    println!("  {} {}", "Fragments:".dimmed(), stats.components);
    println!(
        "  {} {} roots, {} leaves",
        "Shape:".dimmed(),
        stats.roots,
        stats.leaves
    );
    if stats.is_cyclic {
        println!("  {} graph contains cycles", "⚠".yellow());
    }
    if stats.self_loops > 0 {
        println!("  {} {} self loops", "⚠".yellow(), stats.self_loops);
    }
    println!();
    print_columns("Vertex columns:", &dataset.vertices);
    print_columns("Edge columns:", &dataset.edges);

    if let Some(ids) = provider.initial_vertex_selection()? {
        println!("\n  {} {} vertices", "Selection mask:".dimmed(), ids.len());
    }

    Ok(())
}

fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "-".to_string(),
    }
}

/// Describe the scalar columns of the vertex or edge table.
///
/// With a selection mask only the selected vertices are described.
pub fn stats(sources: &SourceArgs, edges: bool, json: bool) -> Result<()> {
    let (provider, dataset, _) = load(sources)?;

    let rows = if edges {
        None
    } else {
        provider.initial_vertex_selection()?
    };
    let table = if edges {
        &dataset.edges
    } else {
        &dataset.vertices
    };
    let summaries = describe(table, rows.as_deref());

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No scalar columns");
        return Ok(());
    }

    println!(
        "{:<28} {:>6} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "column".bold(),
        "count".bold(),
        "unique".bold(),
        "mean".bold(),
        "std".bold(),
        "min".bold(),
        "50%".bold(),
        "max".bold()
    );
    for s in &summaries {
        println!(
            "{:<28} {:>6} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12}",
            s.column.cyan(),
            s.count,
            s.unique,
            format_stat(s.mean),
            format_stat(s.std),
            format_stat(s.min),
            format_stat(s.q50),
            format_stat(s.max)
        );
    }

    Ok(())
}
