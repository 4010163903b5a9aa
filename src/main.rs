use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use resonance::cli::{Cli, Commands, ConfigAction, GraphAction};
use resonance::config::Config;
use resonance::embedding::{EmbeddingConfig, EmbeddingProvider, ModelChoice};
use resonance::error::ResonanceError;
use resonance::graph::{GraphExpander, SqliteGraphStore};
use resonance::search::{
    load_notes_from_dir, HybridOptions, SearchMode, SearchOrchestrator, SearchRequest,
    SearchResponse,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Index { dir, lexical_only } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_index(&config, &dir, lexical_only).await?;
        }
        Commands::Search {
            query,
            mode,
            limit,
            model,
            max_hops,
            notes,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            let options = SearchOptions {
                mode,
                limit,
                model,
                max_hops,
                notes,
                json,
            };
            cmd_search(&config, &query, options).await?;
        }
        Commands::Graph { action } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_graph(&config, action)?;
        }
        Commands::Stats => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_stats(&config).await?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("resonance=debug")
    } else {
        EnvFilter::try_from_env("RESONANCE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("resonance=info"))
    };

    // stdout carries results (and --json output), logs go to stderr
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct SearchOptions {
    mode: Option<SearchMode>,
    limit: Option<usize>,
    model: ModelChoice,
    max_hops: Option<usize>,
    notes: Option<PathBuf>,
    json: bool,
}

async fn cmd_index(config: &Config, dir: &Path, lexical_only: bool) -> Result<()> {
    tracing::info!("Indexing notes from {:?}", dir);

    let notes = load_notes_from_dir(dir)
        .with_context(|| format!("Failed to read notes from {}", dir.display()))?;
    println!("Found {} notes in {}", notes.len(), dir.display());

    let provider = if lexical_only {
        None
    } else {
        load_provider(&config.embedding).await
    };
    let orchestrator = SearchOrchestrator::new(config.orchestrator_settings(), provider)?;

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling indexing");
            watcher.cancel();
        }
    });

    let report = orchestrator.rebuild(notes, &cancel).await?;
    let snapshot_path = config.snapshot_path()?;
    let bytes = orchestrator
        .save_snapshot(&snapshot_path)
        .await
        .with_context(|| format!("Failed to write snapshot {}", snapshot_path.display()))?;

    println!("✓ Indexed {} notes in {} ms", report.processed, report.duration_ms);
    if report.failed > 0 || report.embedding_failures > 0 {
        println!(
            "  {} notes failed, {} embeddings failed",
            report.failed, report.embedding_failures
        );
    }
    if report.skipped_empty > 0 {
        println!("  {} empty notes indexed without embeddings", report.skipped_empty);
    }
    println!("  Snapshot: {} ({} bytes)", snapshot_path.display(), bytes);

    Ok(())
}

async fn cmd_search(config: &Config, query: &str, options: SearchOptions) -> Result<()> {
    let provider = load_provider(&config.embedding).await;
    let mut orchestrator = SearchOrchestrator::new(config.orchestrator_settings(), provider)?;

    let graph_path = config.graph_db_path()?;
    if graph_path.exists() {
        match SqliteGraphStore::open(&graph_path) {
            Ok(store) => {
                orchestrator = orchestrator.with_graph(GraphExpander::new(Arc::new(store)));
            }
            Err(e) => tracing::warn!("Graph store unavailable, searching without it: {}", e),
        }
    }

    match &options.notes {
        Some(dir) => {
            let notes = load_notes_from_dir(dir)
                .with_context(|| format!("Failed to read notes from {}", dir.display()))?;
            orchestrator.rebuild(notes, &CancellationToken::new()).await?;
        }
        None => {
            let snapshot_path = config.snapshot_path()?;
            if !snapshot_path.exists() {
                return Err(ResonanceError::Config(format!(
                    "No index snapshot at {}. Run 'resonance index <dir>' first.",
                    snapshot_path.display()
                ))
                .into());
            }
            orchestrator
                .load_snapshot(&snapshot_path)
                .await
                .with_context(|| format!("Failed to load snapshot {}", snapshot_path.display()))?;
        }
    }

    let mut request = SearchRequest::new(query)
        .mode(options.mode.unwrap_or(config.search.default_mode))
        .k(options.limit.unwrap_or(config.search.default_k))
        .model(options.model);
    if let Some(max_hops) = options.max_hops {
        let weights = config.fusion.weights;
        request = request.hybrid(HybridOptions {
            vector_weight: weights.vector_weight,
            graph_weight: weights.graph_weight,
            lexical_weight: weights.lexical_weight,
            max_hops,
            boost_connected: true,
        });
    }

    let response = orchestrator.search(&request).await?;

    if options.json {
        let json = serde_json::to_string_pretty(&response).map_err(|e| ResonanceError::Json {
            source: e,
            context: "Failed to serialize search response".to_string(),
        })?;
        println!("{}", json);
    } else {
        print_response(&response);
    }

    Ok(())
}

fn print_response(response: &SearchResponse) {
    let meta = &response.metadata;
    for warning in &meta.warnings {
        println!("⚠ {}", warning);
    }
    if response.results.is_empty() {
        println!("No results");
        return;
    }

    for (i, hit) in response.results.iter().enumerate() {
        let via = match hit.graph_distance {
            Some(d) if hit.graph_expanded => format!("  [graph, {} hop(s)]", d),
            _ => String::new(),
        };
        println!("{:>2}. {} ({:.3}){}", i + 1, hit.title, hit.score, via);
        println!("    {}", hit.document_id);
        if !hit.entity_matches.is_empty() {
            println!("    entities: {}", hit.entity_matches.join(", "));
        }
        if !hit.snippet.is_empty() {
            println!("    {}", hit.snippet);
        }
    }

    let signals: Vec<String> = meta.signals.iter().map(|s| s.as_str().to_string()).collect();
    println!(
        "\n{} results in {} ms (signals: {}{})",
        meta.total_results,
        meta.search_time_ms,
        signals.join(", "),
        meta.model_used
            .as_deref()
            .map(|m| format!("; model: {}", m))
            .unwrap_or_default()
    );
}

fn cmd_graph(config: &Config, action: GraphAction) -> Result<()> {
    let graph_path = config.graph_db_path()?;
    let store = SqliteGraphStore::open(&graph_path)
        .with_context(|| format!("Failed to open graph store {}", graph_path.display()))?;

    match action {
        GraphAction::Mention { document, entities } => {
            store.set_mentions(&document, &entities)?;
            println!("✓ {} now mentions {}", document, entities.join(", "));
        }
        GraphAction::Link { a, b, weight } => {
            store.add_edge(&a, &b, weight)?;
            println!(
                "✓ {} <-> {} weight {:.2}",
                a,
                b,
                store.edge_weight(&a, &b)?
            );
        }
        GraphAction::Forget { document } => {
            if store.remove_document(&document)? {
                println!("✓ Removed mentions of {}", document);
            } else {
                println!("{} has no recorded mentions", document);
            }
        }
    }

    Ok(())
}

async fn cmd_stats(config: &Config) -> Result<()> {
    println!("Resonance Status");
    println!("================");

    let snapshot_path = config.snapshot_path()?;
    if snapshot_path.exists() {
        // No provider: stats never embed
        let orchestrator = SearchOrchestrator::new(config.orchestrator_settings(), None)?;
        orchestrator
            .load_snapshot(&snapshot_path)
            .await
            .with_context(|| format!("Failed to load snapshot {}", snapshot_path.display()))?;
        let stats = orchestrator.stats().await;

        println!("\nIndex: {}", snapshot_path.display());
        println!("  Notes: {}", stats.notes);
        println!(
            "  Lexical documents: {} (generation {})",
            stats.lexical_documents, stats.lexical_generation
        );
        for vector in &stats.vectors {
            println!(
                "  Vectors [{}]: {} live, {} tombstoned, dim {}, max level {}",
                vector.model, vector.live, vector.tombstones, vector.dimension, vector.max_level
            );
        }
    } else {
        println!("\nIndex: none (run 'resonance index <dir>')");
    }

    let graph_path = config.graph_db_path()?;
    if graph_path.exists() {
        let stats = SqliteGraphStore::open(&graph_path)?.stats()?;
        println!("\nGraph: {}", graph_path.display());
        println!("  Documents: {}", stats.document_count);
        println!("  Entities: {}", stats.entity_count);
        println!("  Edges: {}", stats.edge_count);
    } else {
        println!("\nGraph: none");
    }

    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)
                .with_context(|| format!("Invalid configuration at {}", path.display()))?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    Config::load_or_default(&path, profile.as_deref())
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Load the configured embedding models. Failure leaves search lexical-only.
async fn load_provider(config: &EmbeddingConfig) -> Option<Arc<dyn EmbeddingProvider>> {
    let config = config.clone();
    match tokio::task::spawn_blocking(move || config.provider()).await {
        Ok(Ok(provider)) => Some(Arc::new(provider)),
        Ok(Err(e)) => {
            tracing::warn!("Embedding models unavailable, continuing lexical-only: {}", e);
            None
        }
        Err(e) => {
            tracing::warn!("Embedding model loader failed: {}", e);
            None
        }
    }
}
