//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::embedding::ModelChoice;
use crate::search::SearchMode;

#[derive(Parser, Debug)]
#[command(
    name = "resonance",
    version,
    author = "neur0map",
    about = "Hybrid lexical, semantic and entity-graph search over personal notes",
    long_about = "Resonance indexes a directory of notes with a BM25F lexical scorer and HNSW \
                  vector indexes, expands results across an entity co-occurrence graph, and \
                  fuses the signals with weighted reciprocal rank fusion."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/resonance/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a directory of .md/.txt notes and write a snapshot
    Index {
        /// Notes directory
        dir: PathBuf,

        /// Skip embeddings and build the lexical index only
        #[arg(long)]
        lexical_only: bool,
    },

    /// Search the indexed notes
    Search {
        /// Search query text
        query: String,

        /// Search mode (lexical, semantic, hybrid)
        #[arg(short, long)]
        mode: Option<SearchMode>,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Embedding model (small, medium, auto)
        #[arg(long, default_value = "auto")]
        model: ModelChoice,

        /// Maximum graph hops in hybrid mode
        #[arg(long)]
        max_hops: Option<usize>,

        /// Index this directory in memory instead of loading the snapshot
        #[arg(long, value_name = "DIR")]
        notes: Option<PathBuf>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Edit the entity graph
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },

    /// Show index and graph statistics
    Stats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum GraphAction {
    /// Record the entities a note mentions, replacing earlier mentions
    Mention {
        /// Note id (path relative to the notes directory)
        document: String,

        /// Entity ids
        #[arg(required = true)]
        entities: Vec<String>,
    },

    /// Add co-occurrence weight between two entities
    Link {
        a: String,
        b: String,

        #[arg(short, long, default_value = "1.0")]
        weight: f32,
    },

    /// Drop a note's mentions
    Forget {
        document: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::try_parse_from([
            "resonance",
            "search",
            "jon snow",
            "--mode",
            "lexical",
            "-l",
            "3",
            "--model",
            "medium",
        ])
        .unwrap();
        match cli.command {
            Commands::Search {
                query,
                mode,
                limit,
                model,
                ..
            } => {
                assert_eq!(query, "jon snow");
                assert_eq!(mode, Some(SearchMode::Lexical));
                assert_eq!(limit, Some(3));
                assert_eq!(model, ModelChoice::Medium);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_graph_mention_requires_entities() {
        assert!(Cli::try_parse_from(["resonance", "graph", "mention", "a.md"]).is_err());
        assert!(
            Cli::try_parse_from(["resonance", "graph", "mention", "a.md", "jon", "castle"]).is_ok()
        );
    }

    #[test]
    fn test_global_profile() {
        let cli = Cli::try_parse_from(["resonance", "stats", "--profile", "fast"]).unwrap();
        assert_eq!(cli.profile.as_deref(), Some("fast"));
    }
}
