//! Configuration management for Resonance
//!
//! A single TOML file holds every tunable of the retrieval core. Values are
//! loaded, overridden from `RESONANCE_<SECTION>__<KEY>` environment variables,
//! then validated as a whole.

use crate::embedding::{EmbeddingConfig, ModelSize};
use crate::error::{ResonanceError, Result};
use crate::fusion::FusionConfig;
use crate::lexical::LexicalConfig;
use crate::search::{GraphSearchConfig, OrchestratorSettings, SearchMode, SearchSettings};
use crate::vector::{DistanceMetric, HnswConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";
const ENV_PREFIX: &str = "RESONANCE_";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: HnswConfig,
    #[serde(default)]
    pub lexical: LexicalConfig,
    #[serde(default)]
    pub graph: GraphSearchConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// SQLite file with entity mentions and co-occurrence edges
    pub graph_db: PathBuf,
    /// Index snapshot for warm starts
    pub snapshot_file: PathBuf,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<SearchMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_models: Option<Vec<ModelSize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ef_search: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hops: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_weight: Option<f32>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ResonanceError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ResonanceError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ResonanceError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        std::fs::write(path, content).map_err(|e| ResonanceError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load `path`, falling back to the defaults when it does not exist.
    ///
    /// Environment overrides and `profile` apply on both paths, and both are
    /// validated.
    pub fn load_or_default(path: &Path, profile: Option<&str>) -> Result<Self> {
        if path.exists() {
            return match profile {
                Some(profile) => Self::load_with_profile(path, profile),
                None => Self::load(path),
            };
        }

        tracing::warn!(
            "Config file not found, using defaults. Run 'resonance config init' to create one."
        );
        Self::from_defaults(std::env::vars(), profile)
    }

    fn from_defaults<I>(vars: I, profile: Option<&str>) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Config::default();
        config.apply_overrides(vars);
        if let Some(profile) = profile {
            config.apply_profile(profile)?;
        }
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| ResonanceError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(mode) = overrides.search_mode {
            self.search.default_mode = mode;
        }
        if let Some(models) = overrides.enabled_models {
            self.embedding.enabled_models = models;
        }
        if let Some(ef_search) = overrides.ef_search {
            self.index.ef_search = ef_search;
        }
        if let Some(max_hops) = overrides.max_hops {
            self.graph.max_hops = max_hops;
        }
        if let Some(weight) = overrides.vector_weight {
            self.fusion.weights.vector_weight = weight;
        }
        if let Some(weight) = overrides.graph_weight {
            self.fusion.weights.graph_weight = weight;
        }
        if let Some(weight) = overrides.lexical_weight {
            self.fusion.weights.lexical_weight = weight;
        }
        tracing::debug!("Applied profile {}", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: RESONANCE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `(NAME, value)` overrides; names without the prefix are ignored.
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if key == "RESONANCE_LOG" {
                continue;
            }
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
            "STORAGE__GRAPH_DB" => self.storage.graph_db = PathBuf::from(value),
            "STORAGE__SNAPSHOT_FILE" => self.storage.snapshot_file = PathBuf::from(value),
            "EMBEDDING__SMALL_MODEL" => self.embedding.small_model = value.to_string(),
            "EMBEDDING__MEDIUM_MODEL" => self.embedding.medium_model = value.to_string(),
            "EMBEDDING__ENABLED_MODELS" => {
                self.embedding.enabled_models = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| match s.to_ascii_lowercase().as_str() {
                        "small" => Ok(ModelSize::Small),
                        "medium" => Ok(ModelSize::Medium),
                        _ => Err(invalid(path, value, "a list of small/medium")),
                    })
                    .collect::<Result<Vec<_>>>()?;
            }
            "EMBEDDING__BATCH_SIZE" => self.embedding.batch_size = parse(path, value)?,
            "INDEX__M" => self.index.m = parse(path, value)?,
            "INDEX__M_MAX0" => self.index.m_max0 = parse(path, value)?,
            "INDEX__EF_CONSTRUCTION" => self.index.ef_construction = parse(path, value)?,
            "INDEX__EF_SEARCH" => self.index.ef_search = parse(path, value)?,
            "INDEX__MAX_LEVEL" => self.index.max_level = parse(path, value)?,
            "INDEX__SEED" => self.index.seed = Some(parse(path, value)?),
            "INDEX__METRIC" => {
                self.index.metric = match value.to_ascii_lowercase().as_str() {
                    "cosine" => DistanceMetric::Cosine,
                    "euclidean" => DistanceMetric::Euclidean,
                    _ => return Err(invalid(path, value, "cosine or euclidean")),
                }
            }
            "LEXICAL__K1" => self.lexical.k1 = parse(path, value)?,
            "LEXICAL__PROXIMITY_ALPHA" => self.lexical.proximity_alpha = parse(path, value)?,
            "LEXICAL__PROXIMITY_STRATEGY" => {
                self.lexical.proximity_strategy = parse(path, value)?
            }
            "LEXICAL__PAIRWISE_CUTOFF" => self.lexical.pairwise_cutoff = parse(path, value)?,
            "LEXICAL__PHRASE_BOOST" => self.lexical.phrase_boost = parse(path, value)?,
            "GRAPH__MAX_HOPS" => self.graph.max_hops = parse(path, value)?,
            "GRAPH__MAX_EXPANDED" => self.graph.max_expanded = parse(path, value)?,
            "GRAPH__MIN_COOCCURRENCE" => self.graph.min_cooccurrence = parse(path, value)?,
            "FUSION__RRF_K" => self.fusion.rrf_k = parse(path, value)?,
            "FUSION__VECTOR_WEIGHT" => self.fusion.weights.vector_weight = parse(path, value)?,
            "FUSION__GRAPH_WEIGHT" => self.fusion.weights.graph_weight = parse(path, value)?,
            "FUSION__LEXICAL_WEIGHT" => self.fusion.weights.lexical_weight = parse(path, value)?,
            "SEARCH__DEFAULT_MODE" => self.search.default_mode = parse(path, value)?,
            "SEARCH__DEFAULT_K" => self.search.default_k = parse(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Orchestrator settings derived from this configuration
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            lexical: self.lexical.clone(),
            hnsw: self.index.clone(),
            fusion: self.fusion.clone(),
            graph: self.graph.clone(),
            search: self.search.clone(),
            batch_size: self.embedding.batch_size,
            long_query_words: self.embedding.long_query_words,
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ResonanceError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("resonance").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| ResonanceError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".resonance"))
    }

    /// Graph database path with `~` expanded
    pub fn graph_db_path(&self) -> Result<PathBuf> {
        expand_path(&self.storage.graph_db)
    }

    /// Snapshot path with `~` expanded
    pub fn snapshot_path(&self) -> Result<PathBuf> {
        expand_path(&self.storage.snapshot_file)
    }
}

fn parse<T: FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(path, value, std::any::type_name::<T>()))
}

fn invalid(path: &str, value: &str, expected: &str) -> ResonanceError {
    ResonanceError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}' as {}", value, expected),
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ResonanceError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| ResonanceError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.resonance");

        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                graph_db: data_dir.join("graph.db"),
                snapshot_file: data_dir.join("indexes.snap"),
                data_dir,
            },
            embedding: EmbeddingConfig::default(),
            index: HnswConfig::default(),
            lexical: LexicalConfig::default(),
            graph: GraphSearchConfig::default(),
            fusion: FusionConfig::default(),
            search: SearchSettings::default(),
            profiles: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::ProximityStrategy;
    use tempfile::TempDir;

    fn vars(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.index.seed = Some(42);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.index.seed, Some(42));
        assert_eq!(loaded.fusion.rrf_k, 60.0);
        assert_eq!(loaded.lexical.pairwise_cutoff, 8);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[_meta]
schema_version = "1.0.0"

[storage]
data_dir = "/tmp/resonance"
graph_db = "/tmp/resonance/graph.db"
snapshot_file = "/tmp/resonance/indexes.snap"

[graph]
max_hops = 1
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.graph.max_hops, 1);
        assert_eq!(config.graph.seed_limit, GraphSearchConfig::default().seed_limit);
        assert_eq!(config.index, HnswConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/resonance.toml"));
        assert!(matches!(result, Err(ResonanceError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(vars(&[
            ("RESONANCE_INDEX__EF_SEARCH", "128"),
            ("RESONANCE_LEXICAL__PROXIMITY_STRATEGY", "windowed"),
            ("RESONANCE_FUSION__GRAPH_WEIGHT", "0.25"),
            ("RESONANCE_SEARCH__DEFAULT_MODE", "lexical"),
            ("RESONANCE_EMBEDDING__ENABLED_MODELS", "small, medium"),
            ("RESONANCE_INDEX__M", "not-a-number"),
            ("OTHER_INDEX__M", "3"),
        ]));

        assert_eq!(config.index.ef_search, 128);
        assert_eq!(config.lexical.proximity_strategy, ProximityStrategy::Windowed);
        assert_eq!(config.fusion.weights.graph_weight, 0.25);
        assert_eq!(config.search.default_mode, SearchMode::Lexical);
        assert_eq!(
            config.embedding.enabled_models,
            vec![ModelSize::Small, ModelSize::Medium]
        );
        assert_eq!(config.index.m, HnswConfig::default().m);
    }

    #[test]
    fn test_defaults_validated_after_overrides() {
        let config = Config::from_defaults(vars(&[("RESONANCE_INDEX__EF_SEARCH", "32")]), None);
        assert_eq!(config.unwrap().index.ef_search, 32);

        let result = Config::from_defaults(vars(&[("RESONANCE_INDEX__M", "1")]), None);
        match result {
            Err(ResonanceError::ConfigValidation { errors }) => {
                assert!(errors.iter().any(|e| e.path == "index.m"), "{errors:?}");
            }
            other => panic!("expected a validation error, got {other:?}"),
        }

        // the same value in a file is rejected the same way
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut config = Config::default();
        config.index.m = 1;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert!(matches!(
            Config::load_or_default(&path, None),
            Err(ResonanceError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_load_or_default_unknown_profile() {
        let missing = Path::new("/nonexistent/resonance.toml");
        assert!(matches!(
            Config::load_or_default(missing, Some("nope")),
            Err(ResonanceError::Config(_))
        ));
    }

    #[test]
    fn test_profile() {
        let mut config = Config::default();
        config.profiles.insert(
            "fast".to_string(),
            ProfileOverrides {
                ef_search: Some(16),
                max_hops: Some(0),
                ..ProfileOverrides::default()
            },
        );

        config.apply_profile("fast").unwrap();
        assert_eq!(config.index.ef_search, 16);
        assert_eq!(config.graph.max_hops, 0);
        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn test_orchestrator_settings() {
        let config = Config::default();
        let settings = config.orchestrator_settings();
        assert_eq!(settings.batch_size, config.embedding.batch_size);
        assert_eq!(settings.hnsw, config.index);
    }

    #[test]
    fn test_expand_path() {
        let plain = expand_path(Path::new("/var/data")).unwrap();
        assert_eq!(plain, PathBuf::from("/var/data"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path(Path::new("~/x")).unwrap(), home.join("x"));
        }
    }
}
