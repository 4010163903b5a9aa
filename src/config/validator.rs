use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{ResonanceError, Result, ValidationError};
use crate::lexical::metadata::MAX_SEGMENTS;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_lexical(config, &mut errors);
        Self::validate_graph(config, &mut errors);
        Self::validate_fusion(config, &mut errors);
        Self::validate_search(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ResonanceError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        // existence is not checked: files are created on first use
        let paths = [
            ("storage.data_dir", &config.storage.data_dir),
            ("storage.graph_db", &config.storage.graph_db),
            ("storage.snapshot_file", &config.storage.snapshot_file),
        ];
        for (key, path) in paths {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(key, "Path cannot be empty"));
            }
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let embedding = &config.embedding;
        if embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }
        if embedding.small_model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.small_model",
                "Model name cannot be empty",
            ));
        }
        if embedding.medium_model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.medium_model",
                "Model name cannot be empty",
            ));
        }
        if embedding.long_query_words == 0 {
            errors.push(ValidationError::new(
                "embedding.long_query_words",
                "Long query threshold must be greater than 0",
            ));
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        let index = &config.index;
        if index.m < 2 {
            errors.push(ValidationError::new("index.m", "HNSW M must be at least 2"));
        }
        if index.m_max0 < index.m {
            errors.push(ValidationError::new(
                "index.m_max0",
                format!("m_max0 ({}) must be at least m ({})", index.m_max0, index.m),
            ));
        }
        if index.ef_construction == 0 {
            errors.push(ValidationError::new(
                "index.ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }
        if index.ef_search == 0 {
            errors.push(ValidationError::new(
                "index.ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_lexical(config: &Config, errors: &mut Vec<ValidationError>) {
        let lexical = &config.lexical;
        if !lexical.k1.is_finite() || lexical.k1 <= 0.0 {
            errors.push(ValidationError::new(
                "lexical.k1",
                format!("k1 must be positive, got {}", lexical.k1),
            ));
        }
        for (key, field) in [("lexical.title", lexical.title), ("lexical.body", lexical.body)] {
            if !(0.0..=1.0).contains(&field.b) {
                errors.push(ValidationError::new(
                    format!("{}.b", key),
                    format!("b must be between 0.0 and 1.0, got {}", field.b),
                ));
            }
            if !field.weight.is_finite() || field.weight < 0.0 {
                errors.push(ValidationError::new(
                    format!("{}.weight", key),
                    format!("Field weight must be non-negative, got {}", field.weight),
                ));
            }
        }
        if !lexical.proximity_alpha.is_finite() || lexical.proximity_alpha < 0.0 {
            errors.push(ValidationError::new(
                "lexical.proximity_alpha",
                "Proximity alpha must be non-negative",
            ));
        }
        if lexical.phrase_boost && (!lexical.phrase_boost_factor.is_finite() || lexical.phrase_boost_factor < 1.0) {
            errors.push(ValidationError::new(
                "lexical.phrase_boost_factor",
                format!(
                    "Phrase boost factor must be at least 1.0, got {}",
                    lexical.phrase_boost_factor
                ),
            ));
        }
        if lexical.segment_count == 0 || lexical.segment_count > MAX_SEGMENTS {
            errors.push(ValidationError::new(
                "lexical.segment_count",
                format!(
                    "Segment count must be between 1 and {}, got {}",
                    MAX_SEGMENTS, lexical.segment_count
                ),
            ));
        }
    }

    fn validate_graph(config: &Config, errors: &mut Vec<ValidationError>) {
        let graph = &config.graph;
        if !graph.min_cooccurrence.is_finite() || graph.min_cooccurrence < 0.0 {
            errors.push(ValidationError::new(
                "graph.min_cooccurrence",
                "Minimum co-occurrence must be non-negative",
            ));
        }
        if !(-1.0..=1.0).contains(&graph.seed_min_similarity) {
            errors.push(ValidationError::new(
                "graph.seed_min_similarity",
                format!(
                    "Seed similarity must be between -1.0 and 1.0, got {}",
                    graph.seed_min_similarity
                ),
            ));
        }
    }

    fn validate_fusion(config: &Config, errors: &mut Vec<ValidationError>) {
        if !config.fusion.rrf_k.is_finite() || config.fusion.rrf_k < 0.0 {
            errors.push(ValidationError::new(
                "fusion.rrf_k",
                format!("RRF k must be non-negative, got {}", config.fusion.rrf_k),
            ));
        }
        if let Err(e) = config.fusion.weights.validate() {
            errors.push(ValidationError::new("fusion.weights", e.to_string()));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        let search = &config.search;
        if search.default_k == 0 {
            errors.push(ValidationError::new(
                "search.default_k",
                "Default k must be greater than 0",
            ));
        }
        if search.candidate_multiplier == 0 {
            errors.push(ValidationError::new(
                "search.candidate_multiplier",
                "Candidate multiplier must be greater than 0",
            ));
        }
        if search.snippet_width == 0 {
            errors.push(ValidationError::new(
                "search.snippet_width",
                "Snippet width must be greater than 0",
            ));
        }
    }
}
