/// Embedding provider trait and FastEmbed implementation
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    Initialization(String),

    #[error("Embedding generation failed: {0}")]
    Generation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No {0} embedding model configured")]
    ModelNotConfigured(ModelSize),
}

/// Embedding model tier. Each tier has its own vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Small,
    Medium,
}

impl ModelSize {
    pub const ALL: [ModelSize; 2] = [ModelSize::Small, ModelSize::Medium];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for embedding providers
///
/// Implementations are called from blocking threads; they may be slow but
/// must not hold async locks.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding of `text` with the given model tier
    fn embed(&self, text: &str, model: ModelSize) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts, one output per input in order
    fn embed_batch(
        &self,
        texts: &[String],
        model: ModelSize,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text, model)).collect()
    }

    /// Output dimension of a model tier, or `None` if the tier is not loaded
    fn dimension(&self, model: ModelSize) -> Option<usize>;

    /// Human-readable model name for a tier
    fn model_name(&self, model: ModelSize) -> Option<&str>;

    /// Tiers this provider can serve
    fn available_models(&self) -> Vec<ModelSize> {
        ModelSize::ALL
            .into_iter()
            .filter(|m| self.dimension(*m).is_some())
            .collect()
    }
}

struct LoadedModel {
    model: Arc<TextEmbedding>,
    name: String,
    dimension: usize,
}

/// FastEmbed provider for local embedding generation
///
/// Small defaults to all-MiniLM-L6-v2 (384 dimensions), medium to
/// bge-base-en-v1.5 (768 dimensions). Either tier may be left unloaded.
pub struct FastEmbedProvider {
    small: Option<LoadedModel>,
    medium: Option<LoadedModel>,
}

pub const DEFAULT_SMALL_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_MEDIUM_MODEL: &str = "bge-base-en-v1.5";

impl FastEmbedProvider {
    /// Create a provider with the given model names per tier
    ///
    /// **Important**: Models are downloaded on-demand to the fastembed cache
    /// on first use:
    /// - all-MiniLM-L6-v2: 90MB (384 dims)
    /// - bge-small-en-v1.5: 130MB (384 dims)
    /// - bge-base-en-v1.5: 440MB (768 dims)
    pub fn new(small: Option<&str>, medium: Option<&str>) -> Result<Self, EmbeddingError> {
        if small.is_none() && medium.is_none() {
            return Err(EmbeddingError::Initialization(
                "At least one embedding model must be enabled".to_string(),
            ));
        }
        Ok(Self {
            small: small.map(load_model).transpose()?,
            medium: medium.map(load_model).transpose()?,
        })
    }

    /// Create provider with only the default small model
    pub fn with_default_model() -> Result<Self, EmbeddingError> {
        Self::new(Some(DEFAULT_SMALL_MODEL), None)
    }

    fn loaded(&self, model: ModelSize) -> Result<&LoadedModel, EmbeddingError> {
        match model {
            ModelSize::Small => self.small.as_ref(),
            ModelSize::Medium => self.medium.as_ref(),
        }
        .ok_or(EmbeddingError::ModelNotConfigured(model))
    }
}

fn load_model(model_name: &str) -> Result<LoadedModel, EmbeddingError> {
    let (embedding_model, dimension, model_size_mb) = match model_name {
        "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384, 90),
        "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384, 130),
        "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768, 440),
        _ => {
            return Err(EmbeddingError::Initialization(format!(
                "Unsupported model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                model_name
            )));
        }
    };

    tracing::info!(
        "Initializing embedding model: {} ({}D, ~{}MB download if not cached)",
        model_name,
        dimension,
        model_size_mb
    );

    let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);
    let model = TextEmbedding::try_new(init_options)
        .map_err(|e| EmbeddingError::Initialization(e.to_string()))?;

    Ok(LoadedModel {
        model: Arc::new(model),
        name: model_name.to_string(),
        dimension,
    })
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str, model: ModelSize) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let mut embeddings = self.embed_batch(&[text.to_string()], model)?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::Generation("No embeddings generated".to_string()))
    }

    fn embed_batch(
        &self,
        texts: &[String],
        model: ModelSize,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let loaded = self.loaded(model)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        // outputs must line up with inputs, so empty texts are rejected
        // instead of filtered
        if let Some(position) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput(format!(
                "Text at position {} is empty",
                position
            )));
        }

        let embeddings = loaded
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Generation(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::Generation(format!(
                "Embedding count mismatch: expected {}, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        for embedding in &embeddings {
            if embedding.len() != loaded.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: loaded.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self, model: ModelSize) -> Option<usize> {
        self.loaded(model).ok().map(|m| m.dimension)
    }

    fn model_name(&self, model: ModelSize) -> Option<&str> {
        self.loaded(model).ok().map(|m| m.name.as_str())
    }
}
