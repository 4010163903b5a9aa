//! ResoRank: field-weighted BM25 with segment proximity and phrase boosts

use super::metadata::{
    CorpusStatistics, DocumentMetadata, FieldId, MetadataBuilder, TokenMetadata, MAX_SEGMENTS,
};
use super::proximity::{proximity_score, ProximityStrategy};
use super::tokenizer::Tokenizer;
use super::LexicalError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Weight and length-normalization strength of one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldParams {
    pub weight: f32,
    /// BM25 `b`: 0 disables length normalization, 1 applies it fully.
    pub b: f32,
}

/// Lexical scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    /// BM25 term-frequency saturation.
    pub k1: f32,
    pub title: FieldParams,
    pub body: FieldParams,
    /// Scale of the multiplicative proximity boost.
    pub proximity_alpha: f32,
    pub proximity_strategy: ProximityStrategy,
    /// Largest matched-term count still scored pairwise under `auto`.
    pub pairwise_cutoff: usize,
    pub phrase_boost: bool,
    pub phrase_boost_factor: f32,
    /// Positional segments per document (at most 32).
    pub segment_count: u32,
    pub remove_stop_words: bool,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            k1: 1.2,
            title: FieldParams { weight: 4.0, b: 0.3 },
            body: FieldParams {
                weight: 1.0,
                b: 0.75,
            },
            proximity_alpha: 0.5,
            proximity_strategy: ProximityStrategy::Auto,
            pairwise_cutoff: 8,
            phrase_boost: true,
            phrase_boost_factor: 1.5,
            segment_count: MAX_SEGMENTS,
            remove_stop_words: true,
        }
    }
}

impl LexicalConfig {
    pub fn field(&self, field: FieldId) -> FieldParams {
        match field {
            FieldId::Title => self.title,
            FieldId::Body => self.body,
        }
    }

    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.remove_stop_words)
    }

    pub fn metadata_builder(&self) -> MetadataBuilder {
        MetadataBuilder::new(self.tokenizer(), self.segment_count)
    }
}

/// A scored document.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalMatch {
    pub doc_id: String,
    pub score: f32,
    /// Query terms found in the document, in query order.
    pub matched_terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedDocument {
    /// Insertion sequence, used to break score ties.
    order: u64,
    metadata: DocumentMetadata,
    terms: HashMap<String, TokenMetadata>,
}

/// In-memory lexical index and scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalScorer {
    config: LexicalConfig,
    documents: HashMap<String, IndexedDocument>,
    /// term -> documents containing it; its length is the document frequency.
    postings: HashMap<String, HashSet<String>>,
    field_length_sums: HashMap<FieldId, u64>,
    token_count_sum: u64,
    next_order: u64,
    /// Bumped on every corpus change.
    generation: u64,
    #[serde(skip)]
    idf_cache: HashMap<String, f32>,
    #[serde(skip)]
    idf_cache_generation: Option<u64>,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::new(LexicalConfig::default())
    }
}

impl LexicalScorer {
    pub fn new(config: LexicalConfig) -> Self {
        Self {
            config,
            documents: HashMap::new(),
            postings: HashMap::new(),
            field_length_sums: HashMap::new(),
            token_count_sum: 0,
            next_order: 0,
            generation: 0,
            idf_cache: HashMap::new(),
            idf_cache_generation: None,
        }
    }

    pub fn config(&self) -> &LexicalConfig {
        &self.config
    }

    /// Swap scoring parameters. Indexed metadata is kept.
    pub fn set_config(&mut self, config: LexicalConfig) {
        self.config = config;
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.documents.contains_key(doc_id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.postings.get(term).map_or(0, |docs| docs.len() as u32)
    }

    /// Term metadata for a document with `corpus_doc_frequency` filled from
    /// the live document-frequency table.
    pub fn term_metadata(&self, doc_id: &str, term: &str) -> Option<TokenMetadata> {
        let mut meta = self.documents.get(doc_id)?.terms.get(term)?.clone();
        meta.corpus_doc_frequency = self.document_frequency(term);
        Some(meta)
    }

    /// Register or wholly replace a document's scoring metadata.
    ///
    /// # Arguments
    /// * `doc_id` - Document identifier
    /// * `metadata` - Field lengths and token count
    /// * `terms` - Per-term occurrences and segment masks
    pub fn index_document(
        &mut self,
        doc_id: &str,
        metadata: DocumentMetadata,
        terms: HashMap<String, TokenMetadata>,
    ) -> Result<(), LexicalError> {
        if doc_id.is_empty() {
            return Err(LexicalError::InvalidDocumentId);
        }
        for (term, meta) in &terms {
            if term.is_empty() {
                return Err(LexicalError::InvalidMetadata(format!(
                    "empty term in document {}",
                    doc_id
                )));
            }
            if meta.total_tf() == 0 {
                return Err(LexicalError::InvalidMetadata(format!(
                    "term '{}' in document {} has no occurrences",
                    term, doc_id
                )));
            }
        }

        let order = match self.detach(doc_id) {
            Some(previous) => previous.order,
            None => {
                self.next_order += 1;
                self.next_order
            }
        };

        for (field, length) in &metadata.field_lengths {
            *self.field_length_sums.entry(*field).or_insert(0) += *length as u64;
        }
        self.token_count_sum += metadata.total_token_count as u64;
        for term in terms.keys() {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(doc_id.to_string());
        }

        self.documents.insert(
            doc_id.to_string(),
            IndexedDocument {
                order,
                metadata,
                terms,
            },
        );
        self.generation += 1;
        Ok(())
    }

    /// Tokenize and index a note's title and body.
    pub fn index_note(&mut self, doc_id: &str, title: &str, body: &str) -> Result<(), LexicalError> {
        let (metadata, terms) = self.config.metadata_builder().build_note(title, body);
        self.index_document(doc_id, metadata, terms)
    }

    /// Drop a document. Returns `false` if it was not indexed.
    pub fn remove_document(&mut self, doc_id: &str) -> bool {
        let removed = self.detach(doc_id).is_some();
        if removed {
            self.generation += 1;
        }
        removed
    }

    fn detach(&mut self, doc_id: &str) -> Option<IndexedDocument> {
        let previous = self.documents.remove(doc_id)?;

        for (field, length) in &previous.metadata.field_lengths {
            if let Some(sum) = self.field_length_sums.get_mut(field) {
                *sum = sum.saturating_sub(*length as u64);
            }
        }
        self.token_count_sum = self
            .token_count_sum
            .saturating_sub(previous.metadata.total_token_count as u64);

        for term in previous.terms.keys() {
            if let Some(docs) = self.postings.get_mut(term) {
                docs.remove(doc_id);
                if docs.is_empty() {
                    self.postings.remove(term);
                }
            }
        }

        Some(previous)
    }

    /// Current corpus aggregates.
    pub fn corpus_statistics(&self) -> CorpusStatistics {
        let n = self.documents.len();
        if n == 0 {
            return CorpusStatistics::default();
        }
        CorpusStatistics {
            total_documents: n,
            average_field_lengths: self
                .field_length_sums
                .iter()
                .map(|(field, sum)| (*field, *sum as f64 / n as f64))
                .collect(),
            average_document_length: self.token_count_sum as f64 / n as f64,
        }
    }

    /// Precompute IDF for every known term at the current generation.
    pub fn warm_idf_cache(&mut self) {
        let n = self.documents.len();
        self.idf_cache = self
            .postings
            .iter()
            .map(|(term, docs)| (term.clone(), bm25_idf(n, docs.len())))
            .collect();
        self.idf_cache_generation = Some(self.generation);
        tracing::debug!(
            "Warmed IDF cache: {} terms at generation {}",
            self.idf_cache.len(),
            self.generation
        );
    }

    pub fn idf_cache_is_warm(&self) -> bool {
        self.idf_cache_generation == Some(self.generation)
    }

    pub fn idf(&self, term: &str) -> f32 {
        if self.idf_cache_is_warm() {
            if let Some(&idf) = self.idf_cache.get(term) {
                return idf;
            }
        }
        bm25_idf(self.documents.len(), self.document_frequency(term) as usize)
    }

    /// Tokenize `query` with the configured tokenizer and score it.
    pub fn search_text(&self, query: &str, limit: usize) -> Vec<LexicalMatch> {
        let tokens = self.config.tokenizer().tokenize_query(query);
        self.search(&tokens, limit)
    }

    /// Score every document matching at least one query token.
    ///
    /// Results are sorted by descending score; ties go to the earlier-indexed
    /// document. Documents matching no token are excluded.
    pub fn search(&self, query_tokens: &[String], limit: usize) -> Vec<LexicalMatch> {
        if query_tokens.is_empty() || limit == 0 || self.documents.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let tokens: Vec<&str> = query_tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty() && seen.insert(*t))
            .collect();

        let stats = self.corpus_statistics();
        let idfs: Vec<f32> = tokens.iter().map(|t| self.idf(t)).collect();

        let candidates: HashSet<&str> = tokens
            .iter()
            .filter_map(|t| self.postings.get(*t))
            .flatten()
            .map(String::as_str)
            .collect();

        let phrase = (tokens.len() >= 2).then(|| tokens.join(" "));

        let mut scored: Vec<(u64, LexicalMatch)> = candidates
            .into_iter()
            .filter_map(|doc_id| {
                let doc = self.documents.get(doc_id)?;
                self.score_document(doc, &tokens, &idfs, &stats, phrase.as_deref())
                    .map(|(score, matched_terms)| {
                        (
                            doc.order,
                            LexicalMatch {
                                doc_id: doc_id.to_string(),
                                score,
                                matched_terms,
                            },
                        )
                    })
            })
            .collect();

        scored.sort_by(|(order_a, a), (order_b, b)| {
            b.score.total_cmp(&a.score).then(order_a.cmp(order_b))
        });
        scored.truncate(limit);
        scored.into_iter().map(|(_, m)| m).collect()
    }

    fn score_document(
        &self,
        doc: &IndexedDocument,
        tokens: &[&str],
        idfs: &[f32],
        stats: &CorpusStatistics,
        phrase: Option<&str>,
    ) -> Option<(f32, Vec<String>)> {
        let k1 = self.config.k1;
        let mut base = 0.0f32;
        let mut masks = Vec::new();
        let mut matched = Vec::new();

        for (token, idf) in tokens.iter().zip(idfs) {
            let Some(meta) = doc.terms.get(*token) else {
                continue;
            };

            let weighted_tf: f32 = meta
                .field_occurrences
                .iter()
                .map(|(field, occurrence)| {
                    let params = self.config.field(*field);
                    let avg = stats.average_field_length(*field);
                    let norm = if avg > 0.0 {
                        1.0 - params.b + params.b * (occurrence.field_length as f64 / avg) as f32
                    } else {
                        1.0
                    };
                    params.weight * occurrence.tf as f32 / norm.max(f32::EPSILON)
                })
                .sum();

            base += idf * weighted_tf * (k1 + 1.0) / (k1 + weighted_tf);
            masks.push(meta.segment_mask);
            matched.push(token.to_string());
        }

        if matched.is_empty() {
            return None;
        }

        let mut score = base;
        if masks.len() >= 2 {
            let overlap = proximity_score(
                &masks,
                self.config.proximity_strategy,
                self.config.pairwise_cutoff,
            );
            score *= 1.0 + self.config.proximity_alpha * overlap;
        }

        if self.config.phrase_boost {
            if let Some(phrase) = phrase {
                if doc
                    .metadata
                    .field_text
                    .values()
                    .any(|text| contains_phrase(text, phrase))
                {
                    score *= self.config.phrase_boost_factor;
                }
            }
        }

        Some((score, matched))
    }
}

/// Standard BM25 IDF: `ln(1 + (N - df + 0.5) / (df + 0.5))`.
pub fn bm25_idf(total_documents: usize, document_frequency: usize) -> f32 {
    let n = total_documents as f64;
    let df = document_frequency as f64;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln() as f32
}

/// Token-boundary phrase match over space-joined normalized text.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    text.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let left_ok = start == 0 || text.as_bytes()[start - 1] == b' ';
        let right_ok = end == text.len() || text.as_bytes()[end] == b' ';
        left_ok && right_ok
    })
}
