//! Scoring metadata for documents and their terms
//!
//! [`MetadataBuilder`] turns note fields into the [`DocumentMetadata`] and
//! per-term [`TokenMetadata`] consumed by the scorer.

use super::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of positional segments a mask can track.
pub const MAX_SEGMENTS: u32 = 32;

/// Document fields that carry their own weight and length normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldId {
    Title,
    Body,
}

impl FieldId {
    pub const ALL: [FieldId; 2] = [FieldId::Title, FieldId::Body];
}

/// Occurrences of one term in one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldOccurrence {
    pub tf: u32,
    pub field_length: u32,
}

/// Per-term, per-document scoring data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub field_occurrences: HashMap<FieldId, FieldOccurrence>,
    /// Bit `i` set when the term occurs in positional segment `i`.
    pub segment_mask: u32,
    /// Documents in the corpus containing the term.
    pub corpus_doc_frequency: u32,
}

impl TokenMetadata {
    pub fn total_tf(&self) -> u32 {
        self.field_occurrences.values().map(|o| o.tf).sum()
    }
}

/// Per-document scoring data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub field_lengths: HashMap<FieldId, u32>,
    pub total_token_count: u32,
    /// Space-joined normalized tokens per field, used for phrase matching.
    #[serde(default)]
    pub field_text: HashMap<FieldId, String>,
}

impl DocumentMetadata {
    pub fn field_length(&self, field: FieldId) -> u32 {
        self.field_lengths.get(&field).copied().unwrap_or(0)
    }
}

/// Aggregates over the whole indexed corpus.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorpusStatistics {
    pub total_documents: usize,
    pub average_field_lengths: HashMap<FieldId, f64>,
    pub average_document_length: f64,
}

impl CorpusStatistics {
    pub fn average_field_length(&self, field: FieldId) -> f64 {
        self.average_field_lengths.get(&field).copied().unwrap_or(0.0)
    }
}

/// Builds scoring metadata from raw field text.
#[derive(Debug, Clone, Copy)]
pub struct MetadataBuilder {
    tokenizer: Tokenizer,
    segment_count: u32,
}

impl MetadataBuilder {
    /// # Arguments
    /// * `tokenizer` - Tokenizer shared with query parsing
    /// * `segment_count` - Positional segments per document, clamped to `1..=32`
    pub fn new(tokenizer: Tokenizer, segment_count: u32) -> Self {
        Self {
            tokenizer,
            segment_count: segment_count.clamp(1, MAX_SEGMENTS),
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Build metadata for a note with a title and a body.
    pub fn build_note(
        &self,
        title: &str,
        body: &str,
    ) -> (DocumentMetadata, HashMap<String, TokenMetadata>) {
        self.build(&[(FieldId::Title, title), (FieldId::Body, body)])
    }

    /// Build metadata from fields in document order.
    ///
    /// Positions run across all fields, so segment masks describe where in the
    /// whole document a term sits.
    pub fn build(&self, fields: &[(FieldId, &str)]) -> (DocumentMetadata, HashMap<String, TokenMetadata>) {
        let tokenized: Vec<(FieldId, Vec<String>)> = fields
            .iter()
            .map(|(field, text)| (*field, self.tokenizer.tokenize(text)))
            .collect();

        let total: usize = tokenized.iter().map(|(_, tokens)| tokens.len()).sum();
        let mut document = DocumentMetadata {
            total_token_count: total as u32,
            ..DocumentMetadata::default()
        };
        let mut terms: HashMap<String, TokenMetadata> = HashMap::new();

        let mut position = 0usize;
        for (field, tokens) in &tokenized {
            let field_length = tokens.len() as u32;
            *document.field_lengths.entry(*field).or_insert(0) += field_length;

            if !tokens.is_empty() {
                let text = document.field_text.entry(*field).or_default();
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&tokens.join(" "));
            }

            for token in tokens {
                let segment = self.segment_of(position, total);
                let entry = terms.entry(token.clone()).or_default();
                let occurrence = entry.field_occurrences.entry(*field).or_default();
                occurrence.tf += 1;
                entry.segment_mask |= 1 << segment;
                position += 1;
            }
        }

        // field lengths are only known once every token is counted
        for entry in terms.values_mut() {
            for (field, occurrence) in entry.field_occurrences.iter_mut() {
                occurrence.field_length = document.field_length(*field);
            }
        }

        (document, terms)
    }

    fn segment_of(&self, position: usize, total: usize) -> u32 {
        if total == 0 {
            return 0;
        }
        let segment = (position as u64 * self.segment_count as u64) / total as u64;
        (segment as u32).min(self.segment_count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_note_metadata() {
        let builder = MetadataBuilder::new(Tokenizer::default(), 4);
        let (doc, terms) = builder.build_note("Jon Snow", "Jon walked along the wall");

        assert_eq!(doc.field_length(FieldId::Title), 2);
        assert_eq!(doc.field_length(FieldId::Body), 4);
        assert_eq!(doc.total_token_count, 6);
        assert_eq!(doc.field_text[&FieldId::Title], "jon snow");
        assert_eq!(doc.field_text[&FieldId::Body], "jon walked along wall");

        let jon = &terms["jon"];
        assert_eq!(jon.total_tf(), 2);
        assert_eq!(jon.field_occurrences[&FieldId::Title].tf, 1);
        assert_eq!(jon.field_occurrences[&FieldId::Title].field_length, 2);
        assert_eq!(jon.field_occurrences[&FieldId::Body].field_length, 4);
        // positions 0 and 2 of 6 over 4 segments -> segments 0 and 1
        assert_eq!(jon.segment_mask, 0b0011);
        assert_eq!(terms["wall"].segment_mask, 0b1000);
    }

    #[test]
    fn test_segment_count_clamped() {
        let builder = MetadataBuilder::new(Tokenizer::default(), 64);
        let body: Vec<String> = (0..100).map(|i| format!("w{i}")).collect();
        let (_, terms) = builder.build(&[(FieldId::Body, &body.join(" "))]);
        assert_eq!(terms["w99"].segment_mask, 1 << 31);
        assert_eq!(terms["w0"].segment_mask, 1);
    }

    #[test]
    fn test_empty_document() {
        let builder = MetadataBuilder::new(Tokenizer::default(), 8);
        let (doc, terms) = builder.build_note("", "the of and");
        assert_eq!(doc.total_token_count, 0);
        assert!(terms.is_empty());
        assert!(doc.field_text.is_empty());
    }
}
