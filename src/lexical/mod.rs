//! Lexical scoring (ResoRank)
//!
//! BM25F over title and body fields, boosted when matched terms share
//! positional segments and when the whole query appears as a phrase.

pub mod metadata;
pub mod proximity;
pub mod scorer;
pub mod tokenizer;

pub use metadata::{
    CorpusStatistics, DocumentMetadata, FieldId, FieldOccurrence, MetadataBuilder, TokenMetadata,
};
pub use proximity::ProximityStrategy;
pub use scorer::{bm25_idf, FieldParams, LexicalConfig, LexicalMatch, LexicalScorer};
pub use tokenizer::Tokenizer;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexicalError {
    #[error("Document id must not be empty")]
    InvalidDocumentId,

    #[error("Invalid token metadata: {0}")]
    InvalidMetadata(String),
}
