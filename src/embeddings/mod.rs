// src/embeddings/mod.rs
// C4: Embedding Index and its provider abstraction.

pub mod index;
pub mod provider;

pub use index::{EmbeddedItem, EmbeddingIndex, SearchResult, decompose_identifier, symbol_to_text};
pub use provider::{EmbeddingProvider, LocalHashProvider};
