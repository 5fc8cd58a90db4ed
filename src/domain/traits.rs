// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits instead of
// concrete loaders, so the corpus format can change without
// touching the training pipeline.
//
// Implementations:
//   - CsvCorpusLoader → labeled sentence-level CSV corpus
//   - (tests) in-memory fixtures

use anyhow::Result;
use crate::domain::document::Document;

/// Any component that can produce the labeled document corpus.
pub trait CorpusSource {
    /// Load every document, grouped and labeled, in corpus order.
    fn load_all(&self) -> Result<Vec<Document>>;
}
