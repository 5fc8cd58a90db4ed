// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the raw CSV corpus and GPU-ready tensors:
//
//   CSV corpus
//       │
//       ▼
//   CsvCorpusLoader   → rows grouped into labeled Documents
//       │
//       ▼
//   Preprocessor      → vocabulary, id sequences, embedding init
//       │
//       ▼
//   padded Documents  → flattened sentence / document examples
//       │
//       ▼
//   Datasets          → Burn Dataset impls
//       │
//       ▼
//   Batchers          → Int tensor batches
//
// plus the two sampling concerns training depends on: the
// document-granularity validation split and per-epoch balanced
// class sampling.

/// Reads the labeled sentence-level CSV corpus
pub mod loader;

/// Vocabulary, stopwords, id sequences, embedding initialization
pub mod preprocessor;

/// Burn Dataset impls for sentence and document examples
pub mod dataset;

/// Burn Batcher impls producing Int tensor batches
pub mod batcher;

/// Class-balanced index sampling (3-way and binary)
pub mod sampler;

/// Document-granularity validation split
pub mod splitter;
