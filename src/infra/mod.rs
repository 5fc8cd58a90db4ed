// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to any one business
// layer:
//
//   checkpoint.rs    — named model checkpoints (CompactRecorder)
//                      plus run-configuration JSON persistence
//
//   vocab_store.rs   — fitted-vocabulary persistence, so inference
//                      tokenizes with exactly the ids training used
//
//   word_vectors.rs  — pretrained word2vec binary reader
//
//   metrics.rs       — scoring policies (F-beta / precision /
//                      recall) and the per-epoch metrics CSV

/// Named model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics: scoring policies and CSV logging
pub mod metrics;

/// Fitted vocabulary persistence
pub mod vocab_store;

/// word2vec binary format reader
pub mod word_vectors;
