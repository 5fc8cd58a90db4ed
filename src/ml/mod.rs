// ============================================================
// Layer 5 — Machine Learning Layer
// ============================================================
// The two-level convolutional architecture and its training:
//
//   sentence_model.rs — 3-way rationale classifier over single
//                       sentences (embedding + parallel Conv1d +
//                       1-max pooling + dense)
//
//   doc_model.rs      — document classifiers over sentence
//                       matrices; the rationale-weighted model and
//                       the unweighted-sum baseline share one 2-D
//                       convolutional trunk
//
//   transplant.rs     — shape-checked weight transfer from the
//                       trained sentence model into the document
//                       model, including the Conv1d → Conv2d
//                       filter reshape
//
//   trainer.rs        — the two training stages, each with a
//                       balanced-sampling and an unbalanced mode,
//                       checkpointing on best validation metric
//
//   inferencer.rs     — checkpoint loading, document prediction,
//                       and top-k rationale extraction

/// Per-sentence 3-way CNN classifier
pub mod sentence_model;

/// Document-level classifiers (rationale-weighted and baseline)
pub mod doc_model;

/// Sentence-to-document weight transfer
pub mod transplant;

/// Two-stage training loops
pub mod trainer;

/// Prediction and rationale extraction
pub mod inferencer;
