// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure data types for the rationale-classification task.
// No Burn types, no file I/O — just structs, enums, and traits.
//
// A *rationale* is a sentence judged responsible (positively or
// negatively) for a document's overall label. The domain layer
// defines documents, their per-sentence labels, and the seam
// through which labeled corpora enter the system.

// A labeled document: ordered sentences plus optional labels
pub mod document;

// The 3-way per-sentence rationale label
pub mod label;

// Core abstractions (traits) that other layers implement
pub mod traits;
