// ============================================================
// Layer 4 — Datasets
// ============================================================
// Two example shapes feed the two training stages:
//
//   SentenceExample — one padded sentence (flattened out of its
//                     document) with its 3-way class index
//   DocumentExample — one padded sentence matrix with the binary
//                     document label
//
// Both implement Burn's Dataset trait so the unbalanced training
// mode can use the stock DataLoader; the balanced mode indexes the
// example vectors directly.

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::preprocessor::Preprocessor;
use crate::domain::document::Document;

/// One sentence, padded to `max_sent_len`, with its class index
/// (0 = pos-rationale, 1 = neg-rationale, 2 = non-rationale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceExample {
    pub ids: Vec<u32>,
    pub label: usize,
}

/// One document: `max_doc_len` rows of `max_sent_len` ids, plus the
/// binary document label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentExample {
    pub rows: Vec<Vec<u32>>,
    pub label: u8,
}

/// Flatten all (sentence, label) pairs across `docs`, including the
/// padding rows each document contributes. Document grouping is
/// discarded — the sentence model never sees document context.
pub fn flatten_sentence_examples(
    docs: &[Document],
    p: &Preprocessor,
) -> Result<Vec<SentenceExample>> {
    let mut examples = Vec::new();
    for doc in docs {
        let (rows, labels) = doc.padded_sequences_with_labels(p)?;
        for (ids, label) in rows.into_iter().zip(labels) {
            examples.push(SentenceExample {
                ids,
                label: label.class_index(),
            });
        }
    }
    Ok(examples)
}

/// One DocumentExample per labeled document.
pub fn document_examples(docs: &[Document], p: &Preprocessor) -> Result<Vec<DocumentExample>> {
    docs.iter()
        .map(|doc| {
            let label = doc
                .doc_label
                .with_context(|| format!("doc '{}' has no document label", doc.doc_id))?;
            Ok(DocumentExample {
                rows: doc.padded_sequences(p)?,
                label,
            })
        })
        .collect()
}

pub struct SentenceDataset {
    examples: Vec<SentenceExample>,
}

impl SentenceDataset {
    pub fn new(examples: Vec<SentenceExample>) -> Self {
        Self { examples }
    }
}

impl Dataset<SentenceExample> for SentenceDataset {
    fn get(&self, index: usize) -> Option<SentenceExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

pub struct DocumentDataset {
    examples: Vec<DocumentExample>,
}

impl DocumentDataset {
    pub fn new(examples: Vec<DocumentExample>) -> Self {
        Self { examples }
    }
}

impl Dataset<DocumentExample> for DocumentDataset {
    fn get(&self, index: usize) -> Option<DocumentExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}
