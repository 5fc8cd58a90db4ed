// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the labeled sentence-level corpus from CSV:
//
//   doc_id,doc_lbl,sentence_number,sentence,sentence_lbl
//
// with doc_lbl and sentence_lbl in {-1, 1}, converted internally
// to {0, 1}. Rows are grouped by doc_id in first-seen order; the
// document label must be constant within a group (validated —
// a corpus that disagrees with itself is a fatal config error,
// not something to paper over).
//
// A flagged sentence becomes a positive or negative rationale
// depending on its document's label direction.

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::document::Document;
use crate::domain::label::SentenceLabel;
use crate::domain::traits::CorpusSource;

/// Sentences shorter than this many tokens are dropped at
/// Document construction.
const MIN_SENT_LEN: usize = 1;

/// One CSV row, as serde sees it.
#[derive(Debug, Deserialize)]
struct CorpusRow {
    doc_id: String,
    doc_lbl: i8,
    #[allow(unused)]
    sentence_number: usize,
    sentence: String,
    sentence_lbl: i8,
}

/// Loads the labeled corpus from a single CSV file.
pub struct CsvCorpusLoader {
    path: PathBuf,
}

impl CsvCorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for CsvCorpusLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("cannot open corpus '{}'", self.path.display()))?;

        // Accumulate rows per doc_id, preserving first-seen order.
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, (u8, Vec<(String, u8)>)> = HashMap::new();

        for (row_idx, row) in reader.deserialize::<CorpusRow>().enumerate() {
            let row = row.with_context(|| {
                format!("malformed row {} in '{}'", row_idx + 1, self.path.display())
            })?;
            let doc_label = to_binary(row.doc_lbl)
                .with_context(|| format!("bad doc_lbl for doc '{}'", row.doc_id))?;
            let sent_label = to_binary(row.sentence_lbl)
                .with_context(|| format!("bad sentence_lbl for doc '{}'", row.doc_id))?;

            match groups.get_mut(&row.doc_id) {
                Some((existing_label, sentences)) => {
                    ensure!(
                        *existing_label == doc_label,
                        "doc '{}' has inconsistent doc_lbl values",
                        row.doc_id
                    );
                    sentences.push((row.sentence, sent_label));
                }
                None => {
                    order.push(row.doc_id.clone());
                    groups.insert(row.doc_id, (doc_label, vec![(row.sentence, sent_label)]));
                }
            }
        }

        let mut documents = Vec::with_capacity(order.len());
        for doc_id in order {
            let Some((doc_label, rows)) = groups.remove(&doc_id) else {
                continue;
            };

            let (sentences, labels): (Vec<String>, Vec<SentenceLabel>) = rows
                .into_iter()
                .map(|(sentence, flag)| (sentence, SentenceLabel::from_binary(flag, doc_label)))
                .unzip();

            documents.push(Document::new(
                doc_id,
                sentences,
                Some(doc_label),
                Some(labels),
                MIN_SENT_LEN,
            )?);
        }

        tracing::info!(
            "loaded {} documents from '{}'",
            documents.len(),
            self.path.display()
        );
        Ok(documents)
    }
}

/// {-1, 1} → {0, 1}; anything else is a corpus error.
fn to_binary(label: i8) -> Result<u8> {
    match label {
        -1 => Ok(0),
        1 => Ok(1),
        other => bail!("label must be -1 or 1, got {}", other),
    }
}
