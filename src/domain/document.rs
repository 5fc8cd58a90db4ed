// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A document is an ordered list of sentences with an optional
// binary label and optional per-sentence rationale labels.
//
// Lifecycle:
//   1. Constructed once from a corpus row-group. Sentences with
//      fewer than `min_sent_len` whitespace tokens are dropped at
//      construction, with their labels filtered in lock-step.
//   2. `generate_sequences` assigns the token-id matrix (called
//      exactly once, after the Preprocessor has been fitted).
//   3. The padded accessors produce truncated/padded *copies* of
//      the sequence matrix — they never mutate the document.
//
// Padding contract (shared by training and inference):
//   - more than `max_doc_len` sentences → keep the first
//     `max_doc_len` rows, in order
//   - fewer → bottom-pad with rows filled with the pad sentinel
//     (`max_features`), which embeds to the zero vector
//   - padded label rows are NonRationale ([0,0,1])

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::preprocessor::Preprocessor;
use crate::domain::label::SentenceLabel;

/// A single document: identity, sentences, labels, and (once
/// generated) the per-sentence token-id sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Corpus identity — kept for traceability in logs and output
    pub doc_id: String,

    /// Ordered sentence texts, after min-length filtering
    pub sentences: Vec<String>,

    /// Binary document label (0/1), absent for unlabeled documents
    pub doc_label: Option<u8>,

    /// Per-sentence rationale labels, filtered in lock-step with
    /// `sentences`; length equals `sentences.len()` when present
    pub sentence_labels: Option<Vec<SentenceLabel>>,

    /// Token-id sequence per sentence, each exactly `max_sent_len`
    /// long; populated lazily by `generate_sequences`
    pub sequences: Option<Vec<Vec<u32>>>,

    /// Sentence count *before* document-level padding
    pub num_sentences: usize,
}

impl Document {
    /// Build a document, dropping sentences shorter than
    /// `min_sent_len` tokens (naive whitespace count) together with
    /// their labels.
    pub fn new(
        doc_id: impl Into<String>,
        sentences: Vec<String>,
        doc_label: Option<u8>,
        sentence_labels: Option<Vec<SentenceLabel>>,
        min_sent_len: usize,
    ) -> Result<Self> {
        if let Some(labels) = &sentence_labels {
            ensure!(
                labels.len() == sentences.len(),
                "document has {} sentences but {} sentence labels",
                sentences.len(),
                labels.len()
            );
        }

        let mut kept_sentences = Vec::with_capacity(sentences.len());
        let mut kept_labels = sentence_labels.as_ref().map(|_| Vec::new());

        for (idx, s) in sentences.into_iter().enumerate() {
            if s.split_whitespace().count() >= min_sent_len {
                if let (Some(kept), Some(labels)) = (kept_labels.as_mut(), sentence_labels.as_ref())
                {
                    kept.push(labels[idx]);
                }
                kept_sentences.push(s);
            }
        }

        let num_sentences = kept_sentences.len();
        Ok(Self {
            doc_id: doc_id.into(),
            sentences: kept_sentences,
            doc_label,
            sentence_labels: kept_labels,
            sequences: None,
            num_sentences,
        })
    }

    /// Number of sentences before padding.
    pub fn len(&self) -> usize {
        self.num_sentences
    }

    pub fn is_empty(&self) -> bool {
        self.num_sentences == 0
    }

    /// Map each sentence to a token-id sequence via a fitted
    /// Preprocessor. Called once; subsequent padded accessors read
    /// the stored matrix.
    pub fn generate_sequences(&mut self, p: &Preprocessor) {
        self.sequences = Some(p.build_sequences(&self.sentences));
    }

    /// Sentence matrix truncated/padded to exactly `max_doc_len`
    /// rows. Padding rows are filled with the pad sentinel so the
    /// embedding lookup maps them to the zero vector.
    pub fn padded_sequences(&self, p: &Preprocessor) -> Result<Vec<Vec<u32>>> {
        let seqs = self
            .sequences
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("sequences not generated for doc '{}'", self.doc_id))?;

        let max_doc_len = p.max_doc_len();
        let mut rows: Vec<Vec<u32>> = seqs.iter().take(max_doc_len).cloned().collect();
        while rows.len() < max_doc_len {
            rows.push(vec![p.pad_id(); p.max_sent_len()]);
        }
        Ok(rows)
    }

    /// As `padded_sequences`, but paired with the label rows:
    /// truncated in lock-step, padded with NonRationale.
    pub fn padded_sequences_with_labels(
        &self,
        p: &Preprocessor,
    ) -> Result<(Vec<Vec<u32>>, Vec<SentenceLabel>)> {
        let labels = self
            .sentence_labels
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("doc '{}' has no sentence labels", self.doc_id))?;

        let rows = self.padded_sequences(p)?;
        let max_doc_len = p.max_doc_len();
        let mut label_rows: Vec<SentenceLabel> =
            labels.iter().take(max_doc_len).copied().collect();
        while label_rows.len() < max_doc_len {
            label_rows.push(SentenceLabel::NonRationale);
        }
        Ok((rows, label_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessor::{Preprocessor, PreprocessorConfig};

    fn fitted_preprocessor(max_doc_len: usize) -> Preprocessor {
        let mut p = Preprocessor::new(PreprocessorConfig {
            max_features: 10,
            max_sent_len: 4,
            max_doc_len,
            embedding_dims: 3,
            stopwords: None,
        });
        let corpus = vec![
            "alpha beta gamma delta".to_string(),
            "epsilon zeta eta theta".to_string(),
        ];
        p.preprocess(&corpus, None).unwrap();
        p
    }

    fn labeled_doc(sentences: &[&str], labels: &[SentenceLabel]) -> Document {
        Document::new(
            "d1",
            sentences.iter().map(|s| s.to_string()).collect(),
            Some(1),
            Some(labels.to_vec()),
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_min_length_filter_keeps_labels_in_lock_step() {
        let doc = Document::new(
            "d1",
            vec![
                "alpha beta".to_string(),
                "".to_string(),
                "gamma delta".to_string(),
            ],
            Some(1),
            Some(vec![
                SentenceLabel::PosRationale,
                SentenceLabel::NonRationale,
                SentenceLabel::NegRationale,
            ]),
            1,
        )
        .unwrap();

        assert_eq!(doc.num_sentences, 2);
        assert_eq!(
            doc.sentence_labels.as_ref().unwrap().as_slice(),
            &[SentenceLabel::PosRationale, SentenceLabel::NegRationale]
        );
    }

    #[test]
    fn test_label_length_mismatch_is_rejected() {
        let result = Document::new(
            "d1",
            vec!["alpha beta".to_string()],
            Some(1),
            Some(vec![]),
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_short_doc_is_bottom_padded_with_sentinel() {
        let p = fitted_preprocessor(5);
        let mut doc = labeled_doc(
            &["alpha beta gamma", "delta epsilon"],
            &[SentenceLabel::PosRationale, SentenceLabel::NonRationale],
        );
        doc.generate_sequences(&p);

        let (rows, labels) = doc.padded_sequences_with_labels(&p).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(labels.len(), 5);

        // Tail rows are entirely the pad sentinel, labeled NonRationale.
        for row in &rows[2..] {
            assert!(row.iter().all(|&id| id == p.pad_id()));
        }
        for label in &labels[2..] {
            assert_eq!(*label, SentenceLabel::NonRationale);
        }
        // Real rows survive untouched at the top.
        assert_eq!(labels[0], SentenceLabel::PosRationale);
    }

    #[test]
    fn test_long_doc_is_truncated_in_order() {
        let p = fitted_preprocessor(2);
        let mut doc = labeled_doc(
            &["alpha beta", "gamma delta", "epsilon zeta"],
            &[
                SentenceLabel::PosRationale,
                SentenceLabel::NegRationale,
                SentenceLabel::NonRationale,
            ],
        );
        doc.generate_sequences(&p);

        let (rows, labels) = doc.padded_sequences_with_labels(&p).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            labels.as_slice(),
            &[SentenceLabel::PosRationale, SentenceLabel::NegRationale]
        );
        // First two sequence rows, original order.
        let seqs = doc.sequences.as_ref().unwrap();
        assert_eq!(rows[0], seqs[0]);
        assert_eq!(rows[1], seqs[1]);
    }

    #[test]
    fn test_padded_sequences_requires_generation() {
        let p = fitted_preprocessor(3);
        let doc = labeled_doc(&["alpha beta"], &[SentenceLabel::NonRationale]);
        assert!(doc.padded_sequences(&p).is_err());
    }
}
