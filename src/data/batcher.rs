// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implements Burn's Batcher trait to stack examples into Int
// tensors. All sequences are pre-padded to fixed lengths, so
// batching is flatten-then-reshape with no dynamic padding:
//
//   sentences: Vec of N examples of length L   → [N, L]
//   documents: Vec of N examples of D×L rows   → [N, D, L]
//
// B is the Burn backend — generic so the same batcher serves the
// autodiff training backend and the plain validation backend.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::{DocumentExample, SentenceExample};

/// A batch of flattened sentences for the 3-way sentence model.
#[derive(Debug, Clone)]
pub struct SentenceBatch<B: Backend> {
    /// Token ids — shape [batch, max_sent_len]
    pub ids: Tensor<B, 2, Int>,
    /// Class indices — shape [batch]
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct SentenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SentenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SentenceExample, SentenceBatch<B>> for SentenceBatcher<B> {
    fn batch(&self, items: Vec<SentenceExample>) -> SentenceBatch<B> {
        let batch_size = items.len();
        let sent_len = items[0].ids.len();

        let ids_flat: Vec<i32> = items
            .iter()
            .flat_map(|ex| ex.ids.iter().map(|&id| id as i32))
            .collect();
        let targets: Vec<i32> = items.iter().map(|ex| ex.label as i32).collect();

        let ids = Tensor::<B, 1, Int>::from_ints(ids_flat.as_slice(), &self.device)
            .reshape([batch_size, sent_len]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        SentenceBatch { ids, targets }
    }
}

/// A batch of padded documents for the document-level models.
#[derive(Debug, Clone)]
pub struct DocumentBatch<B: Backend> {
    /// Token ids — shape [batch, max_doc_len, max_sent_len]
    pub ids: Tensor<B, 3, Int>,
    /// Binary document labels — shape [batch]
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct DocumentBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> DocumentBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<DocumentExample, DocumentBatch<B>> for DocumentBatcher<B> {
    fn batch(&self, items: Vec<DocumentExample>) -> DocumentBatch<B> {
        let batch_size = items.len();
        let doc_len = items[0].rows.len();
        let sent_len = items[0].rows[0].len();

        let ids_flat: Vec<i32> = items
            .iter()
            .flat_map(|ex| ex.rows.iter().flatten().map(|&id| id as i32))
            .collect();
        let targets: Vec<i32> = items.iter().map(|ex| ex.label as i32).collect();

        let ids = Tensor::<B, 1, Int>::from_ints(ids_flat.as_slice(), &self.device)
            .reshape([batch_size, doc_len, sent_len]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        DocumentBatch { ids, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_sentence_batch_shape() {
        let batcher = SentenceBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![
            SentenceExample { ids: vec![1, 2, 3], label: 0 },
            SentenceExample { ids: vec![4, 5, 6], label: 2 },
        ]);
        assert_eq!(batch.ids.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2]);
    }

    #[test]
    fn test_document_batch_shape() {
        let batcher = DocumentBatcher::<TestBackend>::new(Default::default());
        let doc = DocumentExample {
            rows: vec![vec![1, 2], vec![3, 4], vec![5, 6]],
            label: 1,
        };
        let batch = batcher.batch(vec![doc.clone(), doc]);
        assert_eq!(batch.ids.dims(), [2, 3, 2]);
        assert_eq!(batch.targets.dims(), [2]);
    }
}
