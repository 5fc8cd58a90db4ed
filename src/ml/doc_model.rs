// ============================================================
// Layer 5 — Document Models
// ============================================================
// Two document classifiers share one convolutional trunk:
//
//   ids [batch, max_doc_len, max_sent_len]
//     → flatten to one very wide token row per document
//     → embedding → [batch, 1, max_doc_len, max_sent_len × dims]
//     → per-n-gram 2-D convolution with kernel [1, n_gram × dims]
//       and stride [1, dims], so each filter slides over token
//       positions of one sentence row at a time
//     → 1-max pool per sentence row → [batch, max_doc_len, filters]
//     → concat across n-gram widths → per-sentence vectors
//
// RationaleCnn then scores every sentence vector with the (possibly
// transplanted) 3-way sentence predictor and uses
// max(P(pos-rationale), P(neg-rationale)) as that sentence's weight
// in the document sum. SimpleDocCnn is the ablation baseline: an
// unweighted sum of sentence vectors.
//
// Both end with dropout → dense(1) → sigmoid.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::BinaryCrossEntropyLossConfig,
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid, softmax},
};

use crate::ml::sentence_model::NUM_SENTENCE_CLASSES;

#[derive(Config, Debug)]
pub struct DocModelConfig {
    pub max_features: usize,
    pub max_sent_len: usize,
    pub max_doc_len: usize,
    pub embedding_dims: usize,
    pub n_filters: usize,
    pub filter_widths: Vec<usize>,
    pub sent_dropout: f64,
    pub doc_dropout: f64,
    /// When true the transplanted sentence predictor keeps training
    /// inside the document model; when false it is frozen.
    pub end_to_end_train: bool,
}

impl DocModelConfig {
    pub fn sentence_vector_dims(&self) -> usize {
        self.n_filters * self.filter_widths.len()
    }

    fn init_embedding<B: Backend>(&self, device: &B::Device) -> Embedding<B> {
        EmbeddingConfig::new(self.max_features + 1, self.embedding_dims).init(device)
    }

    fn init_convs<B: Backend>(&self, device: &B::Device) -> Vec<Conv2d<B>> {
        self.filter_widths
            .iter()
            .map(|&n_gram| {
                Conv2dConfig::new([1, self.n_filters], [1, n_gram * self.embedding_dims])
                    .with_stride([1, self.embedding_dims])
                    .with_padding(PaddingConfig2d::Valid)
                    .init(device)
            })
            .collect()
    }

    /// Rationale-weighted document model. Its embedding, convolutions
    /// and sentence predictor are freshly initialized here; see
    /// `transplant::build_rationale_model` for seeding them from a
    /// trained sentence model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> RationaleCnn<B> {
        RationaleCnn {
            embedding: self.init_embedding(device),
            convs: self.init_convs(device),
            sent_dropout: DropoutConfig::new(self.sent_dropout).init(),
            sentence_predictor: LinearConfig::new(
                self.sentence_vector_dims(),
                NUM_SENTENCE_CLASSES,
            )
            .init(device),
            doc_dropout: DropoutConfig::new(self.doc_dropout).init(),
            doc_head: LinearConfig::new(self.sentence_vector_dims(), 1).init(device),
        }
    }

    /// Unweighted-sum baseline.
    pub fn init_simple<B: Backend>(&self, device: &B::Device) -> SimpleDocCnn<B> {
        SimpleDocCnn {
            embedding: self.init_embedding(device),
            convs: self.init_convs(device),
            sent_dropout: DropoutConfig::new(self.sent_dropout).init(),
            doc_dropout: DropoutConfig::new(self.doc_dropout).init(),
            doc_head: LinearConfig::new(self.sentence_vector_dims(), 1).init(device),
        }
    }
}

/// Seam between the trainer and the two document model variants.
pub trait DocClassifier<B: Backend> {
    /// ids: [batch, max_doc_len, max_sent_len] → P(label=1): [batch]
    fn forward(&self, ids: Tensor<B, 3, Int>) -> Tensor<B, 1>;

    /// Weighted binary cross-entropy against sigmoid probabilities.
    /// `pos_class_weight` scales the positive-class term.
    fn forward_loss(
        &self,
        ids: Tensor<B, 3, Int>,
        targets: Tensor<B, 1, Int>,
        pos_class_weight: f64,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let probs = self.forward(ids);
        let bce = BinaryCrossEntropyLossConfig::new()
            .with_weights(Some(vec![1.0, pos_class_weight as f32]))
            .init(&probs.device());
        let loss = bce.forward(probs.clone(), targets);
        (loss, probs)
    }
}

// ─── Shared convolutional trunk ───────────────────────────────────────────────

/// ids [batch, d, l] → per-sentence vectors [batch, d, filters × widths].
fn sentence_vectors<B: Backend>(
    embedding: &Embedding<B>,
    convs: &[Conv2d<B>],
    ids: Tensor<B, 3, Int>,
) -> Tensor<B, 3> {
    let [batch, doc_len, sent_len] = ids.dims();

    let flat = ids.reshape([batch, doc_len * sent_len]);
    let embedded = embedding.forward(flat); // [batch, d*l, dims]
    let dims = embedded.dims()[2];
    // One channel, one row per sentence, token embeddings laid out
    // end to end along the width axis.
    let x = embedded.reshape([batch, 1, doc_len, sent_len * dims]);

    let mut branches = Vec::with_capacity(convs.len());
    for conv in convs {
        let features = relu(conv.forward(x.clone())); // [batch, filters, d, l - n + 1]
        let pooled = features.max_dim(3); // [batch, filters, d, 1]
        branches.push(pooled.squeeze::<3>(3).swap_dims(1, 2)); // [batch, d, filters]
    }
    Tensor::cat(branches, 2)
}

// ─── Rationale-weighted model ─────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct RationaleCnn<B: Backend> {
    pub embedding: Embedding<B>,
    pub convs: Vec<Conv2d<B>>,
    pub sent_dropout: Dropout,
    pub sentence_predictor: Linear<B>,
    pub doc_dropout: Dropout,
    pub doc_head: Linear<B>,
}

impl<B: Backend> RationaleCnn<B> {
    /// Sentence vectors and their 3-way softmax scores, shared by the
    /// document forward pass and rationale extraction.
    fn sentence_stack(&self, ids: Tensor<B, 3, Int>) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let vectors = sentence_vectors(&self.embedding, &self.convs, ids);
        let vectors = self.sent_dropout.forward(vectors);
        let logits = self.sentence_predictor.forward(vectors.clone()); // [batch, d, 3]
        (vectors, softmax(logits, 2))
    }

    /// Per-sentence rationale probabilities — shape [batch, d, 3].
    pub fn sentence_probabilities(&self, ids: Tensor<B, 3, Int>) -> Tensor<B, 3> {
        self.sentence_stack(ids).1
    }
}

impl<B: Backend> DocClassifier<B> for RationaleCnn<B> {
    fn forward(&self, ids: Tensor<B, 3, Int>) -> Tensor<B, 1> {
        let [batch, doc_len, _] = ids.dims();
        let (vectors, probs) = self.sentence_stack(ids);

        // A sentence's weight is its strongest *rationale* score —
        // the non-rationale column never contributes.
        let weights = probs
            .slice([0..batch, 0..doc_len, 0..NUM_SENTENCE_CLASSES - 1])
            .max_dim(2); // [batch, d, 1]

        let doc_vector = (vectors * weights).sum_dim(1).squeeze::<2>(1);
        let doc_vector = self.doc_dropout.forward(doc_vector);
        sigmoid(self.doc_head.forward(doc_vector)).squeeze::<1>(1)
    }
}

// ─── Unweighted baseline ──────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct SimpleDocCnn<B: Backend> {
    pub embedding: Embedding<B>,
    pub convs: Vec<Conv2d<B>>,
    pub sent_dropout: Dropout,
    pub doc_dropout: Dropout,
    pub doc_head: Linear<B>,
}

impl<B: Backend> DocClassifier<B> for SimpleDocCnn<B> {
    fn forward(&self, ids: Tensor<B, 3, Int>) -> Tensor<B, 1> {
        let vectors = sentence_vectors(&self.embedding, &self.convs, ids);
        let vectors = self.sent_dropout.forward(vectors);

        let doc_vector = vectors.sum_dim(1).squeeze::<2>(1);
        let doc_vector = self.doc_dropout.forward(doc_vector);
        sigmoid(self.doc_head.forward(doc_vector)).squeeze::<1>(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn tiny_config() -> DocModelConfig {
        DocModelConfig::new(10, 5, 3, 4, 2, vec![2, 3], 0.0, 0.0, false)
    }

    fn tiny_ids(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3, Int> {
        // One document of 3 sentences, 5 tokens each; last row is padding.
        let row: Vec<i32> = vec![1, 2, 3, 4, 10, 5, 6, 7, 10, 10, 10, 10, 10, 10, 10];
        Tensor::<TestBackend, 1, Int>::from_ints(row.as_slice(), device).reshape([1, 3, 5])
    }

    #[test]
    fn test_rationale_forward_is_a_probability() {
        let device = Default::default();
        let model: RationaleCnn<TestBackend> = tiny_config().init(&device);

        let probs: Vec<f32> = model
            .forward(tiny_ids(&device))
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(probs.len(), 1);
        assert!((0.0..=1.0).contains(&probs[0]));
    }

    #[test]
    fn test_simple_forward_is_a_probability() {
        let device = Default::default();
        let model: SimpleDocCnn<TestBackend> = tiny_config().init_simple(&device);

        let probs: Vec<f32> = model
            .forward(tiny_ids(&device))
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(probs.len(), 1);
        assert!((0.0..=1.0).contains(&probs[0]));
    }

    #[test]
    fn test_sentence_probabilities_shape_and_normalization() {
        let device = Default::default();
        let model: RationaleCnn<TestBackend> = tiny_config().init(&device);

        let probs = model.sentence_probabilities(tiny_ids(&device));
        assert_eq!(probs.dims(), [1, 3, NUM_SENTENCE_CLASSES]);

        let flat: Vec<f32> = probs.into_data().to_vec::<f32>().unwrap();
        for row in flat.chunks(NUM_SENTENCE_CLASSES) {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "softmax row must sum to 1");
        }
    }

    #[test]
    fn test_forward_loss_is_finite() {
        let device = Default::default();
        let model: SimpleDocCnn<TestBackend> = tiny_config().init_simple(&device);

        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1].as_slice(), &device);
        let (loss, _) = model.forward_loss(tiny_ids(&device), targets, 2.0);
        let value = loss.into_scalar().elem::<f64>();
        assert!(value.is_finite() && value >= 0.0);
    }
}
