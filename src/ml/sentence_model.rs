// ============================================================
// Layer 5 — Sentence Model
// ============================================================
// The per-sentence 3-way classifier (Kim-style CNN):
//
//   token ids → embedding lookup ((max_features+1) × dims)
//            → N parallel 1-D convolutions, one per n-gram width,
//              valid padding, ReLU
//            → 1-max pooling over the remaining length axis
//            → concat into one sentence vector (n_filters × N wide)
//            → dropout → dense → 3 logits
//
// Its trained embedding table, convolution filters, and classifier
// weights seed the document model (see transplant.rs).
//
// Reference: Kim (2014), Convolutional Neural Networks for
// Sentence Classification; Zhang, Marshall & Wallace (2016).

use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig,
        PaddingConfig1d,
    },
    prelude::*,
    tensor::activation::{relu, softmax},
    tensor::backend::AutodiffBackend,
};

/// Number of rationale classes: pos-rationale, neg-rationale, non-rationale.
pub const NUM_SENTENCE_CLASSES: usize = 3;

#[derive(Config, Debug)]
pub struct SentenceCnnConfig {
    pub max_features: usize,
    pub max_sent_len: usize,
    pub embedding_dims: usize,
    pub n_filters: usize,
    pub filter_widths: Vec<usize>,
    pub dropout: f64,
}

impl SentenceCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SentenceCnn<B> {
        // Row `max_features` is the pad/OOV token; the table is one
        // row taller than the vocabulary cap.
        let embedding =
            EmbeddingConfig::new(self.max_features + 1, self.embedding_dims).init(device);

        let convs: Vec<Conv1d<B>> = self
            .filter_widths
            .iter()
            .map(|&n_gram| {
                Conv1dConfig::new(self.embedding_dims, self.n_filters, n_gram)
                    .with_padding(PaddingConfig1d::Valid)
                    .init(device)
            })
            .collect();

        let sentence_vector_dims = self.n_filters * self.filter_widths.len();
        let classifier = LinearConfig::new(sentence_vector_dims, NUM_SENTENCE_CLASSES).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();

        SentenceCnn {
            embedding,
            convs,
            dropout,
            classifier,
        }
    }
}

#[derive(Module, Debug)]
pub struct SentenceCnn<B: Backend> {
    pub embedding: Embedding<B>,
    pub convs: Vec<Conv1d<B>>,
    pub dropout: Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> SentenceCnn<B> {
    /// ids: [batch, max_sent_len] → logits: [batch, 3]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let embedded = self.embedding.forward(ids); // [batch, len, dims]
        // Conv1d expects [batch, channels, length].
        let x = embedded.swap_dims(1, 2);

        let mut branches = Vec::with_capacity(self.convs.len());
        for conv in &self.convs {
            let features = relu(conv.forward(x.clone())); // [batch, filters, len - n + 1]
            // 1-max pooling over the length axis.
            let pooled = features.max_dim(2); // [batch, filters, 1]
            branches.push(pooled.squeeze::<2>(2)); // [batch, filters]
        }

        let sentence_vector = Tensor::cat(branches, 1);
        let sentence_vector = self.dropout.forward(sentence_vector);
        self.classifier.forward(sentence_vector)
    }

    /// Softmax over the 3 classes.
    pub fn probabilities(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        softmax(self.forward(ids), 1)
    }

    pub fn forward_loss(
        &self,
        ids: Tensor<B, 2, Int>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>)
    where
        B: AutodiffBackend,
    {
        let logits = self.forward(ids);
        let ce = burn::nn::loss::CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), targets);
        (loss, logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn tiny_config() -> SentenceCnnConfig {
        SentenceCnnConfig::new(10, 6, 4, 2, vec![2, 3], 0.0)
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: SentenceCnn<TestBackend> = tiny_config().init(&device);

        let ids = Tensor::<TestBackend, 1, Int>::from_ints(
            [0, 1, 2, 3, 10, 10, 4, 5, 6, 7, 10, 10].as_slice(),
            &device,
        )
        .reshape([2, 6]);

        let logits = model.forward(ids);
        assert_eq!(logits.dims(), [2, NUM_SENTENCE_CLASSES]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let model: SentenceCnn<TestBackend> = tiny_config().init(&device);

        let ids = Tensor::<TestBackend, 1, Int>::from_ints(
            [1, 2, 3, 4, 5, 6].as_slice(),
            &device,
        )
        .reshape([1, 6]);

        let probs: Vec<f32> = model
            .probabilities(ids)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_embedding_table_height() {
        let device = Default::default();
        let model: SentenceCnn<TestBackend> = tiny_config().init(&device);
        assert_eq!(model.embedding.weight.dims(), [11, 4]);
    }
}
