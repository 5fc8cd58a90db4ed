// ============================================================
// Layer 5 — Weight Transplant
// ============================================================
// Moves trained sentence-model weights into the document model.
//
// The document model convolves a [1, max_doc_len, max_sent_len×dims]
// image with kernels of shape [1, n_gram×dims] at stride [1, dims],
// which is exactly the sentence model's 1-D convolution applied to
// each sentence row. A 1-D filter [filters, dims, n_gram] therefore
// maps onto a 2-D filter [filters, 1, 1, n_gram×dims] by swapping
// the channel and tap axes before flattening:
//
//   w2[f, 0, 0, t×dims + e] = w1[f, e, t]
//
// Every copy is shape-checked up front; a mismatch is a
// configuration bug and fails loudly rather than silently
// truncating.

use anyhow::{ensure, Result};
use burn::{
    nn::{conv::Conv1d, conv::Conv2d, Embedding, Linear},
    prelude::*,
    tensor::TensorData,
};

use crate::ml::doc_model::{DocModelConfig, RationaleCnn};
use crate::ml::sentence_model::SentenceCnn;

/// Replace `dst`'s embedding table with `matrix` (pretrained vectors
/// plus the zero pad row).
pub fn embedding_from_matrix<B: Backend>(
    dst: Embedding<B>,
    matrix: &[Vec<f32>],
    device: &B::Device,
) -> Result<Embedding<B>> {
    let [rows, dims] = dst.weight.dims();
    ensure!(
        matrix.len() == rows,
        "embedding table has {} rows but the init matrix has {}",
        rows,
        matrix.len()
    );
    ensure!(
        matrix.iter().all(|row| row.len() == dims),
        "embedding init matrix rows must all have {} dims",
        dims
    );

    let flat: Vec<f32> = matrix.iter().flatten().copied().collect();
    let weight = Tensor::<B, 2>::from_data(TensorData::new(flat, [rows, dims]), device);
    let mut dst = dst;
    dst.weight = dst.weight.map(|_| weight.clone().require_grad());
    Ok(dst)
}

/// Copy the (trained) embedding table from one model's embedding
/// layer into another's. Both tables must have identical shape.
pub fn copy_embedding<B: Backend>(src: &Embedding<B>, dst: Embedding<B>) -> Result<Embedding<B>> {
    ensure!(
        src.weight.dims() == dst.weight.dims(),
        "embedding shape mismatch: {:?} vs {:?}",
        src.weight.dims(),
        dst.weight.dims()
    );
    let weight = src.weight.val().detach();
    let mut dst = dst;
    dst.weight = dst.weight.map(|_| weight.clone().require_grad());
    Ok(dst)
}

/// Reshape a trained 1-D convolution into the equivalent 2-D
/// convolution over flattened sentence rows.
pub fn conv1d_to_conv2d<B: Backend>(src: &Conv1d<B>, dst: Conv2d<B>) -> Result<Conv2d<B>> {
    let [filters, dims, n_gram] = src.weight.dims();
    let expected = [filters, 1, 1, n_gram * dims];
    ensure!(
        dst.weight.dims() == expected,
        "conv2d weight shape {:?} does not match the reshaped conv1d filter {:?}",
        dst.weight.dims(),
        expected
    );

    // [filters, dims, n_gram] → [filters, n_gram, dims] → flatten, so
    // the 2-D kernel walks tap-major over each sentence row.
    // Detach only after the reshape: require_grad needs a leaf tensor.
    let weight = src
        .weight
        .val()
        .swap_dims(1, 2)
        .reshape(expected)
        .detach();

    let mut dst = dst;
    dst.weight = dst.weight.map(|_| weight.clone().require_grad());
    if let (Some(src_bias), Some(dst_bias)) = (&src.bias, dst.bias.take()) {
        ensure!(
            src_bias.dims() == dst_bias.dims(),
            "conv bias shape mismatch: {:?} vs {:?}",
            src_bias.dims(),
            dst_bias.dims()
        );
        let bias = src_bias.val().detach();
        dst.bias = Some(dst_bias.map(|_| bias.clone().require_grad()));
    }
    Ok(dst)
}

/// Copy a dense layer's weights. With `trainable == false` the copy
/// is excluded from further gradient updates.
pub fn copy_linear<B: Backend>(src: &Linear<B>, dst: Linear<B>, trainable: bool) -> Result<Linear<B>> {
    ensure!(
        src.weight.dims() == dst.weight.dims(),
        "linear shape mismatch: {:?} vs {:?}",
        src.weight.dims(),
        dst.weight.dims()
    );

    let grad = |t: Tensor<B, 2>| {
        if trainable {
            t.require_grad()
        } else {
            t.set_require_grad(false)
        }
    };
    let weight = grad(src.weight.val().detach());
    let mut dst = dst;
    dst.weight = dst.weight.map(|_| weight.clone());

    if let (Some(src_bias), Some(dst_bias)) = (&src.bias, dst.bias.take()) {
        let bias = src_bias.val().detach();
        let bias = if trainable {
            bias.require_grad()
        } else {
            bias.set_require_grad(false)
        };
        dst.bias = Some(dst_bias.map(|_| bias.clone()));
    }
    Ok(dst)
}

/// Build the rationale-weighted document model seeded from a
/// sentence model: embedding and convolutions are copied and remain
/// trainable; the sentence predictor is copied and frozen unless
/// `end_to_end_train` is set.
pub fn build_rationale_model<B: Backend>(
    config: &DocModelConfig,
    sentence_model: &SentenceCnn<B>,
    sentence_model_trained: bool,
    device: &B::Device,
) -> Result<RationaleCnn<B>> {
    if !sentence_model_trained {
        tracing::warn!("sentence model has not been pre-trained; transplanting raw weights");
    }
    ensure!(
        sentence_model.convs.len() == config.filter_widths.len(),
        "sentence model has {} convolution branches but the document config expects {}",
        sentence_model.convs.len(),
        config.filter_widths.len()
    );

    let mut model = config.init::<B>(device);
    model.embedding = copy_embedding(&sentence_model.embedding, model.embedding)?;

    let fresh: Vec<_> = std::mem::take(&mut model.convs);
    for (src, dst) in sentence_model.convs.iter().zip(fresh) {
        model.convs.push(conv1d_to_conv2d(src, dst)?);
    }

    model.sentence_predictor = copy_linear(
        &sentence_model.classifier,
        model.sentence_predictor,
        config.end_to_end_train,
    )?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::sentence_model::SentenceCnnConfig;
    use burn::tensor::activation::relu;

    type TestBackend = burn::backend::NdArray;
    type AutodiffTest = burn::backend::Autodiff<burn::backend::NdArray>;

    const MAX_FEATURES: usize = 8;
    const SENT_LEN: usize = 5;
    const DIMS: usize = 3;
    const FILTERS: usize = 2;

    fn sentence_config() -> SentenceCnnConfig {
        SentenceCnnConfig::new(MAX_FEATURES, SENT_LEN, DIMS, FILTERS, vec![2, 3], 0.0)
    }

    fn doc_config() -> DocModelConfig {
        DocModelConfig::new(MAX_FEATURES, SENT_LEN, 2, DIMS, FILTERS, vec![2, 3], 0.0, 0.0, false)
    }

    /// The transplanted 2-D convolution must produce, on each
    /// sentence row, exactly the feature map the 1-D convolution
    /// produces on that sentence alone.
    #[test]
    fn test_conv_transplant_preserves_feature_maps() {
        let device = Default::default();
        let sent: SentenceCnn<TestBackend> = sentence_config().init(&device);
        let doc = build_rationale_model(&doc_config(), &sent, true, &device).unwrap();

        let tokens: Vec<i32> = vec![1, 4, 2, 7, 3];
        let ids_1d = Tensor::<TestBackend, 1, Int>::from_ints(tokens.as_slice(), &device)
            .reshape([1, SENT_LEN]);
        // Same sentence as row 0 of a 2-row document; row 1 is padding.
        let mut doc_tokens = tokens.clone();
        doc_tokens.extend(std::iter::repeat(MAX_FEATURES as i32).take(SENT_LEN));
        let ids_2d = Tensor::<TestBackend, 1, Int>::from_ints(doc_tokens.as_slice(), &device)
            .reshape([1, 2, SENT_LEN]);

        for (branch, &n_gram) in [2usize, 3].iter().enumerate() {
            let out_len = SENT_LEN - n_gram + 1;

            let embedded = sent.embedding.forward(ids_1d.clone()).swap_dims(1, 2);
            let expected: Vec<f32> = relu(sent.convs[branch].forward(embedded))
                .into_data()
                .to_vec::<f32>()
                .unwrap();

            let flat = ids_2d.clone().reshape([1, 2 * SENT_LEN]);
            let image = doc
                .embedding
                .forward(flat)
                .reshape([1, 1, 2, SENT_LEN * DIMS]);
            let features = relu(doc.convs[branch].forward(image)); // [1, filters, 2, out_len]
            let row0: Vec<f32> = features
                .slice([0..1, 0..FILTERS, 0..1, 0..out_len])
                .reshape([1, FILTERS, out_len])
                .into_data()
                .to_vec::<f32>()
                .unwrap();

            assert_eq!(expected.len(), row0.len());
            for (e, r) in expected.iter().zip(&row0) {
                assert!(
                    (e - r).abs() < 1e-5,
                    "n_gram={} feature maps diverge: {} vs {}",
                    n_gram,
                    e,
                    r
                );
            }
        }
    }

    #[test]
    fn test_embedding_is_shared_after_transplant() {
        let device = Default::default();
        let sent: SentenceCnn<TestBackend> = sentence_config().init(&device);
        let doc = build_rationale_model(&doc_config(), &sent, true, &device).unwrap();

        let a: Vec<f32> = sent.embedding.weight.val().into_data().to_vec::<f32>().unwrap();
        let b: Vec<f32> = doc.embedding.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    /// On the autodiff backend the reshaped conv kernels must come
    /// out as tracked leaf tensors; a detach taken too early leaves
    /// a non-leaf that panics on require_grad.
    #[test]
    fn test_transplanted_convs_are_trainable_on_autodiff() {
        let device = Default::default();
        let sent: SentenceCnn<AutodiffTest> = sentence_config().init(&device);
        let doc = build_rationale_model(&doc_config(), &sent, true, &device).unwrap();

        for conv in &doc.convs {
            assert!(conv.weight.val().is_require_grad());
            if let Some(bias) = &conv.bias {
                assert!(bias.val().is_require_grad());
            }
        }
        assert!(doc.embedding.weight.val().is_require_grad());
    }

    #[test]
    fn test_sentence_predictor_is_frozen_by_default() {
        let device = Default::default();
        let sent: SentenceCnn<AutodiffTest> = sentence_config().init(&device);

        let frozen = build_rationale_model(&doc_config(), &sent, true, &device).unwrap();
        assert!(!frozen.sentence_predictor.weight.val().is_require_grad());

        let mut end_to_end = doc_config();
        end_to_end.end_to_end_train = true;
        let trainable = build_rationale_model(&end_to_end, &sent, true, &device).unwrap();
        assert!(trainable.sentence_predictor.weight.val().is_require_grad());
    }

    #[test]
    fn test_branch_count_mismatch_is_rejected() {
        let device = Default::default();
        let sent: SentenceCnn<TestBackend> =
            SentenceCnnConfig::new(MAX_FEATURES, SENT_LEN, DIMS, FILTERS, vec![2], 0.0)
                .init(&device);
        assert!(build_rationale_model(&doc_config(), &sent, true, &device).is_err());
    }

    #[test]
    fn test_embedding_matrix_shape_is_checked() {
        let device = Default::default();
        let model: SentenceCnn<TestBackend> = sentence_config().init(&device);

        let bad = vec![vec![0.0f32; DIMS]; 3]; // wrong row count
        assert!(embedding_from_matrix(model.embedding.clone(), &bad, &device).is_err());

        let good = vec![vec![0.5f32; DIMS]; MAX_FEATURES + 1];
        let replaced = embedding_from_matrix(model.embedding, &good, &device).unwrap();
        let values: Vec<f32> = replaced.weight.val().into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }
}
