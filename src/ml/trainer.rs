// ============================================================
// Layer 5 — Training Loops
// ============================================================
// Two training stages, each in two flavours:
//
//   Sentence stage — fits the 3-way sentence model.
//     balanced:   each epoch draws a fresh class-balanced sample
//                 (every rationale + an equal number of
//                 non-rationales) and makes one pass over it;
//                 checkpoints on strictly improved validation loss
//                 over a once-drawn balanced validation sample.
//     unbalanced: stock DataLoader over the full flattened corpus;
//                 checkpoints on best validation accuracy.
//
//   Document stage — fits either document model variant.
//     balanced:   equal-count label sample per epoch; checkpoints
//                 on best validation F-beta over the *full*
//                 validation set.
//     unbalanced: full corpus per epoch; checkpoints on best
//                 validation accuracy.
//
// Both stages end by reloading the best checkpoint, so the returned
// model is never the last epoch's — it is the best validation
// epoch's. The validation split is taken from the document-list
// tail *before* sentences are flattened, so no validation document
// leaks sentences into training.
//
// Backend note: training runs on Autodiff<NdArray>; model.valid()
// strips autodiff (and disables dropout) for evaluation.

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::{batcher::Batcher, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdaGradConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::Rng;

use crate::data::{
    batcher::{DocumentBatcher, SentenceBatcher},
    dataset::{
        document_examples, flatten_sentence_examples, DocumentDataset, DocumentExample,
        SentenceDataset, SentenceExample,
    },
    preprocessor::Preprocessor,
    sampler::{balanced_sample_binary, balanced_sample_three_way},
    splitter::validation_tail_index,
};
use crate::domain::{document::Document, label::SentenceLabel};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{accuracy, EpochMetrics, MetricsLogger, ScoringPolicy},
};
use crate::ml::{doc_model::DocClassifier, sentence_model::SentenceCnn};

type MyBackend = burn::backend::Autodiff<burn::backend::NdArray>;
type MyInnerBackend = burn::backend::NdArray;

#[derive(Debug, Clone)]
pub struct SentenceTrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub balanced: bool,
    pub val_split: f64,
}

#[derive(Debug, Clone)]
pub struct DocTrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub balanced: bool,
    pub val_split: f64,
    pub pos_class_weight: f64,
    pub f_beta: f64,
}

// ─── Sentence stage ───────────────────────────────────────────────────────────

pub fn train_sentence_model(
    mut model: SentenceCnn<MyBackend>,
    docs: &[Document],
    preprocessor: &Preprocessor,
    opts: &SentenceTrainOptions,
    ckpt: &CheckpointManager,
    checkpoint_name: &str,
) -> Result<SentenceCnn<MyBackend>> {
    let device = <MyBackend as Backend>::Device::default();

    let split_at = validation_tail_index(docs.len(), opts.val_split)?;
    let (train_docs, val_docs) = docs.split_at(split_at);

    let train_examples = flatten_sentence_examples(train_docs, preprocessor)?;
    let val_examples = flatten_sentence_examples(val_docs, preprocessor)?;
    tracing::info!(
        "sentence stage: {} train / {} validation sentences ({} / {} documents)",
        train_examples.len(),
        val_examples.len(),
        train_docs.len(),
        val_docs.len()
    );

    let train_batcher = SentenceBatcher::<MyBackend>::new(device.clone());
    let val_batcher = SentenceBatcher::<MyInnerBackend>::new(device.clone());
    let mut optim = AdaGradConfig::new().init();
    let mut rng = rand::thread_rng();
    let logger = MetricsLogger::new(ckpt.dir())?;

    if opts.balanced {
        let train_labels: Vec<SentenceLabel> = train_examples
            .iter()
            .map(|ex| SentenceLabel::from_class_index(ex.label))
            .collect();
        let val_labels: Vec<SentenceLabel> = val_examples
            .iter()
            .map(|ex| SentenceLabel::from_class_index(ex.label))
            .collect();

        // The balanced validation sample is drawn once so the
        // checkpoint metric is comparable across epochs.
        let val_sample: Vec<SentenceExample> = balanced_sample_three_way(&val_labels, &mut rng)?
            .into_iter()
            .map(|i| val_examples[i].clone())
            .collect();

        let mut best_loss = f64::INFINITY;
        for epoch in 1..=opts.epochs {
            let sample = balanced_sample_three_way(&train_labels, &mut rng)?;

            let mut loss_sum = 0.0f64;
            let mut batches = 0usize;
            for chunk in sample.chunks(opts.batch_size) {
                let items: Vec<SentenceExample> =
                    chunk.iter().map(|&i| train_examples[i].clone()).collect();
                let batch = train_batcher.batch(items);

                let (loss, _) = model.forward_loss(batch.ids, batch.targets);
                loss_sum += loss.clone().into_scalar().elem::<f64>();
                batches += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(opts.lr, model, grads);
            }
            let train_loss = loss_sum / batches.max(1) as f64;

            let (val_loss, val_acc) =
                eval_sentence(&model.valid(), &val_sample, &val_batcher, opts.batch_size);

            println!(
                "sentence epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
                epoch,
                opts.epochs,
                train_loss,
                val_loss,
                val_acc * 100.0,
            );
            logger.log(&EpochMetrics {
                stage: "sentence".into(),
                epoch,
                train_loss,
                val_loss,
                val_acc,
                val_f: 0.0,
            })?;

            if val_loss < best_loss {
                best_loss = val_loss;
                ckpt.save(&model, checkpoint_name)?;
                tracing::info!("sentence checkpoint improved: val_loss={:.4}", val_loss);
            }
        }
    } else {
        let loader = DataLoaderBuilder::new(train_batcher)
            .batch_size(opts.batch_size)
            .shuffle(42)
            .num_workers(1)
            .build(SentenceDataset::new(train_examples));

        let mut best_acc = -1.0f64;
        for epoch in 1..=opts.epochs {
            let mut loss_sum = 0.0f64;
            let mut batches = 0usize;
            for batch in loader.iter() {
                let (loss, _) = model.forward_loss(batch.ids, batch.targets);
                loss_sum += loss.clone().into_scalar().elem::<f64>();
                batches += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(opts.lr, model, grads);
            }
            let train_loss = loss_sum / batches.max(1) as f64;

            let (val_loss, val_acc) =
                eval_sentence(&model.valid(), &val_examples, &val_batcher, opts.batch_size);

            println!(
                "sentence epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
                epoch,
                opts.epochs,
                train_loss,
                val_loss,
                val_acc * 100.0,
            );
            logger.log(&EpochMetrics {
                stage: "sentence".into(),
                epoch,
                train_loss,
                val_loss,
                val_acc,
                val_f: 0.0,
            })?;

            if val_acc > best_acc {
                best_acc = val_acc;
                ckpt.save(&model, checkpoint_name)?;
                tracing::info!("sentence checkpoint improved: val_acc={:.4}", val_acc);
            }
        }
    }

    // The best validation epoch's weights, not the last epoch's.
    ckpt.load(model, checkpoint_name, &device)
}

fn eval_sentence(
    model: &SentenceCnn<MyInnerBackend>,
    examples: &[SentenceExample],
    batcher: &SentenceBatcher<MyInnerBackend>,
    batch_size: usize,
) -> (f64, f64) {
    let mut loss_sum = 0.0f64;
    let mut batches = 0usize;
    let mut correct = 0usize;
    let mut total = 0usize;

    for chunk in examples.chunks(batch_size) {
        let batch = batcher.batch(chunk.to_vec());
        let logits = model.forward(batch.ids);

        let ce = burn::nn::loss::CrossEntropyLossConfig::new().init(&logits.device());
        loss_sum += ce
            .forward(logits.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();
        batches += 1;

        // argmax(1) returns [batch, 1]; flatten before comparing.
        let preds = logits.argmax(1).flatten::<1>(0, 1);
        let hits: i64 = preds
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        correct += hits as usize;
        total += chunk.len();
    }

    (
        loss_sum / batches.max(1) as f64,
        correct as f64 / total.max(1) as f64,
    )
}

// ─── Document stage ───────────────────────────────────────────────────────────

pub fn train_document_model<M>(
    mut model: M,
    docs: &[Document],
    preprocessor: &Preprocessor,
    opts: &DocTrainOptions,
    ckpt: &CheckpointManager,
    checkpoint_name: &str,
) -> Result<M>
where
    M: DocClassifier<MyBackend> + AutodiffModule<MyBackend>,
    M::InnerModule: DocClassifier<MyInnerBackend>,
{
    let device = <MyBackend as Backend>::Device::default();

    let split_at = validation_tail_index(docs.len(), opts.val_split)?;
    let (train_docs, val_docs) = docs.split_at(split_at);

    let train_examples = document_examples(train_docs, preprocessor)?;
    let val_examples = document_examples(val_docs, preprocessor)?;
    tracing::info!(
        "document stage: {} train / {} validation documents",
        train_examples.len(),
        val_examples.len()
    );

    let train_batcher = DocumentBatcher::<MyBackend>::new(device.clone());
    let val_batcher = DocumentBatcher::<MyInnerBackend>::new(device.clone());
    let mut optim = AdamConfig::new().init();
    let mut rng = rand::thread_rng();

    let scorer = ScoringPolicy::FBeta(opts.f_beta);
    let logger = MetricsLogger::new(ckpt.dir())?;

    if opts.balanced {
        let train_labels: Vec<u8> = train_examples.iter().map(|ex| ex.label).collect();

        let mut best_f = f64::NEG_INFINITY;
        for epoch in 1..=opts.epochs {
            let sample = balanced_sample_binary(&train_labels, &mut rng)?;

            let mut loss_sum = 0.0f64;
            let mut batches = 0usize;
            for chunk in sample.chunks(opts.batch_size) {
                let items: Vec<DocumentExample> =
                    chunk.iter().map(|&i| train_examples[i].clone()).collect();
                let batch = train_batcher.batch(items);

                let (loss, _) =
                    model.forward_loss(batch.ids, batch.targets, opts.pos_class_weight);
                loss_sum += loss.clone().into_scalar().elem::<f64>();
                batches += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(opts.lr, model, grads);
            }
            let train_loss = loss_sum / batches.max(1) as f64;

            // Balanced sampling applies to *training* only; the
            // checkpoint metric is scored on the full validation set.
            let (val_loss, y_true, y_pred) = eval_document(
                &model.valid(),
                &val_examples,
                &val_batcher,
                opts.batch_size,
                opts.pos_class_weight,
            )?;
            let val_acc = accuracy(&y_true, &y_pred);
            let val_f = scorer.score(&y_true, &y_pred);

            println!(
                "doc epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}% | val_f={:.4}",
                epoch,
                opts.epochs,
                train_loss,
                val_loss,
                val_acc * 100.0,
                val_f,
            );
            logger.log(&EpochMetrics {
                stage: "doc".into(),
                epoch,
                train_loss,
                val_loss,
                val_acc,
                val_f,
            })?;

            if val_f > best_f {
                best_f = val_f;
                ckpt.save(&model, checkpoint_name)?;
                tracing::info!("document checkpoint improved: val_f={:.4}", val_f);
            }
        }
    } else {
        let loader = DataLoaderBuilder::new(train_batcher)
            .batch_size(opts.batch_size)
            .shuffle(42)
            .num_workers(1)
            .build(DocumentDataset::new(train_examples));

        let mut best_acc = -1.0f64;
        for epoch in 1..=opts.epochs {
            let mut loss_sum = 0.0f64;
            let mut batches = 0usize;
            for batch in loader.iter() {
                let (loss, _) =
                    model.forward_loss(batch.ids, batch.targets, opts.pos_class_weight);
                loss_sum += loss.clone().into_scalar().elem::<f64>();
                batches += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(opts.lr, model, grads);
            }
            let train_loss = loss_sum / batches.max(1) as f64;

            let (val_loss, y_true, y_pred) = eval_document(
                &model.valid(),
                &val_examples,
                &val_batcher,
                opts.batch_size,
                opts.pos_class_weight,
            )?;
            let val_acc = accuracy(&y_true, &y_pred);
            let val_f = scorer.score(&y_true, &y_pred);

            println!(
                "doc epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}% | val_f={:.4}",
                epoch,
                opts.epochs,
                train_loss,
                val_loss,
                val_acc * 100.0,
                val_f,
            );
            logger.log(&EpochMetrics {
                stage: "doc".into(),
                epoch,
                train_loss,
                val_loss,
                val_acc,
                val_f,
            })?;

            if val_acc > best_acc {
                best_acc = val_acc;
                ckpt.save(&model, checkpoint_name)?;
                tracing::info!("document checkpoint improved: val_acc={:.4}", val_acc);
            }
        }
    }

    ckpt.load(model, checkpoint_name, &device)
}

/// Returns (avg loss, ground truth, predicted probabilities).
fn eval_document<M: DocClassifier<MyInnerBackend>>(
    model: &M,
    examples: &[DocumentExample],
    batcher: &DocumentBatcher<MyInnerBackend>,
    batch_size: usize,
    pos_class_weight: f64,
) -> Result<(f64, Vec<f32>, Vec<f32>)> {
    let mut loss_sum = 0.0f64;
    let mut batches = 0usize;
    let mut y_true = Vec::with_capacity(examples.len());
    let mut y_pred = Vec::with_capacity(examples.len());

    for chunk in examples.chunks(batch_size) {
        let batch = batcher.batch(chunk.to_vec());
        let (loss, probs) = model.forward_loss(batch.ids, batch.targets, pos_class_weight);
        loss_sum += loss.into_scalar().elem::<f64>();
        batches += 1;

        // A failed read would desynchronize y_true/y_pred and poison
        // the checkpoint metric, so it is fatal.
        let probs = probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read validation predictions: {:?}", e))?;
        y_pred.extend(probs);
        y_true.extend(chunk.iter().map(|ex| ex.label as f32));
    }

    Ok((loss_sum / batches.max(1) as f64, y_true, y_pred))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessor::PreprocessorConfig;
    use crate::ml::doc_model::{DocModelConfig, SimpleDocCnn};
    use crate::ml::sentence_model::SentenceCnnConfig;
    use crate::ml::transplant::build_rationale_model;

    const MAX_SENT_LEN: usize = 4;
    const MAX_DOC_LEN: usize = 3;
    const DIMS: usize = 5;

    /// Four tiny labeled documents: one rationale and two filler
    /// sentences each, alternating document labels so both the
    /// three-way and binary balanced samplers have work to do.
    fn toy_corpus() -> (Vec<Document>, Preprocessor) {
        let raw: Vec<(u8, [&str; 3])> = vec![
            (1, ["drug clearly reduced mortality", "patients enrolled at sites", "weather was mild"]),
            (0, ["trial failed its endpoint", "sites reported schedules", "coffee was served"]),
            (1, ["treatment improved survival rates", "consent forms were signed", "rooms were quiet"]),
            (0, ["drug showed no benefit", "records were archived", "lunch arrived late"]),
        ];

        let mut texts = Vec::new();
        for (_, sentences) in &raw {
            texts.extend(sentences.iter().map(|s| s.to_string()));
        }

        let mut preprocessor = Preprocessor::new(PreprocessorConfig {
            max_features: 60,
            max_sent_len: MAX_SENT_LEN,
            max_doc_len: MAX_DOC_LEN,
            embedding_dims: DIMS,
            stopwords: None,
        });
        preprocessor.preprocess(&texts, None).unwrap();

        let docs: Vec<Document> = raw
            .into_iter()
            .enumerate()
            .map(|(i, (label, sentences))| {
                let sentence_labels = vec![
                    SentenceLabel::from_binary(1, label),
                    SentenceLabel::NonRationale,
                    SentenceLabel::NonRationale,
                ];
                let mut doc = Document::new(
                    format!("doc{}", i),
                    sentences.iter().map(|s| s.to_string()).collect(),
                    Some(label),
                    Some(sentence_labels),
                    1,
                )
                .unwrap();
                doc.generate_sequences(&preprocessor);
                doc
            })
            .collect();

        (docs, preprocessor)
    }

    fn temp_checkpoints(tag: &str) -> CheckpointManager {
        let dir = std::env::temp_dir().join(format!("rcnn_train_{}_{}", tag, std::process::id()));
        CheckpointManager::new(dir)
    }

    #[test]
    fn test_balanced_pipeline_end_to_end() {
        let (docs, preprocessor) = toy_corpus();
        let ckpt = temp_checkpoints("balanced");
        let device = Default::default();

        let sentence_config =
            SentenceCnnConfig::new(60, MAX_SENT_LEN, DIMS, 2, vec![2, 3], 0.0);
        let sentence_model: SentenceCnn<MyBackend> = sentence_config.init(&device);

        let sentence_model = train_sentence_model(
            sentence_model,
            &docs,
            &preprocessor,
            &SentenceTrainOptions {
                epochs: 2,
                batch_size: 4,
                lr: 0.05,
                balanced: true,
                val_split: 0.5,
            },
            &ckpt,
            "sentence_toy",
        )
        .unwrap();

        let doc_config = DocModelConfig::new(
            60, MAX_SENT_LEN, MAX_DOC_LEN, DIMS, 2, vec![2, 3], 0.0, 0.0, false,
        );
        let doc_model = build_rationale_model(&doc_config, &sentence_model, true, &device).unwrap();

        let doc_model = train_document_model(
            doc_model,
            &docs,
            &preprocessor,
            &DocTrainOptions {
                epochs: 2,
                batch_size: 2,
                lr: 1e-3,
                balanced: true,
                val_split: 0.5,
                pos_class_weight: 1.0,
                f_beta: 2.0,
            },
            &ckpt,
            "doc_toy",
        )
        .unwrap();

        // The trained model still produces valid probabilities.
        let examples = document_examples(&docs, &preprocessor).unwrap();
        let batcher = DocumentBatcher::<MyInnerBackend>::new(Default::default());
        let batch = batcher.batch(examples);
        let probs: Vec<f32> = doc_model
            .valid()
            .forward(batch.ids)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(probs.len(), 4);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));

        // Both stages wrote epoch metrics and checkpoints.
        let metrics = std::fs::read_to_string(ckpt.dir().join("metrics.csv")).unwrap();
        assert!(metrics.lines().any(|l| l.starts_with("sentence,")));
        assert!(metrics.lines().any(|l| l.starts_with("doc,")));
        std::fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_unbalanced_pipeline_with_simple_model() {
        let (docs, preprocessor) = toy_corpus();
        let ckpt = temp_checkpoints("unbalanced");
        let device = Default::default();

        let doc_config = DocModelConfig::new(
            60, MAX_SENT_LEN, MAX_DOC_LEN, DIMS, 2, vec![2], 0.0, 0.0, false,
        );
        let model: SimpleDocCnn<MyBackend> = doc_config.init_simple(&device);

        let model = train_document_model(
            model,
            &docs,
            &preprocessor,
            &DocTrainOptions {
                epochs: 2,
                batch_size: 2,
                lr: 1e-3,
                balanced: false,
                val_split: 0.5,
                pos_class_weight: 2.0,
                f_beta: 2.0,
            },
            &ckpt,
            "doc_simple_toy",
        )
        .unwrap();

        let examples = document_examples(&docs[..1], &preprocessor).unwrap();
        let batcher = DocumentBatcher::<MyInnerBackend>::new(Default::default());
        let probs: Vec<f32> = model
            .valid()
            .forward(batcher.batch(examples).ids)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert!((0.0..=1.0).contains(&probs[0]));

        std::fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_validation_split_too_small_is_rejected() {
        let (docs, preprocessor) = toy_corpus();
        let ckpt = temp_checkpoints("reject");
        let device = Default::default();

        let model: SentenceCnn<MyBackend> =
            SentenceCnnConfig::new(60, MAX_SENT_LEN, DIMS, 2, vec![2], 0.0).init(&device);

        let result = train_sentence_model(
            model,
            &docs,
            &preprocessor,
            &SentenceTrainOptions {
                epochs: 1,
                batch_size: 4,
                lr: 0.05,
                balanced: true,
                val_split: 0.1, // 0.1 × 4 documents → empty validation set
            },
            &ckpt,
            "sentence_reject",
        );
        assert!(result.is_err());
        std::fs::remove_dir_all(ckpt.dir()).ok();
    }
}
