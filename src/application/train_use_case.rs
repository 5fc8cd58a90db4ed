// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full two-stage training pipeline in order:
//
//   Step 1: Load the labeled CSV corpus     (Layer 4 - data)
//   Step 2: Shuffle documents (optional)    (Layer 4 - data)
//   Step 3: Load pretrained word vectors    (Layer 6 - infra)
//   Step 4: Fit the preprocessor            (Layer 4 - data)
//   Step 5: Persist config + vocabulary     (Layer 6 - infra)
//   Step 6: Train the sentence model        (Layer 5 - ml)
//   Step 7: Transplant into document model  (Layer 5 - ml)
//   Step 8: Train the document model        (Layer 5 - ml)
//
// The `simple` variant skips steps 6-7 and trains the unweighted
// baseline directly.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::{
    loader::CsvCorpusLoader,
    preprocessor::{default_stopwords, Preprocessor, PreprocessorConfig},
    splitter::shuffle,
};
use crate::domain::traits::CorpusSource;
use crate::infra::{
    checkpoint::CheckpointManager, vocab_store::VocabStore, word_vectors::WordVectors,
};
use crate::ml::{
    doc_model::DocModelConfig,
    sentence_model::{SentenceCnn, SentenceCnnConfig},
    transplant::{build_rationale_model, embedding_from_matrix},
    trainer::{train_document_model, train_sentence_model, DocTrainOptions, SentenceTrainOptions},
};

type MyBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Which document model to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Rationale-weighted document model seeded from a pre-trained
    /// sentence model
    Rationale,
    /// Unweighted sentence-sum baseline
    Simple,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Serialisable so it can be
// saved next to the checkpoints and reloaded for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:         String,
    pub word_vectors_path: Option<String>,
    pub checkpoint_dir:    String,
    /// Distinguishes checkpoint files across runs on different corpora
    pub run_name:          String,
    pub model:             ModelVariant,

    pub max_features:      usize,
    pub max_sent_len:      usize,
    pub max_doc_len:       usize,
    pub embedding_dims:    usize,
    pub n_filters:         usize,
    pub filter_widths:     Vec<usize>,
    pub sent_dropout:      f64,
    pub doc_dropout:       f64,
    pub end_to_end_train:  bool,

    pub sentence_epochs:   usize,
    pub doc_epochs:        usize,
    pub batch_size:        usize,
    pub sentence_lr:       f64,
    pub doc_lr:            f64,
    pub val_split:         f64,
    pub balanced:          bool,
    pub pos_class_weight:  f64,
    pub f_beta:            f64,
    pub shuffle:           bool,
    pub stopwords:         bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:         "data/corpus.csv".to_string(),
            word_vectors_path: None,
            checkpoint_dir:    "checkpoints".to_string(),
            run_name:          "default".to_string(),
            model:             ModelVariant::Rationale,
            max_features:      20_000,
            max_sent_len:      25,
            max_doc_len:       40,
            embedding_dims:    200,
            n_filters:         32,
            filter_widths:     vec![3, 4, 5],
            sent_dropout:      0.5,
            doc_dropout:       0.5,
            end_to_end_train:  false,
            sentence_epochs:   20,
            doc_epochs:        25,
            batch_size:        50,
            sentence_lr:       0.01,
            doc_lr:            1e-3,
            val_split:         0.1,
            balanced:          true,
            pos_class_weight:  1.0,
            f_beta:            2.0,
            shuffle:           false,
            stopwords:         true,
        }
    }
}

impl TrainConfig {
    pub fn sentence_checkpoint(&self) -> String {
        format!("sentence_{}", self.run_name)
    }

    pub fn doc_checkpoint(&self) -> String {
        format!("doc_{}", self.run_name)
    }

    pub fn sentence_model_config(&self) -> SentenceCnnConfig {
        SentenceCnnConfig::new(
            self.max_features,
            self.max_sent_len,
            self.embedding_dims,
            self.n_filters,
            self.filter_widths.clone(),
            self.sent_dropout,
        )
    }

    pub fn doc_model_config(&self) -> DocModelConfig {
        DocModelConfig::new(
            self.max_features,
            self.max_sent_len,
            self.max_doc_len,
            self.embedding_dims,
            self.n_filters,
            self.filter_widths.clone(),
            self.sent_dropout,
            self.doc_dropout,
            self.end_to_end_train,
        )
    }

    fn preprocessor_config(&self) -> PreprocessorConfig {
        PreprocessorConfig {
            max_features: self.max_features,
            max_sent_len: self.max_sent_len,
            max_doc_len: self.max_doc_len,
            embedding_dims: self.embedding_dims,
            stopwords: self.stopwords.then(default_stopwords),
        }
    }

    fn sentence_train_options(&self) -> SentenceTrainOptions {
        SentenceTrainOptions {
            epochs: self.sentence_epochs,
            batch_size: self.batch_size,
            lr: self.sentence_lr,
            balanced: self.balanced,
            val_split: self.val_split,
        }
    }

    fn doc_train_options(&self) -> DocTrainOptions {
        DocTrainOptions {
            epochs: self.doc_epochs,
            batch_size: self.batch_size,
            lr: self.doc_lr,
            balanced: self.balanced,
            val_split: self.val_split,
            pos_class_weight: self.pos_class_weight,
            f_beta: self.f_beta,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let mut cfg = self.config.clone();
        let device = Default::default();

        // ── Step 1: Load the labeled corpus ───────────────────────────────────
        tracing::info!("loading corpus from '{}'", cfg.data_path);
        let loader = CsvCorpusLoader::new(&cfg.data_path);
        let mut docs = loader.load_all()?;
        tracing::info!("loaded {} labeled documents", docs.len());

        // ── Step 2: Optional document shuffle ─────────────────────────────────
        // The validation split is the document-list tail, so shuffling
        // here decides *which* documents end up in validation.
        if cfg.shuffle {
            shuffle(&mut docs);
        }

        // ── Step 3: Pretrained word vectors ───────────────────────────────────
        let word_vectors = match &cfg.word_vectors_path {
            Some(path) => {
                let wvs = WordVectors::load(path)?;
                // Pretrained vectors dictate the embedding width.
                cfg.embedding_dims = wvs.vector_size();
                tracing::info!(
                    "loaded {} pretrained vectors ({} dims)",
                    wvs.len(),
                    wvs.vector_size()
                );
                Some(wvs)
            }
            None => None,
        };

        // ── Step 4: Fit the preprocessor ──────────────────────────────────────
        let texts: Vec<String> = docs
            .iter()
            .flat_map(|d| d.sentences.iter().cloned())
            .collect();
        let mut preprocessor = Preprocessor::new(cfg.preprocessor_config());
        preprocessor.preprocess(&texts, word_vectors.as_ref())?;
        tracing::info!("vocabulary fitted: {} tokens", preprocessor.vocab_len());

        for doc in &mut docs {
            doc.generate_sequences(&preprocessor);
        }

        // ── Step 5: Persist config and vocabulary ─────────────────────────────
        // Written before training starts so a crashed run is still
        // inspectable, and so inference can rebuild the architecture.
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_config(&cfg)?;
        VocabStore::new(&cfg.checkpoint_dir).save(&preprocessor)?;

        match cfg.model {
            ModelVariant::Rationale => {
                // ── Step 6: Sentence model ────────────────────────────────────
                let mut sentence_model: SentenceCnn<MyBackend> =
                    cfg.sentence_model_config().init(&device);
                if let Some(matrix) = preprocessor.init_vectors() {
                    sentence_model.embedding =
                        embedding_from_matrix(sentence_model.embedding, matrix, &device)?;
                }

                let sentence_trained = cfg.sentence_epochs > 0;
                if sentence_trained {
                    sentence_model = train_sentence_model(
                        sentence_model,
                        &docs,
                        &preprocessor,
                        &cfg.sentence_train_options(),
                        &ckpt,
                        &cfg.sentence_checkpoint(),
                    )?;
                }

                // ── Step 7: Transplant ────────────────────────────────────────
                let doc_model = build_rationale_model(
                    &cfg.doc_model_config(),
                    &sentence_model,
                    sentence_trained,
                    &device,
                )?;

                // ── Step 8: Document model ────────────────────────────────────
                train_document_model(
                    doc_model,
                    &docs,
                    &preprocessor,
                    &cfg.doc_train_options(),
                    &ckpt,
                    &cfg.doc_checkpoint(),
                )?;
            }
            ModelVariant::Simple => {
                let mut doc_model = cfg.doc_model_config().init_simple::<MyBackend>(&device);
                if let Some(matrix) = preprocessor.init_vectors() {
                    doc_model.embedding =
                        embedding_from_matrix(doc_model.embedding, matrix, &device)?;
                }

                train_document_model(
                    doc_model,
                    &docs,
                    &preprocessor,
                    &cfg.doc_train_options(),
                    &ckpt,
                    &cfg.doc_checkpoint(),
                )?;
            }
        }

        tracing::info!("training complete; checkpoints in '{}'", cfg.checkpoint_dir);
        Ok(())
    }
}
