// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `explain`, and all
// their configurable flags.
//
// clap's derive macros generate help text, missing-argument
// errors, and string → numeric conversions automatically.

use clap::{Args, Subcommand};

use crate::application::train_use_case::{ModelVariant, TrainConfig};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the two-stage rationale model on a labeled CSV corpus
    Train(TrainArgs),

    /// Predict documents and print their supporting rationales
    Explain(ExplainArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV corpus: doc_id, doc_lbl, sentence_number, sentence, sentence_lbl
    #[arg(long, default_value = "data/corpus.csv")]
    pub data_path: String,

    /// Pretrained word2vec binary; its width overrides --embedding-dims
    #[arg(long)]
    pub word_vectors: Option<String>,

    /// Directory for checkpoints, config, vocabulary, and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Tag distinguishing this run's checkpoint files
    #[arg(long, default_value = "default")]
    pub run_name: String,

    /// Which document model to train
    #[arg(long, default_value = "rationale", value_parser = ["rationale", "simple"])]
    pub model: String,

    /// Vocabulary size cap; the pad/OOV id is one past this
    #[arg(long, default_value_t = 20_000)]
    pub max_features: usize,

    /// Fixed token length every sentence is padded/truncated to
    #[arg(long, default_value_t = 25)]
    pub max_sent_len: usize,

    /// Fixed sentence count every document is padded/truncated to
    #[arg(long, default_value_t = 40)]
    pub max_doc_len: usize,

    /// Embedding width when no pretrained vectors are supplied
    #[arg(long, default_value_t = 200)]
    pub embedding_dims: usize,

    /// Feature maps per n-gram width
    #[arg(long, default_value_t = 32)]
    pub n_filters: usize,

    /// Comma-separated n-gram widths, one convolution branch each
    #[arg(long, value_delimiter = ',', default_values_t = [3, 4, 5])]
    pub filter_widths: Vec<usize>,

    /// Dropout over sentence vectors
    #[arg(long, default_value_t = 0.5)]
    pub sent_dropout: f64,

    /// Dropout over the document vector
    #[arg(long, default_value_t = 0.5)]
    pub doc_dropout: f64,

    /// Keep tuning the transplanted sentence predictor during
    /// document training instead of freezing it
    #[arg(long)]
    pub end_to_end_train: bool,

    /// Sentence-stage epochs; 0 skips sentence pre-training
    #[arg(long, default_value_t = 20)]
    pub sentence_epochs: usize,

    /// Document-stage epochs
    #[arg(long, default_value_t = 25)]
    pub doc_epochs: usize,

    #[arg(long, default_value_t = 50)]
    pub batch_size: usize,

    /// AdaGrad learning rate for the sentence stage
    #[arg(long, default_value_t = 0.01)]
    pub sentence_lr: f64,

    /// Adam learning rate for the document stage
    #[arg(long, default_value_t = 1e-3)]
    pub doc_lr: f64,

    /// Fraction of documents held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_split: f64,

    /// Fit the raw class distribution instead of drawing
    /// class-balanced samples each epoch
    #[arg(long)]
    pub unbalanced: bool,

    /// Loss weight on positive documents
    #[arg(long, default_value_t = 1.0)]
    pub pos_class_weight: f64,

    /// Beta for the validation F-score the document stage
    /// checkpoints on
    #[arg(long, default_value_t = 2.0)]
    pub f_beta: f64,

    /// Shuffle documents before the validation tail is split off
    #[arg(long)]
    pub shuffle: bool,

    /// Keep stopwords instead of removing them
    #[arg(long)]
    pub no_stopwords: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 — the
/// application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:         a.data_path,
            word_vectors_path: a.word_vectors,
            checkpoint_dir:    a.checkpoint_dir,
            run_name:          a.run_name,
            // clap's value_parser restricts the input to these two
            model:             match a.model.as_str() {
                "simple" => ModelVariant::Simple,
                _        => ModelVariant::Rationale,
            },
            max_features:      a.max_features,
            max_sent_len:      a.max_sent_len,
            max_doc_len:       a.max_doc_len,
            embedding_dims:    a.embedding_dims,
            n_filters:         a.n_filters,
            filter_widths:     a.filter_widths,
            sent_dropout:      a.sent_dropout,
            doc_dropout:       a.doc_dropout,
            end_to_end_train:  a.end_to_end_train,
            sentence_epochs:   a.sentence_epochs,
            doc_epochs:        a.doc_epochs,
            batch_size:        a.batch_size,
            sentence_lr:       a.sentence_lr,
            doc_lr:            a.doc_lr,
            val_split:         a.val_split,
            balanced:          !a.unbalanced,
            pos_class_weight:  a.pos_class_weight,
            f_beta:            a.f_beta,
            shuffle:           a.shuffle,
            stopwords:         !a.no_stopwords,
        }
    }
}

/// All arguments for the `explain` command
#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// CSV corpus of documents to predict and explain
    #[arg(long, default_value = "data/corpus.csv")]
    pub data_path: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of supporting sentences to print per document
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,
}
