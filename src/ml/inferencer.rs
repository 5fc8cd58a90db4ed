// ============================================================
// Layer 5 — Rationale Extraction
// ============================================================
// Loads a trained document model from its checkpoint and, per
// document, produces the binary prediction plus the top-k
// supporting sentences.
//
// Rationale direction follows the prediction: a document predicted
// positive is explained by its pos-rationale column, a negative one
// by its neg-rationale column. Padding rows are excluded from
// ranking — only real sentences can be rationales.
//
// Inference runs on the plain backend; no gradients are needed.

use anyhow::{anyhow, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use std::cmp::Ordering;

use crate::application::train_use_case::{ModelVariant, TrainConfig};
use crate::data::{
    batcher::DocumentBatcher,
    dataset::DocumentExample,
    preprocessor::Preprocessor,
};
use crate::domain::document::Document;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::doc_model::{DocClassifier, RationaleCnn, SimpleDocCnn};

type MyInnerBackend = burn::backend::NdArray;

/// One ranked supporting sentence.
#[derive(Debug, Clone)]
pub struct Rationale {
    /// Position of the sentence within its document
    pub index: usize,
    pub sentence: String,
    /// Rationale probability in the predicted direction
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct DocPrediction {
    pub doc_id: String,
    /// P(document label = 1)
    pub probability: f32,
    pub label: u8,
    /// Top-k rationales, strongest first; empty for the simple model
    pub rationales: Vec<Rationale>,
}

enum TrainedModel {
    Rationale(RationaleCnn<MyInnerBackend>),
    Simple(SimpleDocCnn<MyInnerBackend>),
}

pub struct RationaleExtractor {
    model: TrainedModel,
    preprocessor: Preprocessor,
    top_k: usize,
    device: <MyInnerBackend as Backend>::Device,
}

impl RationaleExtractor {
    /// Rebuild the trained architecture from the persisted config,
    /// then load the best document checkpoint into it.
    pub fn from_checkpoint(checkpoint_dir: &str, top_k: usize) -> Result<Self> {
        let ckpt = CheckpointManager::new(checkpoint_dir);
        let config: TrainConfig = ckpt.load_config()?;
        let preprocessor = VocabStore::new(checkpoint_dir).load()?;
        let device = Default::default();

        let doc_config = config.doc_model_config();
        let model = match config.model {
            ModelVariant::Rationale => TrainedModel::Rationale(ckpt.load(
                doc_config.init(&device),
                &config.doc_checkpoint(),
                &device,
            )?),
            ModelVariant::Simple => TrainedModel::Simple(ckpt.load(
                doc_config.init_simple(&device),
                &config.doc_checkpoint(),
                &device,
            )?),
        };

        Ok(Self {
            model,
            preprocessor,
            top_k,
            device,
        })
    }

    pub fn predict(&self, doc: &mut Document) -> Result<DocPrediction> {
        doc.generate_sequences(&self.preprocessor);
        let rows = doc.padded_sequences(&self.preprocessor)?;

        let batcher = DocumentBatcher::<MyInnerBackend>::new(self.device.clone());
        // The label field is a placeholder; only the ids are read.
        let batch = batcher.batch(vec![DocumentExample { rows, label: 0 }]);

        match &self.model {
            TrainedModel::Simple(model) => {
                let probability = model.forward(batch.ids).into_scalar().elem::<f32>();
                Ok(DocPrediction {
                    doc_id: doc.doc_id.clone(),
                    probability,
                    label: (probability >= 0.5) as u8,
                    rationales: Vec::new(),
                })
            }
            TrainedModel::Rationale(model) => {
                let probability = model.forward(batch.ids.clone()).into_scalar().elem::<f32>();
                let label = (probability >= 0.5) as u8;

                let sentence_probs = model.sentence_probabilities(batch.ids);
                let doc_len = sentence_probs.dims()[1];
                let column = if label == 1 { 0 } else { 1 };
                let scores: Vec<f32> = sentence_probs
                    .slice([0..1, 0..doc_len, column..column + 1])
                    .reshape([doc_len])
                    .into_data()
                    .to_vec::<f32>()
                    .map_err(|e| anyhow!("cannot read sentence scores: {:?}", e))?;

                // Rank real sentences only; padding rows past
                // num_sentences never qualify.
                let real = doc.len().min(doc_len);
                let mut ranked: Vec<usize> = (0..real).collect();
                ranked.sort_by(|&a, &b| {
                    scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal)
                });

                let rationales = ranked
                    .into_iter()
                    .take(self.top_k)
                    .map(|index| Rationale {
                        index,
                        sentence: doc.sentences[index].clone(),
                        score: scores[index],
                    })
                    .collect();

                Ok(DocPrediction {
                    doc_id: doc.doc_id.clone(),
                    probability,
                    label,
                    rationales,
                })
            }
        }
    }
}
