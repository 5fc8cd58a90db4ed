// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Two models live in one training run (the sentence model and the
// document model), and each is checkpointed whenever its validation
// metric improves, so checkpoints are *named*:
//
//   checkpoints/
//     sentence_<run>.mpk    ← best sentence model so far
//     doc_<run>.mpk         ← best document model so far
//     train_config.json     ← run hyperparameters
//     vocab.json            ← fitted vocabulary (see vocab_store)
//     metrics.csv           ← per-epoch learning curves
//
// The config JSON must be written before training starts: inference
// needs the exact architecture hyperparameters to rebuild a model
// before the recorder will load weights into it.

use anyhow::{Context, Result};
use burn::{
    module::Module,
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::PathBuf};

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Save model weights under `name`. The recorder owns the file
    /// extension, so `name` is extensionless.
    pub fn save<B: Backend, M: Module<B>>(&self, model: &M, name: &str) -> Result<()> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("failed to save checkpoint '{}'", path.display()))?;
        tracing::debug!("saved checkpoint '{}'", name);
        Ok(())
    }

    /// Restore weights saved under `name` into `model`, which must
    /// have the matching architecture.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        model: M,
        name: &str,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.dir.join(name);
        let record: M::Record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "cannot load checkpoint '{}'; has the model been trained?",
                    path.display()
                )
            })?;
        Ok(model.load_record(record))
    }

    /// Persist the run configuration so inference can rebuild the
    /// trained architecture.
    pub fn save_config<T: Serialize>(&self, config: &T) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write config to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "cannot read config from '{}'; run 'train' before 'explain'",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::sentence_model::{SentenceCnn, SentenceCnnConfig};

    type TestBackend = burn::backend::NdArray;

    fn temp_manager(tag: &str) -> CheckpointManager {
        let dir = std::env::temp_dir().join(format!("rcnn_ckpt_{}_{}", tag, std::process::id()));
        CheckpointManager::new(dir)
    }

    /// CompactRecorder stores weights in half precision, so the
    /// restored values match to f16 resolution, not bit-exactly.
    #[test]
    fn test_save_then_load_round_trips_weights() {
        let device = Default::default();
        let config = SentenceCnnConfig::new(6, 4, 3, 2, vec![2], 0.0);
        let trained: SentenceCnn<TestBackend> = config.init(&device);

        let ckpt = temp_manager("roundtrip");
        ckpt.save(&trained, "sentence_test").unwrap();

        let fresh: SentenceCnn<TestBackend> = config.init(&device);
        let restored = ckpt.load(fresh, "sentence_test", &device).unwrap();

        let a: Vec<f32> = trained
            .embedding
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let b: Vec<f32> = restored
            .embedding
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2, "restored weight diverged: {} vs {}", x, y);
        }

        std::fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let device = Default::default();
        let config = SentenceCnnConfig::new(6, 4, 3, 2, vec![2], 0.0);
        let model: SentenceCnn<TestBackend> = config.init(&device);

        let ckpt = temp_manager("missing");
        assert!(ckpt.load(model, "never_saved", &device).is_err());
        std::fs::remove_dir_all(ckpt.dir()).ok();
    }

    #[test]
    fn test_config_round_trip() {
        let ckpt = temp_manager("config");

        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Cfg {
            max_doc_len: usize,
        }
        ckpt.save_config(&Cfg { max_doc_len: 40 }).unwrap();
        let loaded: Cfg = ckpt.load_config().unwrap();
        assert_eq!(loaded, Cfg { max_doc_len: 40 });

        std::fs::remove_dir_all(ckpt.dir()).ok();
    }
}
