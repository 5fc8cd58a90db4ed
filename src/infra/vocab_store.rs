// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the fitted vocabulary (tokens in id order, plus the
// preprocessor configuration) as JSON, and rebuilds a fitted
// Preprocessor from it. Ensures inference tokenizes new text with
// exactly the ids training used — a drifted vocabulary would feed
// the embedding table garbage rows.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::{Preprocessor, PreprocessorConfig};

#[derive(Serialize, Deserialize)]
struct VocabFile {
    config: PreprocessorConfig,
    /// Index position is the token id.
    tokens: Vec<String>,
}

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("vocab.json")
    }

    pub fn save(&self, preprocessor: &Preprocessor) -> Result<()> {
        fs::create_dir_all(&self.dir).ok();
        let file = VocabFile {
            config: preprocessor.config(),
            tokens: preprocessor.tokens_in_id_order().to_vec(),
        };
        let json = serde_json::to_string(&file)?;
        fs::write(self.path(), json)
            .with_context(|| format!("cannot write vocabulary to '{}'", self.path().display()))?;
        tracing::debug!("saved vocabulary ({} tokens)", file.tokens.len());
        Ok(())
    }

    pub fn load(&self) -> Result<Preprocessor> {
        let json = fs::read_to_string(self.path()).with_context(|| {
            format!(
                "cannot read vocabulary from '{}'; run 'train' before 'explain'",
                self.path().display()
            )
        })?;
        let file: VocabFile = serde_json::from_str(&json)?;
        Preprocessor::from_parts(file.config, file.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted_preprocessor() -> Preprocessor {
        let config = PreprocessorConfig {
            max_features: 10,
            max_sent_len: 4,
            max_doc_len: 3,
            embedding_dims: 8,
            stopwords: None,
        };
        Preprocessor::from_parts(
            config,
            vec!["drug".into(), "trial".into(), "placebo".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip_preserves_ids() {
        let dir = std::env::temp_dir().join(format!("rcnn_vocab_{}", std::process::id()));
        let store = VocabStore::new(&dir);

        let original = fitted_preprocessor();
        store.save(&original).unwrap();
        let restored = store.load().unwrap();

        assert_eq!(restored.vocab_len(), original.vocab_len());
        for token in ["drug", "trial", "placebo"] {
            assert_eq!(restored.token_to_id(token), original.token_to_id(token));
        }
        assert_eq!(restored.max_sent_len(), original.max_sent_len());
        assert_eq!(restored.pad_id(), original.pad_id());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_vocabulary_is_an_error() {
        let store = VocabStore::new("/nonexistent/rcnn_vocab");
        assert!(store.load().is_err());
    }
}
