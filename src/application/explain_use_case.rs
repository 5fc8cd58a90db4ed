// ============================================================
// Layer 2 — Explain Use Case
// ============================================================
// Loads the best document checkpoint and runs it over a corpus:
// per document, the binary prediction plus the top-k sentences
// supporting it. Returns structured predictions; printing belongs
// to the CLI layer.

use anyhow::Result;

use crate::data::loader::CsvCorpusLoader;
use crate::domain::traits::CorpusSource;
use crate::ml::inferencer::{DocPrediction, RationaleExtractor};

pub struct ExplainUseCase {
    extractor: RationaleExtractor,
}

impl ExplainUseCase {
    pub fn new(checkpoint_dir: &str, top_k: usize) -> Result<Self> {
        let extractor = RationaleExtractor::from_checkpoint(checkpoint_dir, top_k)?;
        Ok(Self { extractor })
    }

    /// Predict every document in the CSV corpus at `data_path`.
    pub fn explain(&self, data_path: &str) -> Result<Vec<DocPrediction>> {
        let mut docs = CsvCorpusLoader::new(data_path).load_all()?;
        tracing::info!("explaining {} documents", docs.len());

        docs.iter_mut().map(|doc| self.extractor.predict(doc)).collect()
    }
}
