// ============================================================
// Layer 4 — Preprocessor
// ============================================================
// Owns the vocabulary and everything derived from it:
//
//   - fits a frequency-capped word-level vocabulary over the
//     (optionally stopword-filtered) corpus
//   - maps sentences to fixed-length token-id sequences
//   - builds the initial embedding matrix from pretrained word
//     vectors, when supplied
//
// Id scheme: real tokens get ids 0..vocab_len-1 in descending
// frequency order; the id `max_features` is the pad/OOV sentinel
// and owns the all-zero row of the embedding matrix. The embedding
// table therefore always has exactly `max_features + 1` rows.
//
// Tokens unseen at fit time are *dropped* from id sequences rather
// than mapped to the sentinel (see DESIGN.md).
//
// Lifecycle: `preprocess()` is called exactly once to fit;
// `build_sequences()` may be called repeatedly afterwards and is
// read-only.

use anyhow::{ensure, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::infra::word_vectors::WordVectors;

/// Everything the Preprocessor needs up front. The stopword list is
/// an explicit configuration value — pass `default_stopwords()` for
/// the standard English list, or `None` to disable removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Upper bound on the vocabulary size; also the pad/OOV id
    pub max_features: usize,
    /// Fixed per-sentence token length
    pub max_sent_len: usize,
    /// Fixed per-document sentence-count cap
    pub max_doc_len: usize,
    /// Embedding dimensionality; overridden by the caller when
    /// pretrained vectors are supplied
    pub embedding_dims: usize,
    /// Stopwords removed before fitting and sequence-building
    pub stopwords: Option<Vec<String>>,
}

pub struct Preprocessor {
    max_features: usize,
    max_sent_len: usize,
    max_doc_len: usize,
    embedding_dims: usize,
    stopwords: Option<HashSet<String>>,
    /// token → id, ids dense in 0..vocab_len
    vocab: HashMap<String, u32>,
    /// id → token, index position is the id
    reverse_vocab: Vec<String>,
    /// (max_features + 1) × embedding_dims, built only when
    /// pretrained vectors were supplied at fit time
    init_vectors: Option<Vec<Vec<f32>>>,
    fitted: bool,
}

impl Preprocessor {
    pub fn new(config: PreprocessorConfig) -> Self {
        let stopwords = config
            .stopwords
            .map(|words| words.into_iter().collect::<HashSet<_>>());
        Self {
            max_features: config.max_features,
            max_sent_len: config.max_sent_len,
            max_doc_len: config.max_doc_len,
            embedding_dims: config.embedding_dims,
            stopwords,
            vocab: HashMap::new(),
            reverse_vocab: Vec::new(),
            init_vectors: None,
            fitted: false,
        }
    }

    /// Rebuild a fitted preprocessor from a persisted vocabulary
    /// (tokens in id order). Used by the inference path; no
    /// embedding matrix is reconstructed — trained weights come
    /// from the checkpoint.
    pub fn from_parts(config: PreprocessorConfig, tokens_in_id_order: Vec<String>) -> Result<Self> {
        let mut p = Self::new(config);
        ensure!(
            tokens_in_id_order.len() <= p.max_features,
            "persisted vocabulary ({} tokens) exceeds max_features ({})",
            tokens_in_id_order.len(),
            p.max_features
        );
        for (id, token) in tokens_in_id_order.iter().enumerate() {
            p.vocab.insert(token.clone(), id as u32);
        }
        p.reverse_vocab = tokens_in_id_order;
        p.fitted = true;
        Ok(p)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn max_features(&self) -> usize {
        self.max_features
    }

    pub fn max_sent_len(&self) -> usize {
        self.max_sent_len
    }

    pub fn max_doc_len(&self) -> usize {
        self.max_doc_len
    }

    pub fn embedding_dims(&self) -> usize {
        self.embedding_dims
    }

    pub fn vocab_len(&self) -> usize {
        self.vocab.len()
    }

    /// The pad/OOV sentinel: one past the largest real vocabulary id.
    pub fn pad_id(&self) -> u32 {
        self.max_features as u32
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.vocab.get(token).copied()
    }

    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.reverse_vocab.get(id as usize).map(|s| s.as_str())
    }

    /// Tokens in id order, for persistence.
    pub fn tokens_in_id_order(&self) -> &[String] {
        &self.reverse_vocab
    }

    /// The initial embedding matrix, `(max_features + 1) × dims`,
    /// present only when pretrained vectors were supplied.
    pub fn init_vectors(&self) -> Option<&Vec<Vec<f32>>> {
        self.init_vectors.as_ref()
    }

    /// Reconstruct the configuration this preprocessor was built
    /// with, for persistence alongside the vocabulary. Stopwords are
    /// sorted so the output is deterministic.
    pub fn config(&self) -> PreprocessorConfig {
        PreprocessorConfig {
            max_features: self.max_features,
            max_sent_len: self.max_sent_len,
            max_doc_len: self.max_doc_len,
            embedding_dims: self.embedding_dims,
            stopwords: self.stopwords.as_ref().map(|set| {
                let mut words: Vec<String> = set.iter().cloned().collect();
                words.sort();
                words
            }),
        }
    }

    // ── Fitting ───────────────────────────────────────────────────────────────

    /// Fit the vocabulary over the corpus, then (if `wvs` is given)
    /// build the initial embedding matrix. Must be called before any
    /// sequence-building, and only once.
    pub fn preprocess(&mut self, texts: &[String], wvs: Option<&WordVectors>) -> Result<()> {
        ensure!(!self.fitted, "preprocess() may only be called once");
        if let Some(wvs) = wvs {
            ensure!(
                wvs.vector_size() == self.embedding_dims,
                "embedding_dims ({}) does not match pretrained vector size ({})",
                self.embedding_dims,
                wvs.vector_size()
            );
        }

        // Count token frequencies over the stopword-filtered corpus.
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for token in self.tokenize(text) {
                *freq.entry(token).or_insert(0) += 1;
            }
        }

        // Most frequent first; ties broken lexically so ids are
        // stable across runs on the same corpus.
        let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        for (id, (token, _)) in ranked.iter().enumerate() {
            self.vocab.insert(token.clone(), id as u32);
        }
        self.reverse_vocab = ranked.into_iter().map(|(token, _)| token).collect();
        self.fitted = true;

        tracing::info!(
            "vocabulary fitted: {} tokens (cap {})",
            self.vocab.len(),
            self.max_features
        );

        if let Some(wvs) = wvs {
            self.init_word_vectors(wvs);
        }
        Ok(())
    }

    /// Build the `(max_features + 1) × dims` initial embedding matrix.
    /// Vocabulary tokens take their pretrained vector; misses get a
    /// random vector memoized per word, so the same unseen word always
    /// maps to the same vector within this call. The final row — the
    /// pad/OOV sentinel — is all zeros.
    fn init_word_vectors(&mut self, wvs: &WordVectors) {
        let dims = self.embedding_dims;
        let mut rng = rand::thread_rng();
        let mut unknown_words_to_vecs: HashMap<String, Vec<f32>> = HashMap::new();
        let random_vector = |rng: &mut rand::rngs::ThreadRng| -> Vec<f32> {
            (0..dims).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
        };

        let mut matrix = Vec::with_capacity(self.max_features + 1);
        for id in 0..self.max_features {
            let row = match self.reverse_vocab.get(id) {
                Some(token) => match wvs.get(token) {
                    Some(vector) => vector.to_vec(),
                    None => unknown_words_to_vecs
                        .entry(token.clone())
                        .or_insert_with(|| random_vector(&mut rng))
                        .clone(),
                },
                // Slot above the actual vocabulary size: never looked
                // up, but the table must still be full-height.
                None => random_vector(&mut rng),
            };
            matrix.push(row);
        }
        matrix.push(vec![0.0; self.embedding_dims]);

        tracing::info!(
            "embedding matrix initialized: {} rows × {} dims ({} pretrained misses)",
            matrix.len(),
            self.embedding_dims,
            unknown_words_to_vecs.len()
        );
        self.init_vectors = Some(matrix);
    }

    // ── Sequence building ─────────────────────────────────────────────────────

    /// Map each sentence to an id sequence of exactly `max_sent_len`:
    /// unknown tokens are dropped, over-long sentences keep their
    /// *last* `max_sent_len` ids, short ones are left-padded with the
    /// pad id. Independent of document grouping.
    pub fn build_sequences(&self, sentences: &[String]) -> Vec<Vec<u32>> {
        sentences
            .iter()
            .map(|sentence| {
                let ids: Vec<u32> = self
                    .tokenize(sentence)
                    .into_iter()
                    .filter_map(|token| self.vocab.get(&token).copied())
                    .collect();

                let keep_from = ids.len().saturating_sub(self.max_sent_len);
                let kept = &ids[keep_from..];

                let mut row = vec![self.pad_id(); self.max_sent_len - kept.len()];
                row.extend_from_slice(kept);
                row
            })
            .collect()
    }

    /// Map ids back to surface tokens, skipping padding.
    pub fn ids_to_tokens(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .filter(|&&id| id != self.pad_id())
            .filter_map(|&id| self.id_to_token(id).map(|s| s.to_string()))
            .collect()
    }

    /// Naive whitespace tokenization: lowercase, strip punctuation
    /// from token edges, drop stopwords. Applied identically at fit
    /// time and to all future incoming text.
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|word| {
                word.to_lowercase()
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string()
            })
            .filter(|token| !token.is_empty())
            .filter(|token| match &self.stopwords {
                Some(set) => !set.contains(token),
                None => true,
            })
            .collect()
    }
}

/// The standard English stopword list (spaCy's EN set). Passed into
/// the Preprocessor as an explicit configuration value.
pub fn default_stopwords() -> Vec<String> {
    DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect()
}

const DEFAULT_STOPWORDS: &[&str] = &[
    "all", "six", "just", "less", "being", "indeed", "over", "move", "anyway", "four", "not",
    "own", "through", "using", "fify", "where", "mill", "only", "find", "before", "one", "whose",
    "system", "how", "somewhere", "much", "thick", "show", "had", "enough", "should", "to",
    "must", "whom", "seeming", "yourselves", "under", "ours", "two", "has", "might", "thereafter",
    "latterly", "do", "them", "his", "around", "than", "get", "very", "de", "none", "cannot",
    "every", "un", "they", "front", "during", "thus", "now", "him", "nor", "name", "regarding",
    "several", "hereafter", "did", "always", "who", "didn", "whither", "this", "someone",
    "either", "each", "become", "thereupon", "sometime", "side", "towards", "therein", "twelve",
    "because", "often", "ten", "our", "doing", "km", "eg", "some", "back", "used", "up", "go",
    "namely", "computer", "are", "further", "beyond", "ourselves", "yet", "out", "even", "will",
    "what", "still", "for", "bottom", "mine", "since", "please", "forty", "per", "its",
    "everything", "behind", "does", "various", "above", "between", "it", "neither", "seemed",
    "ever", "across", "she", "somehow", "be", "we", "full", "never", "sixty", "however", "here",
    "otherwise", "were", "whereupon", "nowhere", "although", "found", "alone", "re", "along",
    "quite", "fifteen", "by", "both", "about", "last", "would", "anything", "via", "many",
    "could", "thence", "put", "against", "keep", "etc", "amount", "became", "ltd", "hence",
    "onto", "or", "con", "among", "already", "co", "afterwards", "formerly", "within", "seems",
    "into", "others", "while", "whatever", "except", "down", "hers", "everyone", "done", "least",
    "another", "whoever", "moreover", "couldnt", "throughout", "anyhow", "yourself", "three",
    "from", "her", "few", "together", "top", "there", "due", "been", "next", "anyone", "eleven",
    "cry", "call", "therefore", "interest", "then", "thru", "themselves", "hundred", "really",
    "sincere", "empty", "more", "himself", "elsewhere", "mostly", "on", "fire", "am", "becoming",
    "hereby", "amongst", "else", "part", "everywhere", "too", "kg", "herself", "former", "those",
    "he", "me", "myself", "made", "twenty", "these", "was", "bill", "cant", "us", "until",
    "besides", "nevertheless", "below", "anywhere", "nine", "can", "whether", "of", "your",
    "toward", "my", "say", "something", "and", "whereafter", "whenever", "give", "almost",
    "wherever", "is", "describe", "beforehand", "herein", "doesn", "an", "as", "itself", "at",
    "have", "in", "seem", "whence", "ie", "any", "fill", "again", "hasnt", "inc", "thereby",
    "thin", "no", "perhaps", "latter", "meanwhile", "when", "detail", "same", "wherein",
    "beside", "also", "that", "other", "take", "which", "becomes", "you", "if", "nobody",
    "unless", "whereas", "see", "though", "may", "after", "upon", "most", "hereupon", "eight",
    "but", "serious", "nothing", "such", "why", "off", "a", "don", "whereby", "third", "i",
    "whole", "noone", "sometimes", "well", "amoungst", "yours", "their", "rather", "without",
    "so", "five", "the", "first", "with", "make", "once",
];
