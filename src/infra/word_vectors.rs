// ============================================================
// Layer 6 — Pretrained Word Vectors
// ============================================================
// Reads the classic word2vec binary format:
//
//   header line:  "<vocab_count> <dims>\n"   (ASCII)
//   per word:     token bytes, a single 0x20, then <dims>
//                 little-endian f32 values, optionally followed
//                 by a 0x0A separator
//
// Lookups are by exact surface token. Misses are *not* handled
// here — the Preprocessor owns the fallback policy (deterministic
// per-run random vectors), so this type stays a dumb store.
//
// Reference: Mikolov et al. (2013), word2vec distribution format

use anyhow::{bail, ensure, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// An exact-token key→vector store with a fixed dimensionality.
pub struct WordVectors {
    dims: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
    /// Load a word2vec `.bin` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("cannot read word vectors from '{}'", path.display()))?;
        Self::parse(&bytes)
            .with_context(|| format!("malformed word2vec binary '{}'", path.display()))
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        // Header: "<count> <dims>\n"
        let header_end = bytes
            .iter()
            .position(|&b| b == b'\n')
            .context("missing header line")?;
        let header = std::str::from_utf8(&bytes[..header_end]).context("non-UTF8 header")?;
        let mut parts = header.split_whitespace();
        let count: usize = parts
            .next()
            .context("header missing vocab count")?
            .parse()
            .context("bad vocab count")?;
        let dims: usize = parts
            .next()
            .context("header missing dimensionality")?
            .parse()
            .context("bad dimensionality")?;
        ensure!(dims > 0, "zero-dimensional word vectors");

        let mut vectors = HashMap::with_capacity(count);
        let mut pos = header_end + 1;

        for _ in 0..count {
            // Token runs up to the next space.
            let token_end = bytes[pos..]
                .iter()
                .position(|&b| b == b' ')
                .context("truncated entry: no token terminator")?;
            let token = std::str::from_utf8(&bytes[pos..pos + token_end])
                .context("non-UTF8 token")?
                .trim_start_matches('\n')
                .to_string();
            pos += token_end + 1;

            let vec_bytes = dims * 4;
            if pos + vec_bytes > bytes.len() {
                bail!("truncated entry: vector data ends early");
            }
            let mut vector = Vec::with_capacity(dims);
            for chunk in bytes[pos..pos + vec_bytes].chunks_exact(4) {
                vector.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
            pos += vec_bytes;

            // Some writers append a newline after each vector.
            if bytes.get(pos) == Some(&b'\n') {
                pos += 1;
            }

            vectors.insert(token, vector);
        }

        Ok(Self { dims, vectors })
    }

    /// Build directly from (token, vector) pairs. Used by tests and
    /// by callers that source vectors elsewhere.
    pub fn from_pairs(pairs: Vec<(String, Vec<f32>)>) -> Result<Self> {
        let dims = pairs
            .first()
            .map(|(_, v)| v.len())
            .context("empty word-vector set")?;
        for (token, v) in &pairs {
            ensure!(
                v.len() == dims,
                "vector for '{}' has {} dims, expected {}",
                token,
                v.len(),
                dims
            );
        }
        Ok(Self {
            dims,
            vectors: pairs.into_iter().collect(),
        })
    }

    pub fn vector_size(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Exact-token lookup.
    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.vectors.get(token).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_w2v_bin(entries: &[(&str, &[f32])]) -> Vec<u8> {
        let dims = entries[0].1.len();
        let mut out = Vec::new();
        write!(out, "{} {}\n", entries.len(), dims).unwrap();
        for (token, vector) in entries {
            out.extend_from_slice(token.as_bytes());
            out.push(b' ');
            for &x in *vector {
                out.extend_from_slice(&x.to_le_bytes());
            }
            out.push(b'\n');
        }
        out
    }

    #[test]
    fn test_parses_word2vec_binary() {
        let bytes = write_w2v_bin(&[
            ("apple", &[1.0, -2.0, 0.5]),
            ("banana", &[0.0, 3.5, -1.25]),
        ]);
        let wvs = WordVectors::parse(&bytes).unwrap();

        assert_eq!(wvs.vector_size(), 3);
        assert_eq!(wvs.len(), 2);
        assert_eq!(wvs.get("apple").unwrap(), &[1.0, -2.0, 0.5]);
        assert_eq!(wvs.get("banana").unwrap(), &[0.0, 3.5, -1.25]);
        assert!(wvs.get("cherry").is_none());
    }

    #[test]
    fn test_truncated_file_is_an_error() {
        let mut bytes = write_w2v_bin(&[("apple", &[1.0, 2.0, 3.0])]);
        bytes.truncate(bytes.len() - 6);
        assert!(WordVectors::parse(&bytes).is_err());
    }

    #[test]
    fn test_from_pairs_rejects_ragged_dims() {
        let result = WordVectors::from_pairs(vec![
            ("a".to_string(), vec![1.0, 2.0]),
            ("b".to_string(), vec![1.0]),
        ]);
        assert!(result.is_err());
    }
}
