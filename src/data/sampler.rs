// ============================================================
// Layer 4 — Balanced Sampling
// ============================================================
// Rationale labels are wildly imbalanced: almost every sentence
// is a non-rationale. Balanced-sampling mode therefore draws a
// fresh class-balanced subset each epoch instead of fitting the
// raw distribution.
//
// Three-way (sentence) sampling keeps *every* pos/neg rationale
// and draws an equally sized non-rationale subset without
// replacement, so the returned index set has size
// 2 × (|pos| + |neg|) with no repeats.
//
// Binary (document) sampling draws equal counts of each label,
// the minority class setting the count.

use anyhow::{ensure, Result};
use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::domain::label::SentenceLabel;

/// Class-balanced index sample for the 3-way sentence task.
pub fn balanced_sample_three_way(
    labels: &[SentenceLabel],
    rng: &mut impl Rng,
) -> Result<Vec<usize>> {
    let mut pos = Vec::new();
    let mut neg = Vec::new();
    let mut non = Vec::new();
    for (idx, label) in labels.iter().enumerate() {
        match label {
            SentenceLabel::PosRationale => pos.push(idx),
            SentenceLabel::NegRationale => neg.push(idx),
            SentenceLabel::NonRationale => non.push(idx),
        }
    }

    let m = pos.len() + neg.len();
    ensure!(m > 0, "balanced sampling requires at least one rationale sentence");
    ensure!(
        non.len() >= m,
        "not enough non-rationale sentences to balance: need {}, have {}",
        m,
        non.len()
    );

    let mut sample: Vec<usize> = pos;
    sample.extend(neg);
    sample.extend(index::sample(rng, non.len(), m).into_iter().map(|i| non[i]));
    sample.shuffle(rng);
    Ok(sample)
}

/// Class-balanced index sample for the binary document task: equal
/// counts of label-0 and label-1, sized by the minority class.
pub fn balanced_sample_binary(labels: &[u8], rng: &mut impl Rng) -> Result<Vec<usize>> {
    let pos: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &y)| y > 0)
        .map(|(i, _)| i)
        .collect();
    let neg: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &y)| y == 0)
        .map(|(i, _)| i)
        .collect();

    let m = pos.len().min(neg.len());
    ensure!(m > 0, "balanced sampling requires both document classes to be present");

    let mut sample: Vec<usize> = index::sample(rng, pos.len(), m)
        .into_iter()
        .map(|i| pos[i])
        .collect();
    sample.extend(index::sample(rng, neg.len(), m).into_iter().map(|i| neg[i]));
    sample.shuffle(rng);
    Ok(sample)
}
