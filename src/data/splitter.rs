// ============================================================
// Layer 4 — Validation Splitter
// ============================================================
// The validation split is always at *document* granularity — never
// at sentence granularity — so no sentence of a validation document
// leaks into training. The tail of the (optionally shuffled)
// document list becomes the validation set, mirroring the
// document-order convention used by both training stages.
//
// A computed validation size of zero is a rejected configuration:
// every checkpoint decision is driven by a validation metric, so
// training without a validation set is meaningless.

use anyhow::{ensure, Result};
use rand::seq::SliceRandom;

/// Index at which the validation tail begins: everything at or past
/// the returned index is validation.
pub fn validation_tail_index(total: usize, val_split: f64) -> Result<usize> {
    ensure!(
        (0.0..1.0).contains(&val_split),
        "val_split must be in [0, 1), got {}",
        val_split
    );

    let validation_size = (val_split * total as f64) as usize;
    ensure!(
        validation_size >= 1,
        "validation split of {} over {} documents yields an empty validation set; \
         raise val_split or supply more documents",
        val_split,
        total
    );
    Ok(total - validation_size)
}

/// Split `items` into (train, validation) with the validation set
/// taken from the tail. `val_split` is the validation fraction.
pub fn split_validation_tail<T>(mut items: Vec<T>, val_split: f64) -> Result<(Vec<T>, Vec<T>)> {
    let split_at = validation_tail_index(items.len(), val_split)?;
    let validation = items.split_off(split_at);

    tracing::debug!(
        "document split: {} train, {} validation",
        items.len(),
        validation.len()
    );
    Ok((items, validation))
}

/// Fisher-Yates shuffle, used when `--shuffle` is set before the
/// tail split is taken.
pub fn shuffle<T>(items: &mut [T]) {
    let mut rng = rand::thread_rng();
    items.shuffle(&mut rng);
}
