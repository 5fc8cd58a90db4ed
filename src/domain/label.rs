// ============================================================
// Layer 3 — Sentence Label Domain Type
// ============================================================
// Every sentence in a labeled document carries one of three
// classes:
//   - PosRationale: the sentence argues *for* the document label
//   - NegRationale: the sentence argues *against* it
//   - NonRationale: the sentence carries no rationale signal
//
// The one-hot convention is fixed by the model's softmax head:
//   [1,0,0] → positive rationale
//   [0,1,0] → negative rationale
//   [0,0,1] → non-rationale
// Padding sentences always get NonRationale.

use serde::{Deserialize, Serialize};

/// 3-way rationale class of a single sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentenceLabel {
    PosRationale,
    NegRationale,
    NonRationale,
}

impl SentenceLabel {
    /// Derive the sentence label from the raw 0/1 sentence flag and the
    /// 0/1 document label: a flagged sentence is a rationale in the
    /// *direction* of its document's label.
    pub fn from_binary(sentence_flag: u8, doc_label: u8) -> Self {
        if sentence_flag == 0 {
            SentenceLabel::NonRationale
        } else if doc_label > 0 {
            SentenceLabel::PosRationale
        } else {
            SentenceLabel::NegRationale
        }
    }

    /// Index into the softmax output, matching the one-hot convention.
    pub fn class_index(&self) -> usize {
        match self {
            SentenceLabel::PosRationale => 0,
            SentenceLabel::NegRationale => 1,
            SentenceLabel::NonRationale => 2,
        }
    }

    /// Inverse of `class_index`; anything out of range is NonRationale.
    pub fn from_class_index(index: usize) -> Self {
        match index {
            0 => SentenceLabel::PosRationale,
            1 => SentenceLabel::NegRationale,
            _ => SentenceLabel::NonRationale,
        }
    }

    /// One-hot vector over {pos, neg, non}.
    pub fn one_hot(&self) -> [f32; 3] {
        let mut v = [0.0; 3];
        v[self.class_index()] = 1.0;
        v
    }

    pub fn is_rationale(&self) -> bool {
        !matches!(self, SentenceLabel::NonRationale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_direction_follows_doc_label() {
        assert_eq!(SentenceLabel::from_binary(1, 1), SentenceLabel::PosRationale);
        assert_eq!(SentenceLabel::from_binary(1, 0), SentenceLabel::NegRationale);
        assert_eq!(SentenceLabel::from_binary(0, 1), SentenceLabel::NonRationale);
        assert_eq!(SentenceLabel::from_binary(0, 0), SentenceLabel::NonRationale);
    }

    #[test]
    fn test_class_index_round_trip() {
        for label in [
            SentenceLabel::PosRationale,
            SentenceLabel::NegRationale,
            SentenceLabel::NonRationale,
        ] {
            assert_eq!(SentenceLabel::from_class_index(label.class_index()), label);
        }
    }

    #[test]
    fn test_one_hot_convention() {
        assert_eq!(SentenceLabel::PosRationale.one_hot(), [1.0, 0.0, 0.0]);
        assert_eq!(SentenceLabel::NegRationale.one_hot(), [0.0, 1.0, 0.0]);
        assert_eq!(SentenceLabel::NonRationale.one_hot(), [0.0, 0.0, 1.0]);
    }
}
