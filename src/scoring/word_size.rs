//! Closed-form gap scorer based on word geometry.
//!
//! A gap between two word hits on a diagonal means every sampled word that
//! would have started inside it failed to match. One substitution breaks at
//! most `ceil(word_size / step_size)` consecutive sampled words, so the
//! smallest number of substitutions consistent with the gap follows from
//! the gap length alone. Each unit of length difference between the build
//! and query sides counts as one further edit.

use super::{GapScorer, ScorerStats, overlap_score};
use crate::error::GapError;

#[derive(Debug)]
pub struct WordSizeGapScorer {
    word_size: i64,
    step_size: i64,
    max_gap: i64,
    max_indel: i64,
    /// Sampled words a single substitution can break
    words_per_substitution: i64,
    stats: ScorerStats,
}

#[inline]
fn div_ceil(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}

/// Edit count as a score; zero edits is exactly `0.0`, never `-0.0`.
#[inline]
fn edits_to_score(edits: i64) -> f64 {
    if edits == 0 { 0.0 } else { -(edits as f64) }
}

impl WordSizeGapScorer {
    pub fn new(
        word_size: u32,
        step_size: u32,
        max_gap: u32,
        max_indel: u32,
    ) -> Result<Self, GapError> {
        if word_size == 0 || step_size == 0 || step_size > word_size {
            return Err(GapError::Config {
                reason: format!(
                    "word size {} and step size {} do not describe a valid sampling",
                    word_size, step_size
                ),
            });
        }
        let word_size = word_size as i64;
        let step_size = step_size as i64;
        Ok(WordSizeGapScorer {
            word_size,
            step_size,
            max_gap: max_gap as i64,
            max_indel: max_indel as i64,
            words_per_substitution: div_ceil(word_size, step_size),
            stats: ScorerStats::default(),
        })
    }

    /// Minimum substitutions explaining `len` unmatched positions between hits.
    #[inline]
    fn substitutions(&self, len: i64) -> i64 {
        if len <= 0 {
            return 0;
        }
        let missed_words = div_ceil(len, self.step_size);
        div_ceil(missed_words, self.words_per_substitution)
    }

    /// Minimum substitutions for an unmatched read end of `len` positions.
    ///
    /// Nothing is implied until a whole word fits in the tail.
    #[inline]
    fn tail_substitutions(&self, len: i64) -> i64 {
        let word_starts = len - self.word_size + 1;
        if word_starts <= 0 {
            return 0;
        }
        let sampled = word_starts / self.step_size;
        div_ceil(sampled, self.words_per_substitution)
    }

    fn gap_score(&self, build_len: i64, query_len: i64) -> f64 {
        if let Some(s) = overlap_score(build_len, query_len) {
            return s;
        }
        if build_len > self.max_gap || query_len > self.max_gap {
            return f64::NEG_INFINITY;
        }
        let indel = (build_len - query_len).abs();
        if indel > self.max_indel {
            return f64::NEG_INFINITY;
        }
        let edits = self.substitutions(build_len.min(query_len)) + indel;
        edits_to_score(edits)
    }
}

impl GapScorer for WordSizeGapScorer {
    fn score(&self, build_start: i64, build_end: i64, query_start: i64, query_end: i64) -> f64 {
        let s = self.gap_score(build_end - build_start, query_end - query_start);
        self.stats.record(s);
        s
    }

    fn score_max(
        &self,
        build_start: i64,
        build_end: i64,
        query_start: i64,
        query_end: i64,
    ) -> f64 {
        let query_len = query_end - query_start;
        if query_len <= 0 {
            return 0.0;
        }
        let aligned = query_len.min((build_end - build_start).max(0));
        edits_to_score(self.tail_substitutions(aligned))
    }

    fn min_delta(&self) -> i32 {
        -(self.max_indel as i32)
    }

    fn max_delta(&self) -> i32 {
        self.max_indel as i32
    }

    fn close(&self) {
        self.stats.flush("word-size");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> WordSizeGapScorer {
        WordSizeGapScorer::new(4, 1, 8, 2).unwrap()
    }

    #[test]
    fn test_contiguous_is_perfect() {
        assert_eq!(scorer().score(100, 100, 50, 50), 0.0);
    }

    #[test]
    fn test_substitution_counts_step_one() {
        let s = scorer();
        // one substitution covers up to a word's worth of gap
        assert_eq!(s.score(0, 1, 0, 1), -1.0);
        assert_eq!(s.score(0, 4, 0, 4), -1.0);
        assert_eq!(s.score(0, 5, 0, 5), -2.0);
        assert_eq!(s.score(0, 8, 0, 8), -2.0);
    }

    #[test]
    fn test_substitution_counts_with_step() {
        // words sampled every 2 positions; a substitution breaks 2 sampled words
        let s = WordSizeGapScorer::new(4, 2, 8, 2).unwrap();
        assert_eq!(s.score(0, 1, 0, 1), -1.0);
        assert_eq!(s.score(0, 4, 0, 4), -1.0);
        assert_eq!(s.score(0, 5, 0, 5), -2.0);
    }

    #[test]
    fn test_indel_costs_per_unit() {
        let s = scorer();
        assert_eq!(s.score(0, 1, 0, 0), -1.0);
        assert_eq!(s.score(0, 0, 0, 2), -2.0);
        assert_eq!(s.score(0, 3, 0, 1), -3.0);
        assert_eq!(s.score(0, 3, 0, 0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_max_gap_enforced() {
        let s = scorer();
        assert!(s.score(0, 8, 0, 8).is_finite());
        assert_eq!(s.score(0, 9, 0, 9), f64::NEG_INFINITY);
        assert_eq!(s.score(0, 9, 0, 8), f64::NEG_INFINITY);
    }

    #[test]
    fn test_tail_bound() {
        let s = scorer();
        assert_eq!(s.score_max(0, 100, 0, 0), 0.0);
        assert_eq!(s.score_max(0, 100, 0, 3), 0.0);
        assert_eq!(s.score_max(0, 100, 0, 4), -1.0);
        assert_eq!(s.score_max(0, 100, 0, 7), -1.0);
        assert_eq!(s.score_max(0, 100, 0, 8), -2.0);
        // tails are not limited by max_gap
        assert_eq!(s.score_max(0, 1000, 0, 40), -10.0);
        // build side shorter than a word implies nothing
        assert_eq!(s.score_max(0, 2, 0, 40), 0.0);
    }

    #[test]
    fn test_delta_window() {
        let s = scorer();
        assert_eq!(s.min_delta(), -2);
        assert_eq!(s.max_delta(), 2);
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(WordSizeGapScorer::new(4, 5, 8, 2).is_err());
        assert!(WordSizeGapScorer::new(0, 1, 8, 2).is_err());
    }
}
