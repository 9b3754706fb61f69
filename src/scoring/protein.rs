//! Protein gap scorer.
//!
//! Scores gaps with constants summarising a protein substitution matrix:
//! the expected score of aligning two unrelated residues, plus affine gap
//! open/extend penalties for any length difference.

use super::{GapScorer, ScorerStats, overlap_score};
use crate::defaults;

/// Summary statistics of a protein scoring matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProteinMatrixStats {
    /// Expected score per aligned residue pair under background frequencies (negative)
    pub expected_score: f64,
    pub gap_open: f64,
    pub gap_extend: f64,
}

impl ProteinMatrixStats {
    /// BLOSUM62 with the usual 11/1 affine gap costs
    pub fn blosum62() -> Self {
        ProteinMatrixStats {
            expected_score: defaults::BLOSUM62_EXPECTED_SCORE,
            gap_open: defaults::BLOSUM62_GAP_OPEN,
            gap_extend: defaults::BLOSUM62_GAP_EXTEND,
        }
    }
}

#[derive(Debug)]
pub struct ProteinGapScorer {
    max_gap: i64,
    max_indel: i64,
    matrix: ProteinMatrixStats,
    stats: ScorerStats,
}

impl ProteinGapScorer {
    pub fn new(max_gap: u32, max_indel: u32, matrix: ProteinMatrixStats) -> Self {
        debug_assert!(matrix.expected_score < 0.0);
        ProteinGapScorer {
            max_gap: max_gap as i64,
            max_indel: max_indel as i64,
            matrix,
            stats: ScorerStats::default(),
        }
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
        if build_len == 0 && query_len == 0 {
            return 0.0;
        }
        let aligned = build_len.min(query_len) as f64;
        let mut s = aligned * self.matrix.expected_score;
        if indel > 0 {
            s -= self.matrix.gap_open + indel as f64 * self.matrix.gap_extend;
        }
        s
    }
}

impl GapScorer for ProteinGapScorer {
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
        if aligned == 0 {
            return 0.0;
        }
        aligned as f64 * self.matrix.expected_score
    }

    fn min_delta(&self) -> i32 {
        -(self.max_indel as i32)
    }

    fn max_delta(&self) -> i32 {
        self.max_indel as i32
    }

    fn close(&self) {
        self.stats.flush("protein");
    }
}
