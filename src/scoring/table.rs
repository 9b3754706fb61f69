//! Table-driven gap scorer.
//!
//! Holds natural-log probabilities indexed by build gap length and query
//! gap length, built once from a raw probability distribution. Entries are
//! normalised against the contiguous case so that a zero-length gap scores
//! exactly `0.0`.

use super::{GapScorer, ScorerStats, overlap_score};
use crate::error::GapError;

#[derive(Debug)]
pub struct TableGapScorer {
    /// ln(p[b][q] / p[0][0]); negative infinity where p is zero
    table: Vec<Vec<f64>>,
    max_gap: i64,
    min_delta: i32,
    max_delta: i32,
    stats: ScorerStats,
}

impl TableGapScorer {
    /// Build from a square matrix of raw probabilities `raw[build_len][query_len]`.
    ///
    /// `raw[0][0]` must be the unique maximum so every non-contiguous gap
    /// scores strictly below zero.
    pub fn from_probabilities(raw: &[Vec<f64>]) -> Result<Self, GapError> {
        let n = raw.len();
        if n == 0 || raw.iter().any(|row| row.len() != n) {
            return Err(GapError::Config {
                reason: "gap probability table must be a non-empty square matrix".to_string(),
            });
        }
        let base = raw[0][0];
        if !(base > 0.0) {
            return Err(GapError::Config {
                reason: format!("contiguous gap probability must be positive, got {}", base),
            });
        }

        let mut table = vec![vec![f64::NEG_INFINITY; n]; n];
        let mut min_delta = i32::MAX;
        let mut max_delta = i32::MIN;
        for (b, row) in raw.iter().enumerate() {
            for (q, &p) in row.iter().enumerate() {
                if !(p >= 0.0) {
                    return Err(GapError::Config {
                        reason: format!("gap probability [{}][{}] is {}", b, q, p),
                    });
                }
                if (b, q) != (0, 0) && p >= base {
                    return Err(GapError::Config {
                        reason: format!(
                            "gap probability [{}][{}]={} is not below the contiguous probability {}",
                            b, q, p, base
                        ),
                    });
                }
                if p > 0.0 {
                    table[b][q] = if (b, q) == (0, 0) { 0.0 } else { (p / base).ln() };
                    let delta = b as i32 - q as i32;
                    min_delta = min_delta.min(delta);
                    max_delta = max_delta.max(delta);
                }
            }
        }

        log::debug!(
            "Gap probability table {}x{}: delta window [{}, {}]",
            n,
            n,
            min_delta,
            max_delta
        );

        Ok(TableGapScorer {
            table,
            max_gap: n as i64 - 1,
            min_delta,
            max_delta,
            stats: ScorerStats::default(),
        })
    }

    /// Distribution where each aligned gap position has probability
    /// `extend_probability` and each unit of length difference
    /// `indel_probability`, truncated at `max_indel`.
    pub fn geometric(
        max_gap: u32,
        max_indel: u32,
        extend_probability: f64,
        indel_probability: f64,
    ) -> Result<Self, GapError> {
        let n = max_gap as usize + 1;
        let mut raw = vec![vec![0.0; n]; n];
        for (b, row) in raw.iter_mut().enumerate() {
            for (q, p) in row.iter_mut().enumerate() {
                let indel = b.abs_diff(q);
                if indel <= max_indel as usize {
                    *p = extend_probability.powi(b.min(q) as i32)
                        * indel_probability.powi(indel as i32);
                }
            }
        }
        Self::from_probabilities(&raw)
    }

    #[inline]
    fn lookup(&self, build_len: i64, query_len: i64) -> f64 {
        if build_len > self.max_gap || query_len > self.max_gap {
            return f64::NEG_INFINITY;
        }
        self.table[build_len as usize][query_len as usize]
    }
}

impl GapScorer for TableGapScorer {
    fn score(&self, build_start: i64, build_end: i64, query_start: i64, query_end: i64) -> f64 {
        let build_len = build_end - build_start;
        let query_len = query_end - query_start;
        let s = overlap_score(build_len, query_len).unwrap_or_else(|| self.lookup(build_len, query_len));
        self.stats.record(s);
        s
    }

    /// Tails longer than the table are bounded by the table's last row.
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
        let q = query_len.min(self.max_gap);
        let available = (build_end - build_start).max(0);
        let lo = (q + self.min_delta as i64).max(0);
        let hi = (q + self.max_delta as i64).min(self.max_gap).min(available.max(lo));
        (lo..=hi)
            .map(|b| self.table[b as usize][q as usize])
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn min_delta(&self) -> i32 {
        self.min_delta
    }

    fn max_delta(&self) -> i32 {
        self.max_delta
    }

    fn close(&self) {
        self.stats.flush("table");
    }
}
