//! Gap scoring models.
//!
//! A gap scorer answers two questions for the merge engine: how good is the
//! gap joining two spans, and which diagonal shifts can ever score above
//! negative infinity. The second bound sizes the bucket window the scanner
//! has to search.
//!
//! # Sign convention
//!
//! Bigger is better. `0.0` is a perfect join (contiguous, or overlapping by
//! the same amount on both axes) and every other allowed gap is strictly
//! negative. Disallowed gaps score `f64::NEG_INFINITY`; they are an ordinary
//! outcome, not an error.
//!
//! # Module Organization
//!
//! - `table` - log-probability lookup table
//! - `word_size` - minimum substitution count from word/step geometry
//! - `protein` - protein substitution matrix heuristic

mod protein;
mod table;
mod word_size;

pub use protein::{ProteinGapScorer, ProteinMatrixStats};
pub use table::TableGapScorer;
pub use word_size::WordSizeGapScorer;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::GapError;
use crate::gap_opt::{ScorerKind, ScorerParams};

/// Scores the gap between two spans.
///
/// All spans are half-open: a gap from `build_start` to `build_end` has
/// length `build_end - build_start`, which is negative when the spans
/// overlap.
pub trait GapScorer: Send + Sync + fmt::Debug {
    /// Score of the gap `[build_start, build_end)` x `[query_start, query_end)`.
    fn score(&self, build_start: i64, build_end: i64, query_start: i64, query_end: i64) -> f64;

    /// Best possible score for an open-ended query tail.
    ///
    /// The query span is the unmatched tail; the build span is how much of
    /// the build is available to align it against.
    fn score_max(&self, build_start: i64, build_end: i64, query_start: i64, query_end: i64)
    -> f64;

    /// Smallest diagonal shift (build length minus query length) that can score.
    fn min_delta(&self) -> i32;

    /// Largest diagonal shift that can score.
    fn max_delta(&self) -> i32;

    /// Flush accumulated statistics.
    fn close(&self);
}

/// Shared handling of overlapping spans.
///
/// Returns `Some` when either length is negative: a perfect score if both
/// axes overlap by the same amount, negative infinity otherwise.
#[inline]
pub(crate) fn overlap_score(build_len: i64, query_len: i64) -> Option<f64> {
    if build_len < 0 || query_len < 0 {
        if build_len == query_len {
            Some(0.0)
        } else {
            Some(f64::NEG_INFINITY)
        }
    } else {
        None
    }
}

/// Call counters shared by all scorers.
///
/// Atomics keep a scorer `Sync` so forward and reverse frame outputs can
/// hold the same instance.
#[derive(Debug, Default)]
pub struct ScorerStats {
    calls: AtomicU64,
    disallowed: AtomicU64,
}

impl ScorerStats {
    #[inline]
    pub fn record(&self, score: f64) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if score == f64::NEG_INFINITY {
            self.disallowed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn disallowed(&self) -> u64 {
        self.disallowed.load(Ordering::Relaxed)
    }

    /// Log and reset the counters.
    pub fn flush(&self, name: &str) {
        let calls = self.calls.swap(0, Ordering::Relaxed);
        let disallowed = self.disallowed.swap(0, Ordering::Relaxed);
        if calls > 0 {
            log::debug!(
                "{} gap scorer: {} gaps scored, {} disallowed ({:.1}%)",
                name,
                calls,
                disallowed,
                100.0 * disallowed as f64 / calls as f64
            );
        }
    }
}

/// Build the scorer selected by configuration
pub fn create_scorer(params: &ScorerParams) -> Result<Arc<dyn GapScorer>, GapError> {
    log::debug!(
        "Creating {} gap scorer (max_gap={}, max_indel={})",
        params.kind.name(),
        params.max_gap,
        params.max_indel
    );
    let scorer: Arc<dyn GapScorer> = match params.kind {
        ScorerKind::WordSize => Arc::new(WordSizeGapScorer::new(
            params.word_size,
            params.step_size,
            params.max_gap,
            params.max_indel,
        )?),
        ScorerKind::Table => Arc::new(TableGapScorer::geometric(
            params.max_gap,
            params.max_indel,
            params.gap_extend_probability,
            params.indel_probability,
        )?),
        ScorerKind::Protein => Arc::new(ProteinGapScorer::new(
            params.max_gap,
            params.max_indel,
            ProteinMatrixStats::blosum62(),
        )),
    };
    Ok(scorer)
}
