//! Region variant carrying a running gap score.
//!
//! The score starts at `0.0` for a single word and only ever decreases as
//! gap scores are added on merge. It is `NaN` whenever the region is not
//! active. The surrogate stores the negated total, including an end-of-read
//! correction for the unmatched query head and tail, as a penalty.

use super::{QueryContext, Region, RegionCore, RegionId, Surrogate};
use crate::buckets::GapBuckets;
use crate::error::GapError;
use crate::scoring::GapScorer;

#[derive(Debug, Clone, Copy)]
pub struct ScoredRegion {
    core: RegionCore,
    score: f64,
}

impl ScoredRegion {
    /// Accumulated gap score; `NaN` unless the region is active.
    #[inline]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Accumulated score plus the best case for the unmatched read ends.
    ///
    /// Both ends are bounded by the build sequence `[0, build_length)`.
    pub fn corrected_score(
        &self,
        query: &QueryContext,
        build_length: u32,
        scorer: &dyn GapScorer,
    ) -> f64 {
        let c = &self.core;
        let slack = scorer.max_delta().max(0) as i64;

        let head_len = c.query_start();
        let head_build = (c.build_start() - head_len - slack).max(0);
        let head = scorer.score_max(head_build, c.build_start(), 0, c.query_start());

        let tail_start = c.query_end() + 1;
        let tail_len = (query.query_effective_length as i64 - tail_start).max(0);
        let tail_build = (c.build_end() + 1 + tail_len + slack).min(build_length as i64);
        let tail = scorer.score_max(
            c.build_end() + 1,
            tail_build,
            tail_start,
            tail_start + tail_len,
        );

        self.score + head + tail
    }
}

impl Region for ScoredRegion {
    const KIND: &'static str = "scored";

    fn empty(id: RegionId) -> Self {
        ScoredRegion {
            core: RegionCore::new(id),
            score: f64::NAN,
        }
    }

    #[inline]
    fn core(&self) -> &RegionCore {
        &self.core
    }

    #[inline]
    fn core_mut(&mut self) -> &mut RegionCore {
        &mut self.core
    }

    fn initialize(
        &mut self,
        seq_id: u32,
        build_start: i64,
        query_start: i64,
        word_size: u32,
        buckets: &GapBuckets,
        next: RegionId,
        reverse_frame: bool,
    ) -> Result<(), GapError> {
        self.core.initialize(
            seq_id,
            build_start,
            query_start,
            word_size,
            buckets,
            next,
            reverse_frame,
        )?;
        self.score = 0.0;
        Ok(())
    }

    fn merge(&mut self, that: &Self, scorer: &dyn GapScorer) -> Result<(), GapError> {
        let gap = if that.core.build_end() < self.core.build_start() {
            scorer.score(
                that.core.build_end() + 1,
                self.core.build_start(),
                that.core.query_end() + 1,
                self.core.query_start(),
            )
        } else {
            0.0
        };
        self.core.merge(&that.core)?;
        self.score += gap + that.score;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), GapError> {
        self.core.reset()?;
        self.score = f64::NAN;
        Ok(())
    }

    fn surrogate<'a>(
        &self,
        slot: &'a mut Option<Surrogate>,
        query: &QueryContext,
        build_length: u32,
        scorer: &dyn GapScorer,
    ) -> &'a Surrogate {
        let total = self.corrected_score(query, build_length, scorer);
        let s = self.core.fill_surrogate(slot, query);
        s.penalty = Some(if total == 0.0 { 0.0 } else { -total });
        s.threshold = query.threshold;
        s
    }
}
