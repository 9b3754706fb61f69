//! Best-partner search for a region about to be flushed.

use crate::buckets::GapBuckets;
use crate::region::{Region, RegionCore, RegionId};
use crate::scanner::Scanner;
use crate::scoring::GapScorer;

/// Outcome of one directional search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub id: RegionId,
    pub score: f64,
    /// Another candidate reached the same score
    pub tied: bool,
}

/// Gap score joining `earlier` to `later`.
#[inline]
pub fn join_score(scorer: &dyn GapScorer, earlier: &RegionCore, later: &RegionCore) -> f64 {
    scorer.score(
        earlier.build_end() + 1,
        later.build_start(),
        earlier.query_end() + 1,
        later.query_start(),
    )
}

/// Scans bucket chains for the best-scoring partner of one region.
pub struct MatchFinder<'a, R: Region> {
    regions: &'a [R],
    buckets: &'a GapBuckets,
    scorer: &'a dyn GapScorer,
    best: Option<RegionId>,
    best_score: f64,
    tied: bool,
    examined: u64,
}

impl<'a, R: Region> MatchFinder<'a, R> {
    pub fn new(regions: &'a [R], buckets: &'a GapBuckets, scorer: &'a dyn GapScorer) -> Self {
        MatchFinder {
            regions,
            buckets,
            scorer,
            best: None,
            best_score: f64::NEG_INFINITY,
            tied: false,
            examined: 0,
        }
    }

    /// Candidates scored by the last search
    pub fn examined(&self) -> u64 {
        self.examined
    }

    /// Best partner of `region`: a later one when `forward`, else an earlier one.
    pub fn best_match(&mut self, region: RegionId, forward: bool) -> Option<Match> {
        self.best = None;
        self.best_score = f64::NEG_INFINITY;
        self.tied = false;
        self.examined = 0;

        let core = *self.regions[region].core();
        let seq = core.seq_id();
        let (min_delta, max_delta) = (
            self.scorer.min_delta() as i64,
            self.scorer.max_delta() as i64,
        );
        let (lo, hi) = if forward {
            let k = self
                .buckets
                .bucket_ex(seq, core.build_end(), core.query_end());
            (k + min_delta, k + max_delta)
        } else {
            let k = self
                .buckets
                .bucket_ex(seq, core.build_start(), core.query_start());
            (k - max_delta, k - min_delta)
        };
        let first = self.buckets.first_bucket(seq);
        let last = self.buckets.last_bucket(seq);
        self.scan_all(region, forward, first, last, lo, hi);

        self.best.map(|id| Match {
            id,
            score: self.best_score,
            tied: self.tied,
        })
    }

    #[inline]
    fn consider(&mut self, candidate: RegionId, score: f64) {
        if score == f64::NEG_INFINITY {
            return;
        }
        if score > self.best_score {
            self.best = Some(candidate);
            self.best_score = score;
            self.tied = false;
        } else if score == self.best_score {
            self.tied = true;
        }
    }
}

impl<R: Region> Scanner for MatchFinder<'_, R> {
    fn scan(&mut self, region: RegionId, forward: bool, lo: usize, hi: usize) {
        let target = *self.regions[region].core();
        for bucket in lo..=hi {
            for candidate in self.buckets.chain(self.regions, bucket) {
                if candidate == region {
                    continue;
                }
                let other = self.regions[candidate].core();
                if other.seq_id() != target.seq_id() {
                    continue;
                }
                let score = if forward {
                    if !other.is_after(&target) {
                        continue;
                    }
                    join_score(self.scorer, &target, other)
                } else {
                    if !target.is_after(other) {
                        continue;
                    }
                    join_score(self.scorer, other, &target)
                };
                self.examined += 1;
                self.consider(candidate, score);
                if self.best_score == 0.0 {
                    return;
                }
            }
        }
    }

    fn best_score(&self) -> f64 {
        self.best_score
    }
}
