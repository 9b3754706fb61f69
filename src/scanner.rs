//! Wraparound range scan over one sequence's bucket sub-range.
//!
//! A search window around a region is computed with unfolded bucket indices
//! (`GapBuckets::bucket_ex`) and may hang off either end of the range owned
//! by the region's build sequence. [`Scanner::scan_all`] folds the window
//! back onto that range and splits it at the boundary, so every bucket the
//! window covers is visited exactly once and nothing spills into a
//! neighbouring sequence.

use crate::region::RegionId;

/// Examines contiguous bucket ranges on behalf of one region.
pub trait Scanner {
    /// Visit buckets `lo..=hi` (already inside the owned range).
    fn scan(&mut self, region: RegionId, forward: bool, lo: usize, hi: usize);

    /// Best score found so far; `0.0` means nothing can improve on it.
    fn best_score(&self) -> f64;

    /// Visit the unfolded window `[lo, hi]` within the owned range `[first, last]`.
    fn scan_all(
        &mut self,
        region: RegionId,
        forward: bool,
        first: usize,
        last: usize,
        lo: i64,
        hi: i64,
    ) {
        if lo > hi || last < first {
            return;
        }
        let first_i = first as i64;
        let last_i = last as i64;
        let len = last_i - first_i + 1;

        if hi - lo + 1 >= len {
            self.scan(region, forward, first, last);
            return;
        }

        let (mut lo, mut hi) = (lo, hi);
        if hi < first_i {
            let k = (first_i - hi + len - 1) / len;
            lo += k * len;
            hi += k * len;
        } else if lo > last_i {
            let k = (lo - last_i + len - 1) / len;
            lo -= k * len;
            hi -= k * len;
        }

        if hi > last_i {
            self.scan(region, forward, lo as usize, last);
            if self.best_score() != 0.0 {
                self.scan(region, forward, first, (hi - len) as usize);
            }
        } else if lo < first_i {
            self.scan(region, forward, (lo + len) as usize, last);
            if self.best_score() != 0.0 {
                self.scan(region, forward, first, hi as usize);
            }
        } else {
            self.scan(region, forward, lo as usize, hi as usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[derive(Default)]
    struct Recorder {
        visited: Vec<usize>,
        calls: usize,
        perfect_at: Option<usize>,
        best: f64,
    }

    impl Scanner for Recorder {
        fn scan(&mut self, _region: RegionId, _forward: bool, lo: usize, hi: usize) {
            self.calls += 1;
            for b in lo..=hi {
                self.visited.push(b);
                if Some(b) == self.perfect_at {
                    self.best = 0.0;
                }
            }
        }

        fn best_score(&self) -> f64 {
            self.best
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            best: f64::NEG_INFINITY,
            ..Recorder::default()
        }
    }

    fn check_window(first: usize, last: usize, lo: i64, hi: i64) {
        let mut r = recorder();
        r.scan_all(0, true, first, last, lo, hi);
        let len = (last - first + 1) as i64;
        let expected = ((hi - lo + 1) as usize).min(len as usize);
        assert_eq!(
            r.visited.len(),
            expected,
            "window [{}, {}] over [{}, {}]",
            lo,
            hi,
            first,
            last
        );

        let mut sorted = r.visited.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), r.visited.len(), "bucket visited twice");

        for &b in &r.visited {
            assert!(b >= first && b <= last);
            // every visited bucket is congruent to some point of the window
            let offset = (b as i64 - lo).rem_euclid(len);
            assert!(hi - lo + 1 >= len || offset <= hi - lo);
        }
    }

    #[test]
    fn test_window_inside_range() {
        let mut r = recorder();
        r.scan_all(0, true, 100, 199, 120, 125);
        assert_eq!(r.visited, (120..=125).collect::<Vec<_>>());
        assert_eq!(r.calls, 1);
    }

    #[test]
    fn test_window_wider_than_range() {
        let mut r = recorder();
        r.scan_all(0, true, 10, 14, 0, 40);
        assert_eq!(r.visited, vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_split_high_side() {
        let mut r = recorder();
        r.scan_all(0, true, 100, 109, 107, 112);
        assert_eq!(r.visited, vec![107, 108, 109, 100, 101, 102]);
        assert_eq!(r.calls, 2);
    }

    #[test]
    fn test_split_low_side() {
        let mut r = recorder();
        r.scan_all(0, false, 100, 109, 97, 101);
        assert_eq!(r.visited, vec![107, 108, 109, 100, 101]);
    }

    #[test]
    fn test_fold_from_far_outside() {
        let mut r = recorder();
        // 3 range lengths below: folds to [102, 104]
        r.scan_all(0, true, 100, 109, 72, 74);
        assert_eq!(r.visited, vec![102, 103, 104]);

        let mut r = recorder();
        // folds down to [108, 111], then splits
        r.scan_all(0, true, 100, 109, 128, 131);
        assert_eq!(r.visited, vec![108, 109, 100, 101]);
    }

    #[test]
    fn test_perfect_score_skips_second_half() {
        let mut r = recorder();
        r.perfect_at = Some(108);
        r.scan_all(0, true, 100, 109, 107, 112);
        assert_eq!(r.visited, vec![107, 108, 109]);
        assert_eq!(r.calls, 1);
    }

    #[test]
    fn test_empty_window() {
        let mut r = recorder();
        r.scan_all(0, true, 100, 109, 5, 4);
        assert!(r.visited.is_empty());
    }

    #[test]
    fn test_visit_count_random_windows() {
        let mut rng = StdRng::seed_from_u64(0x5ca9);
        for _ in 0..2000 {
            let first = rng.gen_range(0..500usize);
            let last = first + rng.gen_range(0..64usize);
            let lo = rng.gen_range(-300i64..900);
            let hi = lo + rng.gen_range(0i64..80);
            check_window(first, last, lo, hi);
        }
    }
}
