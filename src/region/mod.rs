//! Candidate gapped alignment regions.
//!
//! Regions live in a per-output arena and are addressed by [`RegionId`].
//! A slot is recycled through an explicit lifecycle:
//!
//! ```text
//! Empty --initialize--> Init --write--> Written --reset--> Empty
//! ```
//!
//! While `Init` a region tracks an inclusive span on the build and query
//! sequences and belongs to exactly one bucket chain; `next` is the arena
//! index of the following region in that chain. Every transition checks
//! its precondition and reports a violation as [`GapError::Invariant`].
//!
//! # Module Organization
//!
//! - `scored` - variant carrying a running gap score
//! - `surrogate` - detached snapshot handed to output sinks

mod scored;
mod surrogate;

pub use scored::ScoredRegion;
pub use surrogate::{QueryContext, Surrogate};

use std::fmt;

use crate::buckets::GapBuckets;
use crate::error::GapError;
use crate::scoring::GapScorer;

/// Index of a region slot in its output's arena
pub type RegionId = usize;

/// Chain terminator / unset `next`
pub const NO_REGION: RegionId = usize::MAX;

const UNSET_POS: i64 = -1;
const UNSET_SEQ: u32 = u32::MAX;
const UNSET_BUCKET: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// Pooled, holds no span
    Empty,
    /// Active span, linked into a bucket chain
    Init,
    /// Retired; waiting for reset
    Written,
}

/// Coordinates and chain link shared by every region variant.
#[derive(Debug, Clone, Copy)]
pub struct RegionCore {
    id: RegionId,
    state: RegionState,
    seq_id: u32,
    build_start: i64,
    build_end: i64,
    query_start: i64,
    query_end: i64,
    reverse_frame: bool,
    bucket: usize,
    next: RegionId,
}

impl RegionCore {
    pub fn new(id: RegionId) -> Self {
        RegionCore {
            id,
            state: RegionState::Empty,
            seq_id: UNSET_SEQ,
            build_start: UNSET_POS,
            build_end: UNSET_POS,
            query_start: UNSET_POS,
            query_end: UNSET_POS,
            reverse_frame: false,
            bucket: UNSET_BUCKET,
            next: NO_REGION,
        }
    }

    #[inline]
    pub fn id(&self) -> RegionId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> RegionState {
        self.state
    }

    #[inline]
    pub fn seq_id(&self) -> u32 {
        self.seq_id
    }

    #[inline]
    pub fn build_start(&self) -> i64 {
        self.build_start
    }

    #[inline]
    pub fn build_end(&self) -> i64 {
        self.build_end
    }

    #[inline]
    pub fn query_start(&self) -> i64 {
        self.query_start
    }

    #[inline]
    pub fn query_end(&self) -> i64 {
        self.query_end
    }

    #[inline]
    pub fn is_reverse_frame(&self) -> bool {
        self.reverse_frame
    }

    #[inline]
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    #[inline]
    pub fn next(&self) -> RegionId {
        self.next
    }

    #[inline]
    pub(crate) fn set_next(&mut self, next: RegionId) {
        self.next = next;
    }

    /// True when `self` lies strictly after `that` on both axes.
    #[inline]
    pub fn is_after(&self, that: &RegionCore) -> bool {
        self.build_end > that.build_end && self.query_end > that.query_end
    }

    fn require(&self, state: RegionState, operation: &'static str) -> Result<(), GapError> {
        if self.state != state {
            return Err(GapError::invariant(
                self.id,
                operation,
                self.state,
                format!("requires {:?}", state),
            ));
        }
        Ok(())
    }

    /// Start tracking a single word hit.
    pub fn initialize(
        &mut self,
        seq_id: u32,
        build_start: i64,
        query_start: i64,
        word_size: u32,
        buckets: &GapBuckets,
        next: RegionId,
        reverse_frame: bool,
    ) -> Result<(), GapError> {
        self.require(RegionState::Empty, "initialize")?;
        if next == NO_REGION {
            return Err(GapError::invariant(
                self.id,
                "initialize",
                self.state,
                "chain successor must be set",
            ));
        }
        self.seq_id = seq_id;
        self.build_start = build_start;
        self.build_end = build_start + word_size as i64 - 1;
        self.query_start = query_start;
        self.query_end = query_start + word_size as i64 - 1;
        self.reverse_frame = reverse_frame;
        self.bucket = buckets.bucket(seq_id, self.build_end, self.query_end);
        self.next = next;
        self.state = RegionState::Init;
        Ok(())
    }

    /// Extend this span backward over an earlier region on the same sequence.
    ///
    /// Returns false when `that` does not start earlier; the span is then
    /// left untouched.
    pub fn merge(&mut self, that: &RegionCore) -> Result<bool, GapError> {
        self.require(RegionState::Init, "merge")?;
        that.require(RegionState::Init, "merge")?;
        if self.seq_id != that.seq_id {
            return Err(GapError::invariant(
                self.id,
                "merge",
                self.state,
                format!(
                    "region {} is on sequence {}, not {}",
                    that.id, that.seq_id, self.seq_id
                ),
            ));
        }
        if self.build_end <= that.build_end {
            return Err(GapError::invariant(
                self.id,
                "merge",
                self.state,
                format!(
                    "region {} ends at {}, not before {}",
                    that.id, that.build_end, self.build_end
                ),
            ));
        }
        // Tolerates regions that share a bucket without sharing a diagonal.
        // TODO: count how often this fires on real data to tell collisions from repeated merges.
        if that.build_start >= self.build_start {
            return Ok(false);
        }
        self.build_start = that.build_start;
        self.query_start = that.query_start;
        Ok(true)
    }

    pub fn write(&mut self) -> Result<(), GapError> {
        self.require(RegionState::Init, "write")?;
        self.state = RegionState::Written;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), GapError> {
        self.require(RegionState::Written, "reset")?;
        *self = RegionCore::new(self.id);
        Ok(())
    }

    /// Copy the span into a reusable snapshot.
    pub fn fill_surrogate<'a>(
        &self,
        slot: &'a mut Option<Surrogate>,
        query: &QueryContext,
    ) -> &'a mut Surrogate {
        let s = slot.get_or_insert_with(Surrogate::default);
        s.query_id = query.query_id;
        s.frame = query.frame;
        s.query_length = query.query_length;
        s.query_effective_length = query.query_effective_length;
        s.seq_id = self.seq_id;
        s.build_start = self.build_start;
        s.build_end = self.build_end;
        s.query_start = self.query_start;
        s.query_end = self.query_end;
        s.reverse_frame = self.reverse_frame;
        s.penalty = None;
        s.threshold = None;
        s
    }
}

impl fmt::Display for RegionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region {} [{:?}] seq={} build={}..{} query={}..{}",
            self.id,
            self.state,
            self.seq_id,
            self.build_start,
            self.build_end,
            self.query_start,
            self.query_end
        )
    }
}

/// Contract shared by the region variants.
///
/// The orchestrator is generic over this trait; the variant is picked when
/// the output is built.
pub trait Region: Copy + fmt::Debug + Send + 'static {
    /// Short name used in log messages
    const KIND: &'static str;

    /// A fresh slot in the `Empty` state.
    fn empty(id: RegionId) -> Self;

    fn core(&self) -> &RegionCore;

    fn core_mut(&mut self) -> &mut RegionCore;

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
        self.core_mut().initialize(
            seq_id,
            build_start,
            query_start,
            word_size,
            buckets,
            next,
            reverse_frame,
        )
    }

    /// Absorb the earlier region `that`.
    fn merge(&mut self, that: &Self, scorer: &dyn GapScorer) -> Result<(), GapError>;

    fn write(&mut self) -> Result<(), GapError> {
        self.core_mut().write()
    }

    fn reset(&mut self) -> Result<(), GapError> {
        self.core_mut().reset()
    }

    /// Snapshot this region for output, reusing `slot` when it holds one.
    ///
    /// `build_length` is the length of the region's build sequence.
    fn surrogate<'a>(
        &self,
        slot: &'a mut Option<Surrogate>,
        query: &QueryContext,
        build_length: u32,
        scorer: &dyn GapScorer,
    ) -> &'a Surrogate;
}

/// Region that only tracks coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PlainRegion {
    core: RegionCore,
}

impl Region for PlainRegion {
    const KIND: &'static str = "plain";

    fn empty(id: RegionId) -> Self {
        PlainRegion {
            core: RegionCore::new(id),
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

    fn merge(&mut self, that: &Self, _scorer: &dyn GapScorer) -> Result<(), GapError> {
        self.core.merge(&that.core).map(|_| ())
    }

    fn surrogate<'a>(
        &self,
        slot: &'a mut Option<Surrogate>,
        query: &QueryContext,
        _build_length: u32,
        _scorer: &dyn GapScorer,
    ) -> &'a Surrogate {
        self.core.fill_surrogate(slot, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Frame;
    use crate::scoring::WordSizeGapScorer;

    fn buckets() -> GapBuckets {
        GapBuckets::new(&[100, 50], 20)
    }

    fn query() -> QueryContext {
        QueryContext {
            query_id: 7,
            frame: Frame::Forward,
            query_length: 40,
            query_effective_length: 40,
            threshold: None,
        }
    }

    fn active(id: RegionId, build: i64, query: i64, b: &GapBuckets) -> PlainRegion {
        let mut r = PlainRegion::empty(id);
        r.initialize(0, build, query, 4, b, id, false).unwrap();
        r
    }

    #[test]
    fn test_initialize_sets_word_span() {
        let b = buckets();
        let r = active(3, 30, 10, &b);
        let c = r.core();
        assert_eq!(c.state(), RegionState::Init);
        assert_eq!((c.build_start(), c.build_end()), (30, 33));
        assert_eq!((c.query_start(), c.query_end()), (10, 13));
        assert_eq!(c.bucket(), b.bucket(0, 33, 13));
        assert_eq!(c.next(), 3);
    }

    #[test]
    fn test_initialize_twice_fails() {
        let b = buckets();
        let mut r = active(0, 30, 10, &b);
        let err = r.initialize(0, 40, 20, 4, &b, 0, false).unwrap_err();
        assert!(matches!(err, GapError::Invariant { operation: "initialize", .. }));
    }

    #[test]
    fn test_initialize_requires_next() {
        let b = buckets();
        let mut r = PlainRegion::empty(0);
        assert!(r.initialize(0, 30, 10, 4, &b, NO_REGION, false).is_err());
        assert_eq!(r.core().state(), RegionState::Empty);
    }

    #[test]
    fn test_write_reset_round_trip() {
        let b = buckets();
        let mut r = active(5, 30, 10, &b);
        assert!(r.reset().is_err(), "reset requires Written");
        r.write().unwrap();
        assert!(r.write().is_err());
        r.reset().unwrap();

        let c = r.core();
        assert_eq!(c.id(), 5);
        assert_eq!(c.state(), RegionState::Empty);
        assert_eq!(c.seq_id(), UNSET_SEQ);
        assert_eq!(c.build_start(), UNSET_POS);
        assert_eq!(c.build_end(), UNSET_POS);
        assert_eq!(c.query_start(), UNSET_POS);
        assert_eq!(c.query_end(), UNSET_POS);
        assert_eq!(c.bucket(), UNSET_BUCKET);
        assert_eq!(c.next(), NO_REGION);

        // slot is reusable after reset
        r.initialize(1, 10, 2, 4, &b, 5, true).unwrap();
        assert!(r.core().is_reverse_frame());
    }

    #[test]
    fn test_merge_extends_backward() {
        let b = buckets();
        let scorer = WordSizeGapScorer::new(4, 1, 8, 2).unwrap();
        let earlier = active(0, 30, 10, &b);
        let mut later = active(1, 36, 16, &b);
        later.merge(&earlier, &scorer).unwrap();
        let c = later.core();
        assert_eq!((c.build_start(), c.build_end()), (30, 39));
        assert_eq!((c.query_start(), c.query_end()), (10, 19));
    }

    #[test]
    fn test_merge_without_earlier_start_is_noop() {
        let b = buckets();
        let mut later = active(1, 36, 16, &b);
        let mut that = active(0, 38, 12, &b);
        // that.build_end 41 > later.build_end 39 is not allowed
        let scorer = WordSizeGapScorer::new(4, 1, 8, 2).unwrap();
        assert!(later.merge(&that, &scorer).is_err());

        that = active(0, 37, 12, &b);
        let mut wider = active(2, 36, 16, &b);
        wider.core_mut().build_end = 45;
        assert!(!wider.core_mut().merge(that.core()).unwrap());
        assert_eq!(wider.core().build_start(), 36);
        assert_eq!(wider.core().query_start(), 16);
    }

    #[test]
    fn test_merge_rejects_other_sequence() {
        let b = buckets();
        let earlier = {
            let mut r = PlainRegion::empty(0);
            r.initialize(1, 10, 10, 4, &b, 0, false).unwrap();
            r
        };
        let mut later = active(1, 36, 16, &b);
        assert!(later.core_mut().merge(earlier.core()).is_err());
    }

    #[test]
    fn test_merge_rejects_retired() {
        let b = buckets();
        let mut earlier = active(0, 30, 10, &b);
        earlier.write().unwrap();
        let mut later = active(1, 36, 16, &b);
        assert!(later.core_mut().merge(earlier.core()).is_err());
    }

    #[test]
    fn test_surrogate_reuses_slot() {
        let b = buckets();
        let scorer = WordSizeGapScorer::new(4, 1, 8, 2).unwrap();
        let mut slot = None;
        let r = active(0, 30, 10, &b);
        let s = r.surrogate(&mut slot, &query(), 100, &scorer);
        assert_eq!(s.build_start, 30);
        assert_eq!(s.query_id, 7);
        assert!(s.penalty.is_none());
        assert!(s.score_allowed());

        let r2 = active(1, 60, 20, &b);
        let s2 = r2.surrogate(&mut slot, &query(), 100, &scorer);
        assert_eq!(s2.build_start, 60);
        assert_eq!(slot.as_ref().map(|s| s.query_start), Some(20));
    }
}
