//! Gapped merge orchestrator.
//!
//! Each hit becomes a one-word region linked into the chain of its diagonal
//! bucket and recorded in the column of its query position. Columns form a
//! ring of `word_size + max_gap + 1` entries; once the scan position moves
//! more than `word_size + max_gap` past a column, nothing new can reach its
//! regions, so the column is flushed.
//!
//! Flushing a region R:
//!
//! 1. R must be the head (oldest member) of its bucket chain.
//! 2. Find R's best later partner C, then C's best earlier partner.
//! 3. If that is R again and neither search was tied, C absorbs R.
//!    Otherwise R is written to the sink as a surrogate.
//! 4. R leaves its chain and its slot returns to the free list.
//!
//! Merged regions keep their original column, so a chain of hits keeps
//! growing backward until its most recent hit is flushed without a partner.

use std::sync::Arc;

use super::matcher::{Match, MatchFinder};
use super::sink::OutputSink;
use super::{Frame, OutputStats, PositionOutput};
use crate::buckets::GapBuckets;
use crate::error::GapError;
use crate::gap_opt::MergeParams;
use crate::region::{QueryContext, Region, RegionId, Surrogate};
use crate::scoring::GapScorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputState {
    Idle,
    Sequence,
    Query,
    Position,
    Hit,
    Done,
}

impl OutputState {
    fn name(&self) -> &'static str {
        match self {
            OutputState::Idle => "IDLE",
            OutputState::Sequence => "SEQUENCE",
            OutputState::Query => "QUERY",
            OutputState::Position => "POSITION",
            OutputState::Hit => "HIT",
            OutputState::Done => "DONE",
        }
    }
}

/// Merges word hits into gapped regions for one stream of queries.
///
/// Not shareable between threads while in use; run the other frame on a
/// [`GappedOutput::reverse_clone_with`] instead.
pub struct GappedOutput<R: Region, S: OutputSink> {
    params: MergeParams,
    scorer: Arc<dyn GapScorer>,
    build_lengths: Arc<[u32]>,

    buckets: GapBuckets,
    regions: Vec<R>,
    free: Vec<RegionId>,
    columns: Vec<Vec<RegionId>>,

    state: OutputState,
    query: QueryContext,
    position: i64,
    /// Every column at or before this position has been flushed
    flushed_through: i64,

    surrogate: Option<Surrogate>,
    sink: S,

    stats: OutputStats,
    query_stats: OutputStats,
    poisoned: bool,
}

impl<R: Region, S: OutputSink> GappedOutput<R, S> {
    pub fn new(
        params: MergeParams,
        scorer: Arc<dyn GapScorer>,
        build_lengths: Arc<[u32]>,
        sink: S,
    ) -> Self {
        let buckets = GapBuckets::new(&build_lengths, params.max_query_length);
        let columns = vec![Vec::new(); params.mergeable_lag() as usize + 1];
        log::debug!(
            "GappedOutput<{}>: {} build sequences, {} columns, {} buckets",
            R::KIND,
            build_lengths.len(),
            columns.len(),
            buckets.capacity()
        );
        GappedOutput {
            params,
            scorer,
            build_lengths,
            buckets,
            regions: Vec::new(),
            free: Vec::new(),
            columns,
            state: OutputState::Idle,
            query: QueryContext {
                query_id: 0,
                frame: Frame::Forward,
                query_length: 0,
                query_effective_length: 0,
                threshold: params.score_threshold,
            },
            position: -1,
            flushed_through: -1,
            surrogate: None,
            sink,
            stats: OutputStats::default(),
            query_stats: OutputStats::default(),
            poisoned: false,
        }
    }

    /// Fresh output sharing this one's scorer, options and build lengths.
    pub fn reverse_clone_with<T: OutputSink>(&self, sink: T) -> GappedOutput<R, T> {
        GappedOutput::new(
            self.params,
            Arc::clone(&self.scorer),
            Arc::clone(&self.build_lengths),
            sink,
        )
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Region slots allocated so far (live and pooled)
    pub fn pool_size(&self) -> usize {
        self.regions.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Run `f` unless poisoned; poison on any error it returns.
    fn checked<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, GapError>,
    ) -> Result<T, GapError> {
        if self.poisoned {
            return Err(GapError::Poisoned);
        }
        let result = f(self);
        if let Err(e) = &result {
            log::error!("Gapped output aborted: {}", e);
            self.poisoned = true;
        }
        result
    }

    fn require_state(&self, call: &'static str, allowed: &[OutputState]) -> Result<(), GapError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(GapError::Protocol {
                call,
                state: self.state.name(),
            })
        }
    }

    fn allocate(&mut self) -> RegionId {
        match self.free.pop() {
            Some(id) => id,
            None => {
                let id = self.regions.len();
                self.regions.push(R::empty(id));
                id
            }
        }
    }

    fn do_set_position(&mut self, position: i64) -> Result<(), GapError> {
        self.require_state("set_position", &[OutputState::Query])?;
        if position <= self.position {
            return Err(GapError::PositionOrder {
                previous: self.position,
                position,
            });
        }
        let length = self.query.query_effective_length;
        if position > length as i64 - self.params.word_size as i64 {
            return Err(GapError::QueryPosition {
                position,
                word_size: self.params.word_size,
                length,
            });
        }
        let lag = self.params.mergeable_lag() as i64;
        self.flush_through(position - lag - 1)?;
        self.position = position;
        self.state = OutputState::Position;
        Ok(())
    }

    fn do_hit(&mut self, seq_id: u32, build_pos: i64) -> Result<(), GapError> {
        self.require_state("hit", &[OutputState::Position, OutputState::Hit])?;
        let count = self.build_lengths.len();
        let length = *self
            .build_lengths
            .get(seq_id as usize)
            .ok_or(GapError::UnknownSequence { seq_id, count })?;
        let word = self.params.word_size as i64;
        if build_pos < 0 || build_pos > length as i64 - word {
            return Err(GapError::BuildPosition {
                seq_id,
                position: build_pos,
                length,
            });
        }

        let id = self.allocate();
        let bucket = self
            .buckets
            .bucket(seq_id, build_pos + word - 1, self.position + word - 1);
        let next = self.buckets.head(&self.regions, bucket).unwrap_or(id);
        self.regions[id].initialize(
            seq_id,
            build_pos,
            self.position,
            self.params.word_size,
            &self.buckets,
            next,
            self.query.frame.is_reverse(),
        )?;
        self.buckets.append(&mut self.regions, id);

        let column = self.position as usize % self.columns.len();
        self.columns[column].push(id);
        self.query_stats.hits += 1;
        self.state = OutputState::Hit;
        Ok(())
    }

    fn do_end_query(&mut self) -> Result<(), GapError> {
        self.require_state("end_query", &[OutputState::Query])?;
        self.flush_through(self.position)?;
        let q = self.query_stats;
        log::debug!(
            "Query {} frame {}: {} hits, {} merges, {} written, {} filtered",
            self.query.query_id,
            self.query.frame,
            q.hits,
            q.merges,
            q.written,
            q.filtered
        );
        self.stats += q;
        self.query_stats = OutputStats::default();
        self.state = OutputState::Sequence;
        Ok(())
    }

    /// Flush every pending column at or before `limit`.
    fn flush_through(&mut self, limit: i64) -> Result<(), GapError> {
        let upto = limit.min(self.position);
        let mut p = self.flushed_through + 1;
        while p <= upto {
            self.flush_column(p)?;
            p += 1;
        }
        if limit > self.flushed_through {
            self.flushed_through = limit;
        }
        Ok(())
    }

    fn flush_column(&mut self, position: i64) -> Result<(), GapError> {
        let column = position as usize % self.columns.len();
        let mut pending = std::mem::take(&mut self.columns[column]);
        if !pending.is_empty() {
            log::trace!(
                "Flushing {} regions from position {}",
                pending.len(),
                position
            );
        }
        for &id in &pending {
            self.flush_region(id)?;
        }
        pending.clear();
        self.columns[column] = pending;
        Ok(())
    }

    /// Partner `id` should merge into, if the match is reciprocal and untied.
    fn reciprocal_partner(&self, id: RegionId) -> Option<RegionId> {
        let mut finder = MatchFinder::new(&self.regions, &self.buckets, self.scorer.as_ref());
        let forward = finder.best_match(id, true)?;
        if ambiguous(&forward) {
            log::trace!(
                "Region {} has tied partners at score {}",
                id,
                forward.score
            );
            return None;
        }
        let backward = finder.best_match(forward.id, false)?;
        if backward.id != id || ambiguous(&backward) {
            return None;
        }
        Some(forward.id)
    }

    fn flush_region(&mut self, id: RegionId) -> Result<(), GapError> {
        let bucket = self.regions[id].core().bucket();
        let head = self.buckets.head(&self.regions, bucket);
        if head != Some(id) {
            return Err(GapError::CorruptChain {
                bucket,
                expected: id,
                found: head,
            });
        }

        let partner = self.reciprocal_partner(id);
        self.buckets.unlink_head(&mut self.regions, bucket, id)?;

        match partner {
            Some(target) => {
                let that = self.regions[id];
                self.regions[target].merge(&that, self.scorer.as_ref())?;
                self.query_stats.merges += 1;
                log::trace!(
                    "Merged {} into {}",
                    that.core(),
                    self.regions[target].core()
                );
            }
            None => self.emit(id)?,
        }

        self.regions[id].write()?;
        self.regions[id].reset()?;
        self.free.push(id);
        Ok(())
    }

    fn emit(&mut self, id: RegionId) -> Result<(), GapError> {
        let seq_id = self.regions[id].core().seq_id();
        let build_length = self.build_lengths[seq_id as usize];
        let surrogate = self.regions[id].surrogate(
            &mut self.surrogate,
            &self.query,
            build_length,
            self.scorer.as_ref(),
        );
        if surrogate.score_allowed() {
            self.sink.write(surrogate)?;
            self.query_stats.written += 1;
        } else {
            log::trace!(
                "Region {} filtered: penalty {:?} above threshold {:?}",
                id,
                surrogate.penalty,
                surrogate.threshold
            );
            self.query_stats.filtered += 1;
        }
        Ok(())
    }
}

/// A tie at a non-perfect score leaves no unique best partner.
#[inline]
fn ambiguous(m: &Match) -> bool {
    m.tied && m.score != 0.0
}

impl<R: Region, S: OutputSink + 'static> PositionOutput for GappedOutput<R, S> {
    fn next_sequence(&mut self, query_id: u32, query_length: u32) -> Result<(), GapError> {
        self.checked(|o| {
            o.require_state("next_sequence", &[OutputState::Idle])?;
            o.query.query_id = query_id;
            o.query.query_length = query_length;
            o.state = OutputState::Sequence;
            Ok(())
        })
    }

    fn next_query(&mut self, frame: Frame, query_effective_length: u32) -> Result<(), GapError> {
        self.checked(|o| {
            o.require_state("next_query", &[OutputState::Sequence])?;
            o.query.frame = frame;
            o.query.query_effective_length = query_effective_length;
            o.position = -1;
            o.flushed_through = -1;
            o.state = OutputState::Query;
            Ok(())
        })
    }

    fn set_position(&mut self, position: i64) -> Result<(), GapError> {
        self.checked(|o| o.do_set_position(position))
    }

    fn hit(&mut self, seq_id: u32, build_pos: i64) -> Result<(), GapError> {
        self.checked(|o| o.do_hit(seq_id, build_pos))
    }

    fn end_position(&mut self) -> Result<(), GapError> {
        self.checked(|o| {
            o.require_state("end_position", &[OutputState::Position, OutputState::Hit])?;
            o.state = OutputState::Query;
            Ok(())
        })
    }

    fn end_query(&mut self) -> Result<(), GapError> {
        self.checked(|o| o.do_end_query())
    }

    fn end_query_sequence(&mut self) -> Result<(), GapError> {
        self.checked(|o| {
            o.require_state("end_query_sequence", &[OutputState::Sequence])?;
            o.sink.end_query(o.query.query_id)?;
            o.state = OutputState::Idle;
            Ok(())
        })
    }

    fn end_all(&mut self) -> Result<(), GapError> {
        self.checked(|o| {
            o.require_state("end_all", &[OutputState::Idle])?;
            o.scorer.close();
            o.sink.end_all()?;
            log::debug!(
                "GappedOutput<{}> finished: {} hits, {} merges, {} written, {} filtered, {} region slots",
                R::KIND,
                o.stats.hits,
                o.stats.merges,
                o.stats.written,
                o.stats.filtered,
                o.regions.len()
            );
            o.state = OutputState::Done;
            Ok(())
        })
    }

    fn stats(&self) -> OutputStats {
        let mut total = self.stats;
        total += self.query_stats;
        total
    }

    fn reverse_clone(&self, sink: Box<dyn OutputSink>) -> Box<dyn PositionOutput> {
        Box::new(self.reverse_clone_with(sink))
    }
}
