//! Position-ordered hit consumers.
//!
//! Upstream drives an output with a strict event grammar, one query
//! sequence and frame at a time:
//!
//! ```text
//! (next_sequence (next_query (set_position hit* end_position)* end_query)* end_query_sequence)* end_all
//! ```
//!
//! Positions strictly increase within a query frame. Any call out of order
//! is fatal and poisons the output.
//!
//! # Module Organization
//!
//! - `gapped` - orchestrator merging hits on shared diagonals
//! - `matcher` - best-partner search over bucket windows
//! - `sink` - destinations for finalised regions

mod gapped;
mod matcher;
mod sink;

pub use gapped::GappedOutput;
pub use matcher::{Match, MatchFinder, join_score};
pub use sink::{ChannelSink, CollectingSink, OutputSink, SinkMessage, TsvSink, drain_to};

use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::GapError;
use crate::gap_opt::GapOpt;
use crate::region::{PlainRegion, ScoredRegion};
use crate::scoring::create_scorer;

/// Strand of the query being scanned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Frame {
    #[default]
    Forward,
    Reverse,
}

impl Frame {
    #[inline]
    pub fn is_reverse(&self) -> bool {
        matches!(self, Frame::Reverse)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Forward => write!(f, "+"),
            Frame::Reverse => write!(f, "-"),
        }
    }
}

impl FromStr for Frame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "F" | "f" => Ok(Frame::Forward),
            "-" | "R" | "r" => Ok(Frame::Reverse),
            _ => Err(format!("Invalid frame '{}': expected '+' or '-'", s)),
        }
    }
}

/// Counters kept by an output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStats {
    pub hits: u64,
    pub merges: u64,
    pub written: u64,
    /// Regions dropped by the score threshold
    pub filtered: u64,
}

impl AddAssign for OutputStats {
    fn add_assign(&mut self, other: OutputStats) {
        self.hits += other.hits;
        self.merges += other.merges;
        self.written += other.written;
        self.filtered += other.filtered;
    }
}

/// Consumer of the hit event grammar.
pub trait PositionOutput: Send {
    fn next_sequence(&mut self, query_id: u32, query_length: u32) -> Result<(), GapError>;

    fn next_query(&mut self, frame: Frame, query_effective_length: u32) -> Result<(), GapError>;

    fn set_position(&mut self, position: i64) -> Result<(), GapError>;

    /// Word hit at the current query position.
    fn hit(&mut self, seq_id: u32, build_pos: i64) -> Result<(), GapError>;

    fn end_position(&mut self) -> Result<(), GapError>;

    fn end_query(&mut self) -> Result<(), GapError>;

    fn end_query_sequence(&mut self) -> Result<(), GapError>;

    fn end_all(&mut self) -> Result<(), GapError>;

    fn stats(&self) -> OutputStats;

    /// Independent output for another frame, sharing only read-only state.
    fn reverse_clone(&self, sink: Box<dyn OutputSink>) -> Box<dyn PositionOutput>;
}

/// Build the output selected by `opt`.
///
/// Uses the scored region variant when a score threshold is set, plain
/// regions otherwise.
pub fn create_output<S: OutputSink + 'static>(
    opt: &GapOpt,
    build_lengths: &[u32],
    sink: S,
) -> Result<Box<dyn PositionOutput>, GapError> {
    opt.validate().map_err(|errors| GapError::Config {
        reason: errors.join("; "),
    })?;
    let scorer = create_scorer(&opt.scorer_params())?;
    let lengths: Arc<[u32]> = Arc::from(build_lengths);
    let params = opt.merge_params();

    let output: Box<dyn PositionOutput> = if opt.score_threshold.is_some() {
        log::debug!(
            "Gapped output with scored regions, threshold {:?}",
            opt.score_threshold
        );
        Box::new(GappedOutput::<ScoredRegion, S>::new(
            params, scorer, lengths, sink,
        ))
    } else {
        log::debug!("Gapped output with plain regions");
        Box::new(GappedOutput::<PlainRegion, S>::new(
            params, scorer, lengths, sink,
        ))
    };
    Ok(output)
}
