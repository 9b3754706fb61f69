//! Fatal error conditions for the gapped merge engine.
//!
//! Everything here is an upstream-contract or internal-invariant violation.
//! Disallowed gaps are not errors; scorers report them as negative infinity.

use thiserror::Error;

use crate::region::{RegionId, RegionState};

#[derive(Error, Debug)]
pub enum GapError {
    #[error("Protocol violation: {call} called in state {state}")]
    Protocol {
        call: &'static str,
        state: &'static str,
    },

    #[error("Position {position} does not follow previous position {previous}")]
    PositionOrder { previous: i64, position: i64 },

    #[error("Query position {position} leaves no room for a {word_size}-long word in query of length {length}")]
    QueryPosition {
        position: i64,
        word_size: u32,
        length: u32,
    },

    #[error("Hit references unknown build sequence {seq_id} ({count} sequences)")]
    UnknownSequence { seq_id: u32, count: usize },

    #[error("Build position {position} outside sequence {seq_id} of length {length}")]
    BuildPosition {
        seq_id: u32,
        position: i64,
        length: u32,
    },

    #[error("Region {id}: {operation} not allowed in state {state:?}: {reason}")]
    Invariant {
        id: RegionId,
        operation: &'static str,
        state: RegionState,
        reason: String,
    },

    #[error("Bucket {bucket} chain corrupt: expected head {expected}, found {found:?}")]
    CorruptChain {
        bucket: usize,
        expected: RegionId,
        found: Option<RegionId>,
    },

    #[error("Output is unusable after an earlier fatal error")]
    Poisoned,

    #[error("Output sink failed: {0}")]
    Sink(#[from] std::io::Error),

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl GapError {
    pub(crate) fn invariant(
        id: RegionId,
        operation: &'static str,
        state: RegionState,
        reason: impl Into<String>,
    ) -> Self {
        GapError::Invariant {
            id,
            operation,
            state,
            reason: reason.into(),
        }
    }
}
