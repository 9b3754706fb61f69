//! Detached snapshots of finalised regions.
//!
//! A region slot is recycled as soon as it is written, so sinks never see
//! the slot itself. They receive a [`Surrogate`] holding a copy of the
//! coordinates and score. One instance is overwritten in place for every
//! region an output writes.

use std::io::{self, Write};

use crate::output::Frame;

/// Per-query values every surrogate needs
#[derive(Debug, Clone, Copy)]
pub struct QueryContext {
    pub query_id: u32,
    pub frame: Frame,
    pub query_length: u32,
    /// Length in the frame's own units (equal to `query_length` for untranslated queries)
    pub query_effective_length: u32,
    /// Maximum penalty allowed through; None disables filtering
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surrogate {
    pub query_id: u32,
    pub frame: Frame,
    pub query_length: u32,
    pub query_effective_length: u32,
    pub seq_id: u32,
    pub build_start: i64,
    pub build_end: i64,
    pub query_start: i64,
    pub query_end: i64,
    pub reverse_frame: bool,
    /// Negated corrected score; only set for scored regions
    pub penalty: Option<f64>,
    pub threshold: Option<f64>,
}

impl Surrogate {
    /// Score in the scorer's convention (bigger is better), if scored.
    pub fn score(&self) -> Option<f64> {
        self.penalty.map(|p| if p == 0.0 { 0.0 } else { -p })
    }

    /// True when no threshold applies or the penalty is within it.
    pub fn score_allowed(&self) -> bool {
        match (self.penalty, self.threshold) {
            (Some(p), Some(t)) => p <= t,
            _ => true,
        }
    }

    /// Build span length
    pub fn build_length(&self) -> i64 {
        self.build_end - self.build_start + 1
    }

    /// Query span length
    pub fn query_length_covered(&self) -> i64 {
        self.query_end - self.query_start + 1
    }

    /// Tab-delimited record:
    /// query_id, frame, seq_id, build_start, build_end, query_start, query_end, penalty
    pub fn write_tsv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t",
            self.query_id,
            self.frame,
            self.seq_id,
            self.build_start,
            self.build_end,
            self.query_start,
            self.query_end
        )?;
        match self.penalty {
            Some(p) => writeln!(out, "{:.3}", p),
            None => writeln!(out, "*"),
        }
    }
}
