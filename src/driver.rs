//! Hit files and event replay.
//!
//! The command-line tool reads word hits from a text file instead of a live
//! index. Each non-comment line of the hit file holds
//!
//! ```text
//! query_id  query_length  frame  query_pos  seq_id  build_pos
//! ```
//!
//! with `frame` written as `+` or `-`. The build file lists one sequence
//! length per line (optionally preceded by a name); the line's record index
//! is the sequence id. Either file may be gzip-compressed.

use anyhow::{Context, Result, anyhow};
use std::io::BufRead;
use std::path::Path;

use crate::error::GapError;
use crate::output::{Frame, OutputStats, PositionOutput};
use crate::utils;

/// One word hit from the upstream index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitRecord {
    pub query_id: u32,
    pub query_length: u32,
    pub frame: Frame,
    pub query_pos: i64,
    pub seq_id: u32,
    pub build_pos: i64,
}

impl HitRecord {
    /// Parse one whitespace-delimited hit line.
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(anyhow!("Expected 6 fields, found {}", fields.len()));
        }
        Ok(HitRecord {
            query_id: fields[0]
                .parse()
                .map_err(|_| anyhow!("Invalid query id: {}", fields[0]))?,
            query_length: fields[1]
                .parse()
                .map_err(|_| anyhow!("Invalid query length: {}", fields[1]))?,
            frame: fields[2].parse::<Frame>().map_err(|e| anyhow!(e))?,
            query_pos: fields[3]
                .parse()
                .map_err(|_| anyhow!("Invalid query position: {}", fields[3]))?,
            seq_id: fields[4]
                .parse()
                .map_err(|_| anyhow!("Invalid sequence id: {}", fields[4]))?,
            build_pos: fields[5]
                .parse()
                .map_err(|_| anyhow!("Invalid build position: {}", fields[5]))?,
        })
    }

    #[inline]
    fn sort_key(&self) -> (u32, i64, u32, i64) {
        (self.query_id, self.query_pos, self.seq_id, self.build_pos)
    }
}

fn is_skipped(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

pub fn parse_build_lengths<R: BufRead>(reader: R) -> Result<Vec<u32>> {
    let mut lengths = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Error reading line {}", lineno + 1))?;
        if is_skipped(&line) {
            continue;
        }
        let field = line
            .split_whitespace()
            .last()
            .ok_or_else(|| anyhow!("Line {}: missing length", lineno + 1))?;
        let length: u32 = field
            .parse()
            .map_err(|_| anyhow!("Line {}: invalid sequence length '{}'", lineno + 1, field))?;
        lengths.push(length);
    }
    Ok(lengths)
}

pub fn parse_hits<R: BufRead>(reader: R) -> Result<Vec<HitRecord>> {
    let mut hits = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Error reading line {}", lineno + 1))?;
        if is_skipped(&line) {
            continue;
        }
        let hit = HitRecord::parse(&line).with_context(|| format!("Line {}", lineno + 1))?;
        hits.push(hit);
    }
    Ok(hits)
}

pub fn read_build_lengths(path: &Path) -> Result<Vec<u32>> {
    let reader = utils::xzopen(path)
        .with_context(|| format!("Error opening build lengths {}", path.display()))?;
    let lengths = parse_build_lengths(reader)
        .with_context(|| format!("Error parsing build lengths {}", path.display()))?;
    log::info!(
        "Read {} build sequences ({} bp) from {}",
        lengths.len(),
        lengths.iter().map(|&l| l as u64).sum::<u64>(),
        path.display()
    );
    Ok(lengths)
}

pub fn read_hits(path: &Path) -> Result<Vec<HitRecord>> {
    let reader =
        utils::xzopen(path).with_context(|| format!("Error opening hits {}", path.display()))?;
    let hits =
        parse_hits(reader).with_context(|| format!("Error parsing hits {}", path.display()))?;
    log::info!("Read {} hits from {}", hits.len(), path.display());
    Ok(hits)
}

/// Split hits by frame, each half sorted into replay order.
pub fn split_frames(hits: Vec<HitRecord>) -> (Vec<HitRecord>, Vec<HitRecord>) {
    let (mut forward, mut reverse): (Vec<_>, Vec<_>) =
        hits.into_iter().partition(|h| h.frame == Frame::Forward);
    forward.sort_by_key(HitRecord::sort_key);
    reverse.sort_by_key(HitRecord::sort_key);
    (forward, reverse)
}

/// Drive `output` through the full event grammar for hits of one frame.
///
/// `hits` must be sorted by query id then query position. Ends with
/// `end_all` and returns the output's statistics.
pub fn replay(output: &mut dyn PositionOutput, hits: &[HitRecord]) -> Result<OutputStats, GapError> {
    let mut i = 0;
    while i < hits.len() {
        let first = hits[i];
        output.next_sequence(first.query_id, first.query_length)?;
        output.next_query(first.frame, first.query_length)?;

        while i < hits.len() && hits[i].query_id == first.query_id {
            let pos = hits[i].query_pos;
            output.set_position(pos)?;
            while i < hits.len() && hits[i].query_id == first.query_id && hits[i].query_pos == pos
            {
                output.hit(hits[i].seq_id, hits[i].build_pos)?;
                i += 1;
            }
            output.end_position()?;
        }

        output.end_query()?;
        output.end_query_sequence()?;
    }
    output.end_all()?;
    Ok(output.stats())
}
