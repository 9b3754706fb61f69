use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::defaults;

// src/gap_opt.rs
//
// Options for gapped merging of word hits

/// Which gap scoring model to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScorerKind {
    /// Minimum substitution count from word/step geometry
    WordSize,
    /// Precomputed log-probability table
    Table,
    /// Protein substitution matrix heuristic
    Protein,
}

impl ScorerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScorerKind::WordSize => "word-size",
            ScorerKind::Table => "table",
            ScorerKind::Protein => "protein",
        }
    }
}

/// Options controlling gapped merging
#[derive(Debug, Clone)]
pub struct GapOpt {
    // Word geometry
    pub word_size: u32, // Length of a word hit
    pub step_size: u32, // Build sampling step

    // Gap limits
    pub max_gap: u32,          // Largest gap (either axis) that may be bridged
    pub max_indel: u32,        // Largest build/query length difference inside a gap
    pub max_query_length: u32, // Per-sequence diagonal slack in the bucket index

    // Scoring
    pub scorer: ScorerKind,
    pub score_threshold: Option<f64>, // Maximum penalty written; None disables filtering
    pub gap_extend_probability: f64,  // Table scorer: per-position probability inside a gap
    pub indel_probability: f64,       // Table scorer: per-unit probability of length mismatch

    pub verbosity: i32, // 1=error, 2=warning, 3=message, 4=debug, 5+=trace
}

/// Parameters for the merge orchestrator
#[derive(Debug, Clone, Copy)]
pub struct MergeParams {
    pub word_size: u32,
    pub max_gap: u32,
    pub max_query_length: u32,
    pub score_threshold: Option<f64>,
}

impl MergeParams {
    /// Number of query positions a region stays mergeable after creation.
    pub fn mergeable_lag(&self) -> u32 {
        self.word_size + self.max_gap
    }
}

/// Parameters for building a gap scorer
#[derive(Debug, Clone, Copy)]
pub struct ScorerParams {
    pub kind: ScorerKind,
    pub word_size: u32,
    pub step_size: u32,
    pub max_gap: u32,
    pub max_indel: u32,
    pub gap_extend_probability: f64,
    pub indel_probability: f64,
}

/// Command-line options for the merge subcommand
#[derive(Debug, Clone, Args)]
pub struct MergeCliOptions {
    /// Build sequence lengths, one per line (line number is the sequence id)
    #[arg(short = 'b', long, value_name = "FILE")]
    pub builds: PathBuf,

    /// Word hits: query_id query_length frame query_pos seq_id build_pos
    #[arg(short = 'i', long, value_name = "FILE")]
    pub hits: PathBuf,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    // ===== Word Options =====
    /// Word size used by the index
    #[arg(short = 'w', long, value_name = "INT", default_value_t = defaults::WORD_SIZE)]
    pub word_size: u32,

    /// Step size the build was sampled with
    #[arg(short = 's', long, value_name = "INT", default_value_t = defaults::STEP_SIZE)]
    pub step_size: u32,

    // ===== Gap Options =====
    /// Maximum gap between merged hits
    #[arg(short = 'g', long, value_name = "INT", default_value_t = defaults::MAX_GAP)]
    pub max_gap: u32,

    /// Maximum insertion/deletion inside a gap
    #[arg(short = 'e', long, value_name = "INT", default_value_t = defaults::MAX_INDEL)]
    pub max_indel: u32,

    /// Longest expected query, used to size the diagonal index
    #[arg(long, value_name = "INT", default_value_t = defaults::MAX_QUERY_LENGTH)]
    pub max_query_length: u32,

    // ===== Scoring Options =====
    /// Gap scoring model
    #[arg(long, value_enum, default_value_t = ScorerKind::WordSize)]
    pub scorer: ScorerKind,

    /// Only write regions whose penalty is at most FLOAT
    #[arg(short = 'T', long, value_name = "FLOAT")]
    pub score_threshold: Option<f64>,

    /// Table scorer: probability of extending a gap by one position
    #[arg(long, value_name = "FLOAT", default_value_t = defaults::GAP_EXTEND_PROBABILITY)]
    pub gap_extend_probability: f64,

    /// Table scorer: probability of each unit of insertion/deletion
    #[arg(long, value_name = "FLOAT", default_value_t = defaults::INDEL_PROBABILITY)]
    pub indel_probability: f64,

    // ===== Processing Options =====
    /// Verbose level: 1=error, 2=warning, 3=message, 4=debug, 5+=trace
    #[arg(short = 'v', long, value_name = "INT", default_value_t = defaults::VERBOSITY)]
    pub verbosity: i32,

    /// Number of threads (default: all available cores)
    #[arg(short = 't', long, value_name = "INT")]
    pub threads: Option<usize>,
}

impl Default for GapOpt {
    fn default() -> Self {
        GapOpt {
            word_size: defaults::WORD_SIZE,
            step_size: defaults::STEP_SIZE,
            max_gap: defaults::MAX_GAP,
            max_indel: defaults::MAX_INDEL,
            max_query_length: defaults::MAX_QUERY_LENGTH,
            scorer: ScorerKind::WordSize,
            score_threshold: None,
            gap_extend_probability: defaults::GAP_EXTEND_PROBABILITY,
            indel_probability: defaults::INDEL_PROBABILITY,
            verbosity: defaults::VERBOSITY,
        }
    }
}

impl GapOpt {
    /// Build options from parsed command-line arguments
    pub fn from_cli(cli: &MergeCliOptions) -> Self {
        GapOpt {
            word_size: cli.word_size,
            step_size: cli.step_size,
            max_gap: cli.max_gap,
            max_indel: cli.max_indel,
            max_query_length: cli.max_query_length,
            scorer: cli.scorer,
            score_threshold: cli.score_threshold,
            gap_extend_probability: cli.gap_extend_probability,
            indel_probability: cli.indel_probability,
            verbosity: cli.verbosity,
        }
    }

    /// Get orchestrator parameters as a bundle
    pub fn merge_params(&self) -> MergeParams {
        MergeParams {
            word_size: self.word_size,
            max_gap: self.max_gap,
            max_query_length: self.max_query_length,
            score_threshold: self.score_threshold,
        }
    }

    /// Get scorer parameters as a bundle
    pub fn scorer_params(&self) -> ScorerParams {
        ScorerParams {
            kind: self.scorer,
            word_size: self.word_size,
            step_size: self.step_size,
            max_gap: self.max_gap,
            max_indel: self.max_indel,
            gap_extend_probability: self.gap_extend_probability,
            indel_probability: self.indel_probability,
        }
    }

    /// Validate parameters for consistency
    /// Returns Ok(()) if valid, or Err with description of issues
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.word_size < 1 {
            errors.push(format!("word_size must be >= 1, got {}", self.word_size));
        }
        if self.step_size < 1 || self.step_size > self.word_size {
            errors.push(format!(
                "step_size must be in [1, word_size={}], got {}",
                self.word_size, self.step_size
            ));
        }
        if self.max_indel > self.max_gap {
            errors.push(format!(
                "max_indel ({}) must not exceed max_gap ({})",
                self.max_indel, self.max_gap
            ));
        }
        if self.max_query_length < 1 {
            errors.push(format!(
                "max_query_length must be >= 1, got {}",
                self.max_query_length
            ));
        }
        if !(self.gap_extend_probability > 0.0 && self.gap_extend_probability < 1.0) {
            errors.push(format!(
                "gap_extend_probability must be in (0, 1), got {}",
                self.gap_extend_probability
            ));
        }
        if !(self.indel_probability > 0.0 && self.indel_probability < 1.0) {
            errors.push(format!(
                "indel_probability must be in (0, 1), got {}",
                self.indel_probability
            ));
        }
        if let Some(t) = self.score_threshold {
            if !(t >= 0.0) {
                errors.push(format!("score_threshold must be >= 0, got {}", t));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
