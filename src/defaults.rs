// src/defaults.rs

// Word geometry
pub const WORD_SIZE: u32 = 12;
pub const STEP_SIZE: u32 = 1;

// Gap limits
pub const MAX_GAP: u32 = 10;
pub const MAX_INDEL: u32 = 3;
pub const MAX_QUERY_LENGTH: u32 = 1000;

// Table scorer rates
pub const GAP_EXTEND_PROBABILITY: f64 = 0.1;
pub const INDEL_PROBABILITY: f64 = 0.05;

// Protein scorer constants (BLOSUM62 with BLAST default gap costs)
pub const BLOSUM62_EXPECTED_SCORE: f64 = -0.5209;
pub const BLOSUM62_GAP_OPEN: f64 = 11.0;
pub const BLOSUM62_GAP_EXTEND: f64 = 1.0;

// Other Constants
pub const VERBOSITY: i32 = 3;
