pub mod buckets; // Circular diagonal index and bucket chains
pub mod defaults;
pub mod driver; // Hit files and event replay for the CLI
pub mod error;
pub mod gap_opt;
pub mod output; // Event-driven gapped merge orchestrator and sinks
pub mod region; // Pooled region arena entries and surrogates
pub mod scanner; // Wraparound bucket range scan
pub mod scoring; // Gap scoring models
pub mod utils;

pub use error::GapError;
pub use gap_opt::GapOpt;
pub use output::{Frame, OutputSink, PositionOutput, create_output};
