use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use ferrous_gap::driver;
use ferrous_gap::gap_opt::{GapOpt, MergeCliOptions};
use ferrous_gap::output::{ChannelSink, OutputStats, TsvSink, create_output, drain_to};
use ferrous_gap::utils;

#[derive(Parser)]
#[command(name = "ferrous-gap")]
#[command(about = "FerrousGap - merge word hits on shared diagonals into gapped regions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge word hits into scored gapped regions
    Merge(MergeCliOptions),
}

fn init_logger(verbosity: i32) {
    let level = match verbosity {
        i32::MIN..=1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn configure_threads(requested: Option<usize>) {
    let mut num_threads = requested.unwrap_or_else(num_cpus::get).max(1);

    // Reasonable upper bound to prevent accidental resource exhaustion
    let max_threads = num_cpus::get() * 2;
    if num_threads > max_threads {
        log::warn!(
            "Thread count {} exceeds recommended maximum {}, capping at {}",
            num_threads,
            max_threads,
            max_threads
        );
        num_threads = max_threads;
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(_) => {
            log::debug!(
                "Successfully built global Rayon thread pool with {} threads",
                num_threads
            );
        }
        Err(e) => {
            log::warn!(
                "Failed to configure thread pool: {} (may already be initialized)",
                e
            );
        }
    }
}

fn run_merge(opts: &MergeCliOptions) -> Result<()> {
    let opt = GapOpt::from_cli(opts);
    if let Err(errors) = opt.validate() {
        for e in &errors {
            log::error!("{}", e);
        }
        bail!("Invalid options ({} problems)", errors.len());
    }
    configure_threads(opts.threads);

    let build_lengths = driver::read_build_lengths(&opts.builds)?;
    let hits = driver::read_hits(&opts.hits)?;
    let (forward_hits, reverse_hits) = driver::split_frames(hits);
    log::debug!(
        "{} forward and {} reverse frame hits",
        forward_hits.len(),
        reverse_hits.len()
    );

    let (tx, rx) = crossbeam_channel::unbounded();
    let forward = create_output(&opt, &build_lengths, ChannelSink::new(tx.clone()))?;
    let reverse = forward.reverse_clone(Box::new(ChannelSink::new(tx)));

    let writer = utils::xcreate(opts.output.as_deref()).with_context(|| match &opts.output {
        Some(p) => format!("Error creating output file {}", p.display()),
        None => "Error opening stdout".to_string(),
    })?;
    let mut tsv = TsvSink::new(writer);

    // A failed frame must drop its sender or the writer waits forever
    let ((forward_result, reverse_result), drained) = rayon::join(
        || {
            rayon::join(
                || {
                    let mut output = forward;
                    driver::replay(output.as_mut(), &forward_hits)
                },
                || {
                    let mut output = reverse;
                    driver::replay(output.as_mut(), &reverse_hits)
                },
            )
        },
        || drain_to(&rx, &mut tsv, 2),
    );

    let mut stats = OutputStats::default();
    stats += forward_result.context("Forward frame failed")?;
    stats += reverse_result.context("Reverse frame failed")?;
    let written = drained.context("Error writing regions")?;

    log::info!(
        "Processed {} hits: {} merges, {} regions written, {} filtered",
        stats.hits,
        stats.merges,
        written,
        stats.filtered
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge(opts) => {
            init_logger(opts.verbosity);
            if let Err(e) = run_merge(&opts) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }
}
