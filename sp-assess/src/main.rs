//! Assessment of selenoprofiles predictions against a genome annotation
//!
//! In short, predictions and reference transcripts are reduced to their
//! coding intervals, phased, and joined on genomic overlap. Each
//! (prediction, reference transcript) pair receives one label out of a
//! fixed taxonomy [Well annotated, Out of frame, Spliced, Stop codon,
//! Skipped, Upstream, Downstream, Missing, Other], and per prediction the
//! best label survives into the aggregate table.

use clap::{self, Parser};
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use sp_assess::cli::Args;
use sp_assess::core::assess;

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();
    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap();

    assess(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
