//! Joining of per-target selenoprofiles alignment results
//!
//! This tool looks for .ali files, which are normally produced by
//! selenoprofiles runs on individual targets, and joins them into a single
//! file per profile family. Result titles are tagged with species and
//! target so they stay unique across targets.

use clap::{self, Parser};
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use sp_join::cli::Args;
use sp_join::core::join_alignments;

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

    join_alignments(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
