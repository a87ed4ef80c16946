//! Subfamily classification of selenoprofiles results
//!
//! This tool takes the .ali files produced by sp-join and classifies each
//! prediction into an orthologous subfamily. A prediction is compared
//! against the anchor (SEED) sequences of every subfamily by weighted
//! sequence identity over the alignment columns; the best-scoring
//! subfamily and its score are reported in a tsv file per family.

use clap::{self, Parser};
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use sp_orthology::cli::Args;
use sp_orthology::core::classify_orthology;

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

    classify_orthology(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
