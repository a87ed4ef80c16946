//! Phylogenetic-expectation filtering of selenoprofiles results
//!
//! This tool takes the .tsv files produced by sp-orthology, ranks each
//! prediction within its (species, subfamily) group, and keeps only as
//! many copies as the species' lineage is expected to carry. Expected
//! subfamilies with no prediction at all are reported as missing.
//! Taxonomy resolution is delegated to a user-provided species-to-lineage
//! table.

use clap::{self, Parser};
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use sp_lineage::cli::Args;
use sp_lineage::core::filter_lineage;

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

    filter_lineage(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
