//! Phylogenetic-expectation filtering of selenoprofiles results
//!
//! Compares the subfamily assignments produced by sp-orthology against a
//! per-lineage expectation table and flags predictions that exceed the
//! expected copy number of their subfamily, as well as expected
//! predictions that were never made.

use anyhow::Result;
use std::path::PathBuf;

pub mod cli;
pub mod core;
pub mod utils;

pub fn lib_sp_lineage(args: Vec<String>) -> Result<Vec<PathBuf>> {
    let args = cli::Args::from(args);
    core::filter_lineage(args)
}
