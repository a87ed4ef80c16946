//! Subfamily classification of selenoprofiles results
//!
//! Scores each predicted sequence of a joined family alignment against the
//! profile's anchor (SEED) sequences, one score per subfamily, and assigns
//! the best-scoring subfamily.

use anyhow::Result;
use std::path::PathBuf;

pub mod cli;
pub mod core;
pub mod utils;

pub fn lib_sp_orthology(args: Vec<String>) -> Result<Vec<PathBuf>> {
    let args = cli::Args::from(args);
    core::classify_orthology(args)
}
