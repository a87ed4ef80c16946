//! Joining of per-target selenoprofiles alignment results
//!
//! Collects the .ali files produced by separate selenoprofiles runs,
//! rewrites result titles so predictions from different targets stay
//! distinguishable, and merges them into a single alignment per family.

use anyhow::Result;
use std::path::PathBuf;

pub mod cli;
pub mod core;
pub mod utils;

pub fn lib_sp_join(args: Vec<String>) -> Result<Vec<PathBuf>> {
    let args = cli::Args::from(args);
    core::join_alignments(args)
}
