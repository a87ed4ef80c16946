//! Assessment of selenoprofiles predictions against a genome annotation
//!
//! This module compares the genomic intervals of predicted selenoprotein
//! genes with the coding intervals of a reference annotation. Each
//! prediction is classified against every overlapping reference transcript
//! by strand agreement, reading-frame register and the placement of its
//! selenocysteine codon, and the classifications are then collapsed to a
//! single best label per prediction.

use anyhow::Result;

pub mod cli;
pub mod core;
pub mod utils;

pub fn lib_sp_assess(args: Vec<String>) -> Result<()> {
    let args = cli::Args::from(args);
    core::assess(args)
}
