use std::fmt;
use std::str::FromStr;

pub mod fns;

pub use fns::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const MIN_THREADS: usize = 1;
pub const CODON: i64 = 3;
pub const FRAMES: i64 = 3;
pub const ALI_WRAP: usize = 60;

// sentinels for unmatched reference fields
pub const NO_REFERENCE: &str = "-1";
pub const NO_COORD: i64 = -1;

// file names
pub const MULTIPLE_TABLE: &str = "run_multiple.tsv";
pub const AGGREGATE_TABLE: &str = "run_aggregate.tsv";
pub const ORTHOLOGY_SUFFIX: &str = "orthology";
pub const LINEAGE_SUFFIX: &str = "lineage";

// biology
pub const STOP_CODONS: [&str; 3] = ["TGA", "TAA", "TAG"];
pub const GAP: u8 = b'-';

// selenoprofiles result headers carry all of these markers
pub const RESULT_MARKERS: [&str; 4] = ["chromosome:", "target:", "positions:", "strand:"];

/// orientation of a genomic interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl FromStr for Strand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Err(format!("ERROR: invalid strand -> {}", s)),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}
