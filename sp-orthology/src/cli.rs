use clap::{Parser, ValueEnum};
use config::{ArgCheck, ORTHOLOGY_SUFFIX};
use std::path::PathBuf;

/// how gap columns count when comparing two aligned sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GapMode {
    /// gaps count as ordinary symbols
    #[value(name = "y")]
    Yes,
    /// columns with a gap in either sequence are skipped
    #[value(name = "n")]
    No,
    /// like y, but terminal gaps of the candidate are skipped
    #[value(name = "t")]
    Trim,
    /// columns with a gap never match
    #[value(name = "a")]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Metric {
    /// plain mean sequence identity
    #[value(name = "i")]
    Identity,
    /// column-weighted sequence identity (AWSI)
    #[value(name = "w")]
    Weighted,
}

/// column weight used by the weighted metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WeightScheme {
    /// frequency of the majority residue
    #[value(name = "m")]
    Majority,
    /// one minus the normalized column entropy
    #[value(name = "i")]
    Information,
    /// sum of squared residue frequencies
    #[value(name = "q")]
    Quadratic,
}

#[derive(Debug, Parser)]
#[command(version, about = "sp-orthology: classify selenoprofiles results into orthologous subfamilies")]
pub struct Args {
    #[arg(
        short = 'i',
        long = "input",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Family .ali file(s) produced by sp-join, delimited by comma"
    )]
    pub input: Vec<PathBuf>,

    #[arg(
        long = "outdir",
        value_name = "PATH",
        default_value = ".",
        help = "Output directory"
    )]
    pub outdir: PathBuf,

    #[arg(
        short = 'o',
        long = "suffix",
        value_name = "SUFFIX",
        default_value = ORTHOLOGY_SUFFIX,
        help = "Suffix of the output file"
    )]
    pub suffix: String,

    #[arg(
        short = 'g',
        long = "gaps",
        value_enum,
        value_name = "MODE",
        default_value = "n",
        help = "How gaps are taken into account when comparing sequences"
    )]
    pub gaps: GapMode,

    #[arg(
        short = 'm',
        long = "metric",
        value_enum,
        value_name = "METRIC",
        default_value = "w",
        help = "Similarity score metric"
    )]
    pub metric: Metric,

    #[arg(
        short = 'w',
        long = "weights",
        value_enum,
        value_name = "SCHEME",
        default_value = "m",
        help = "Per-column weights used by the weighted metric"
    )]
    pub weights: WeightScheme,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl From<Vec<String>> for Args {
    fn from(args: Vec<String>) -> Self {
        Args::parse_from(std::iter::once("sp-orthology".to_string()).chain(args))
    }
}

impl ArgCheck for Args {
    fn extensions(&self) -> &'static [&'static str] {
        &["ali", "fa", "fasta"]
    }

    fn get_inputs(&self) -> Vec<&PathBuf> {
        self.input.iter().collect()
    }
}
