use clap::{Parser, ValueEnum};
use config::{validate, ArgCheck, CliError, AGGREGATE_TABLE, MULTIPLE_TABLE};
use std::path::PathBuf;

pub const PREDICTION_ID: &str = "transcript_id";
pub const REFERENCE_ID: &str = "ID";

/// how trailing stop codons of reference transcripts are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StopMode {
    /// probe the last 3 spliced bases of each transcript and strip only stop codons
    Auto,
    /// strip the last 3 spliced bases of every transcript
    All,
    /// leave transcripts as they are
    No,
}

#[derive(Debug, Parser)]
#[command(version, about = "sp-assess: compare selenoprofiles predictions against a genome annotation")]
pub struct Args {
    #[arg(
        short = 's',
        long = "predictions",
        required = true,
        value_name = "PATH",
        help = "Path to selenoprofiles GTF/GFF file with predicted genes"
    )]
    pub predictions: PathBuf,

    #[arg(
        short = 'e',
        long = "annotation",
        required = true,
        value_name = "PATH",
        help = "Path to reference genome annotation in GFF3/GTF format"
    )]
    pub annotation: PathBuf,

    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Path to reference genome FASTA file"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        default_value = MULTIPLE_TABLE,
        help = "Per-reference-transcript annotation table"
    )]
    pub output: PathBuf,

    #[arg(
        short = 'a',
        long = "aggregate",
        value_name = "PATH",
        default_value = AGGREGATE_TABLE,
        help = "Aggregate table with one row per prediction"
    )]
    pub aggregate: PathBuf,

    #[arg(
        long = "sp-id",
        value_name = "ATTRIBUTE",
        default_value = PREDICTION_ID,
        help = "Attribute of the predictions file taken as prediction id"
    )]
    pub sp_id: String,

    #[arg(
        long = "genome-id",
        value_name = "ATTRIBUTE",
        default_value = REFERENCE_ID,
        help = "Attribute of the annotation file taken as reference id"
    )]
    pub genome_id: String,

    #[arg(
        long = "stop",
        value_enum,
        value_name = "MODE",
        default_value = "auto",
        help = "Stop-codon handling for reference transcripts"
    )]
    pub stop: StopMode,

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
        Args::parse_from(std::iter::once("sp-assess".to_string()).chain(args))
    }
}

impl ArgCheck for Args {
    fn validate_args(&self) -> Result<(), CliError> {
        validate(&self.predictions, &["gtf", "gff", "gff3"])?;
        validate(&self.annotation, &["gtf", "gff", "gff3"])?;
        validate(&self.fasta, &["fa", "fasta", "fna"])?;

        Ok(())
    }

    fn get_inputs(&self) -> Vec<&PathBuf> {
        vec![&self.predictions, &self.annotation, &self.fasta]
    }
}
