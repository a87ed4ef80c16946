use clap::{ArgAction, Parser};
use config::{validate, ArgCheck, CliError, LINEAGE_SUFFIX};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "sp-lineage: exclude predictions not expected in a species' lineage")]
pub struct Args {
    #[arg(
        short = 'i',
        long = "input",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Family .orthology.tsv file(s) produced by sp-orthology, delimited by comma"
    )]
    pub input: Vec<PathBuf>,

    #[arg(
        short = 'e',
        long = "expectation",
        required = true,
        value_name = "PATH",
        help = "Expectation table: a Lineage column plus one count column per subfamily [csv]"
    )]
    pub expectation: PathBuf,

    #[arg(
        short = 'm',
        long = "map",
        required = true,
        value_name = "PATH",
        help = "Species-to-lineage table [tsv]; values may be full ;-separated lineage strings"
    )]
    pub map: PathBuf,

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
        default_value = LINEAGE_SUFFIX,
        help = "Suffix of the output file"
    )]
    pub suffix: String,

    #[arg(
        long = "all",
        help = "Flag to keep selenoprotein homologs, not only selenocysteine results",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub all: bool,

    #[arg(
        short = 'l',
        long = "lineage",
        help = "Flag to include the lineage column in the output",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub lineage: bool,

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
        Args::parse_from(std::iter::once("sp-lineage".to_string()).chain(args))
    }
}

impl ArgCheck for Args {
    fn validate_args(&self) -> Result<(), CliError> {
        if self.input.is_empty() {
            let err = "No input files provided".to_string();
            return Err(CliError::InvalidInput(err));
        }

        for file in &self.input {
            validate(file, &["tsv"])?;
        }
        validate(&self.expectation, &["csv"])?;
        validate(&self.map, &[])?;

        Ok(())
    }

    fn get_inputs(&self) -> Vec<&PathBuf> {
        self.input.iter().collect()
    }
}
