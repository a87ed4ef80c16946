use clap::{ArgAction, Parser};
use config::{validate, ArgCheck, CliError};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "sp-join: collect per-target alignment results into one file per family")]
pub struct Args {
    #[arg(
        short = 'i',
        long = "input",
        required = false,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Paths to .ali file(s) produced per target, delimited by comma"
    )]
    pub input: Vec<PathBuf>,

    #[arg(
        short = 'd',
        long = "dir",
        required = false,
        value_name = "PATH",
        help = "Directory scanned recursively for .ali files"
    )]
    pub dir: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "PATH",
        default_value = ".",
        help = "Output directory for the joined .ali files"
    )]
    pub outdir: PathBuf,

    #[arg(
        short = 'u',
        long = "unaligned",
        help = "Flag to degap sequences instead of merging alignment columns",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub unaligned: bool,

    #[arg(
        long = "no-shrink",
        help = "Flag to keep gap-only columns after merging",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub no_shrink: bool,

    #[arg(
        long = "keep-ids",
        help = "Flag to keep result ids as they are, without species/target tags",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub keep_ids: bool,

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
        Args::parse_from(std::iter::once("sp-join".to_string()).chain(args))
    }
}

impl ArgCheck for Args {
    fn validate_args(&self) -> Result<(), CliError> {
        if self.input.is_empty() && self.dir.is_none() {
            let err = "No input files provided; use -i and/or -d".to_string();
            return Err(CliError::InvalidInput(err));
        }

        for file in &self.input {
            validate(file, &["ali", "fa", "fasta"])?;
        }

        if let Some(dir) = &self.dir {
            if !dir.is_dir() {
                return Err(CliError::InvalidInput(format!(
                    "ERROR: {:?} is not a directory",
                    dir
                )));
            }
        }

        Ok(())
    }

    fn get_inputs(&self) -> Vec<&PathBuf> {
        self.input.iter().collect()
    }
}
