use indicatif::{ProgressBar, ProgressStyle};
use num_traits::{Num, NumCast};
use thiserror::Error;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// write a delimited table with a header row
pub fn write_table(path: &PathBuf, header: &str, rows: &[String]) -> Result<(), CliError> {
    log::info!("Rows in {}: {}. Writing...", path.display(), rows.len());
    let f = File::create(path)?;
    let mut writer = BufWriter::new(f);

    writeln!(writer, "{}", header)?;
    for line in rows {
        writeln!(writer, "{}", line)?;
    }

    Ok(())
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        if self.get_inputs().is_empty() {
            let err = "No input files provided".to_string();
            return Err(CliError::InvalidInput(err));
        }
        for file in self.get_inputs() {
            validate(file, self.extensions())?;
        }

        Ok(())
    }

    /// accepted input extensions; empty means any
    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn get_inputs(&self) -> Vec<&PathBuf>;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation
pub fn validate(arg: &PathBuf, extensions: &'static [&'static str]) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a file",
            arg
        )));
    }

    if !extensions.is_empty() {
        let name = arg.to_string_lossy();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if !extensions.iter().any(|ext| name.ends_with(ext)) {
            return Err(CliError::InvalidInput(format!(
                "ERROR: file {:?} is not any of {:?}",
                arg, extensions
            )));
        }
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}

// quality of life improvement fns
#[inline(always)]
pub fn interval_overlap<N>(a: &(N, N), b: &(N, N)) -> N
where
    N: Num + NumCast + Copy + PartialOrd,
{
    let lo = if a.0 > b.0 { a.0 } else { b.0 };
    let hi = if a.1 < b.1 { a.1 } else { b.1 };

    if hi > lo {
        hi - lo
    } else {
        N::zero()
    }
}
