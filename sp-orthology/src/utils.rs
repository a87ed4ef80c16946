use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use log::warn;

use config::RESULT_MARKERS;

/// one aligned sequence of a family alignment
#[derive(Debug, Clone, PartialEq)]
pub struct AliRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("ERROR: cannot open {:?}", path))?;

    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// read a family alignment; every sequence must share one width
pub fn read_alignment(path: &Path) -> Result<Vec<AliRecord>> {
    let reader = fasta::Reader::new(open_reader(path)?);
    let mut records = Vec::new();

    for record in reader.records() {
        let record =
            record.with_context(|| format!("ERROR: malformed record in {:?}", path))?;
        records.push(AliRecord {
            id: record.id().to_string(),
            desc: record.desc().map(|d| d.to_string()),
            seq: record.seq().to_vec(),
        });
    }

    if records.is_empty() {
        bail!("ERROR: no sequences found in {:?}", path);
    }

    let width = records[0].seq.len();
    if let Some(odd) = records.iter().find(|r| r.seq.len() != width) {
        bail!(
            "ERROR: {} has width {} but {} has width {} in {:?}; input must be aligned",
            records[0].id,
            width,
            odd.id,
            odd.seq.len(),
            path
        );
    }

    Ok(records)
}

/// selenoprofiles result headers carry chromosome/target/positions/strand
pub fn is_result_title(desc: Option<&str>) -> bool {
    match desc {
        Some(desc) => RESULT_MARKERS.iter().all(|marker| desc.contains(marker)),
        None => false,
    }
}

/// species name of a candidate id (family.numericID.label.species.target)
pub fn species_of(id: &str) -> String {
    match id.split('.').nth(3) {
        Some(species) => species.to_string(),
        None => {
            warn!("Candidate {} has no species field", id);
            String::new()
        }
    }
}

/// subfamily of an anchor id (family.subfamily.SEED...)
pub fn subfamily_of(id: &str) -> Option<String> {
    id.split('.').nth(1).map(|s| s.to_string())
}
