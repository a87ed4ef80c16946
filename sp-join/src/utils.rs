use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use bio::io::fasta;
use flate2::read::MultiGzDecoder;

use config::{ALI_WRAP, RESULT_MARKERS};

/// one aligned sequence; id and description are kept separate so titles can
/// be rewritten without touching the rest of the header
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

    Ok(records)
}

pub fn write_alignment(path: &Path, records: &[AliRecord]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("ERROR: cannot create {:?}", path))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        match &record.desc {
            Some(desc) => writeln!(writer, ">{} {}", record.id, desc)?,
            None => writeln!(writer, ">{}", record.id)?,
        }
        for chunk in record.seq.chunks(ALI_WRAP) {
            writer.write_all(chunk)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}

/// selenoprofiles result headers carry chromosome/target/positions/strand
pub fn is_result_title(desc: Option<&str>) -> bool {
    match desc {
        Some(desc) => RESULT_MARKERS.iter().all(|marker| desc.contains(marker)),
        None => false,
    }
}

/// pull the species and target attributes out of a result description; the
/// species value may be quoted and span several whitespace-separated tokens
pub fn parse_result_desc(desc: &str) -> (Option<String>, Option<String>, String) {
    let mut species = None;
    let mut target = None;
    let mut rest: Vec<&str> = Vec::new();

    let mut tokens = desc.split_whitespace();
    while let Some(token) = tokens.next() {
        if let Some(value) = token.strip_prefix("species:") {
            if let Some(quoted) = value.strip_prefix('"') {
                let mut value = quoted.to_string();
                while !value.ends_with('"') {
                    match tokens.next() {
                        Some(next) => {
                            value.push(' ');
                            value.push_str(next);
                        }
                        None => break,
                    }
                }
                species = Some(value.trim_end_matches('"').to_string());
            } else {
                species = Some(value.to_string());
            }
        } else {
            if let Some(value) = token.strip_prefix("target:") {
                target = Some(value.to_string());
            }
            rest.push(token);
        }
    }

    (species, target, rest.join(" "))
}

/// file stem of the target path with inner dots flattened to underscores
pub fn target_stem(target: &str) -> String {
    let name = Path::new(target)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let parts = name.split('.').collect::<Vec<_>>();
    if parts.len() > 1 {
        parts[..parts.len() - 1].join("_")
    } else {
        name
    }
}

/// tag a result id with its species and target so results from different
/// targets stay distinguishable after joining
pub fn correct_title(record: &mut AliRecord, path: &Path) -> Result<()> {
    let Some(desc) = record.desc.clone() else {
        return Ok(());
    };
    if !is_result_title(Some(&desc)) {
        return Ok(());
    }

    let (species, target, rest) = parse_result_desc(&desc);
    let species = species.ok_or_else(|| {
        anyhow!(
            "ERROR: missing species attribute in title: {} from file {:?}",
            record.id,
            path
        )
    })?;
    let target = target.unwrap_or_default();

    record.id = format!(
        "{}.{}.{}",
        record.id,
        species.replace(' ', "_"),
        target_stem(&target)
    );
    record.desc = Some(rest);

    Ok(())
}

/// recursively collect .ali files under a directory
pub fn scan_dir(dir: &Path, acc: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("ERROR: cannot read directory {:?}", dir))?
    {
        let path = entry?.path();
        if path.is_dir() {
            scan_dir(&path, acc)?;
        } else if path.extension().is_some_and(|ext| ext == "ali") {
            acc.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_result_title() {
        assert!(is_result_title(Some(
            "chromosome:chr1 strand:+ positions:100-200 species:\"Homo sapiens\" target:/g/hg38.fa"
        )));
        assert!(!is_result_title(Some("profile seed sequence")));
        assert!(!is_result_title(None));
    }

    #[test]
    fn test_parse_result_desc_quoted_species() {
        let (species, target, rest) = parse_result_desc(
            "chromosome:chr1 strand:+ positions:100-200 species:\"Homo sapiens\" target:/g/hg38.fa",
        );

        assert_eq!(species.as_deref(), Some("Homo sapiens"));
        assert_eq!(target.as_deref(), Some("/g/hg38.fa"));
        assert!(!rest.contains("species:"));
        assert!(rest.contains("target:/g/hg38.fa"));
    }

    #[test]
    fn test_target_stem() {
        assert_eq!(target_stem("/data/genomes/hg38.fa"), "hg38");
        assert_eq!(target_stem("my.genome.fa"), "my_genome");
        assert_eq!(target_stem("plain"), "plain");
    }

    #[test]
    fn test_correct_title() {
        let mut record = AliRecord {
            id: "GPx.3.selenocysteine".to_string(),
            desc: Some(
                "chromosome:chr1 strand:+ positions:100-200 species:\"Homo sapiens\" target:/g/hg38.fa"
                    .to_string(),
            ),
            seq: b"MG-W".to_vec(),
        };

        correct_title(&mut record, Path::new("GPx.ali")).unwrap();
        assert_eq!(record.id, "GPx.3.selenocysteine.Homo_sapiens.hg38");
        assert!(!record.desc.as_deref().unwrap().contains("species:"));
    }

    #[test]
    fn test_correct_title_without_species_is_fatal() {
        let mut record = AliRecord {
            id: "GPx.3.selenocysteine".to_string(),
            desc: Some(
                "chromosome:chr1 strand:+ positions:100-200 target:/g/hg38.fa".to_string(),
            ),
            seq: b"MGW".to_vec(),
        };

        assert!(correct_title(&mut record, Path::new("GPx.ali")).is_err());
    }

    #[test]
    fn test_correct_title_leaves_profile_sequences_alone() {
        let mut record = AliRecord {
            id: "GPx.GPX1.SEED.1".to_string(),
            desc: Some("profile sequence".to_string()),
            seq: b"MGW".to_vec(),
        };

        correct_title(&mut record, Path::new("GPx.ali")).unwrap();
        assert_eq!(record.id, "GPx.GPX1.SEED.1");
    }
}
