use std::path::PathBuf;

use anyhow::Result;
use hashbrown::HashMap;
use log::{info, warn};

use config::write_table;

use crate::cli::Args;
use crate::utils::{
    read_orthology, read_species_map, resolve_lineage, Candidate, ExpectationTable,
};

pub const TABLE_HEADER: &str =
    "Candidate\tSubfamily\tSimilarity\tSpecies\tPass_filter\tDiscard_description";
pub const TABLE_HEADER_LINEAGE: &str =
    "Candidate\tSubfamily\tSimilarity\tSpecies\tLineage\tPass_filter\tDiscard_description";

/// one row of the filtered output; an empty candidate marks an expected but
/// missing prediction
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub candidate: String,
    pub subfamily: String,
    pub similarity: Option<f64>,
    pub species: String,
    pub lineage: String,
    pub pass: bool,
}

impl OutputRow {
    pub fn discard_description(&self) -> &'static str {
        if self.pass {
            ""
        } else if self.candidate.is_empty() {
            "Missing prediction"
        } else {
            "Low similarity score"
        }
    }

    fn to_line(&self, with_lineage: bool) -> String {
        let similarity = self
            .similarity
            .map(|s| format!("{:.4}", s))
            .unwrap_or_default();
        let pass = if self.pass { "True" } else { "False" };

        if with_lineage {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                self.candidate,
                self.subfamily,
                similarity,
                self.species,
                self.lineage,
                pass,
                self.discard_description()
            )
        } else {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                self.candidate,
                self.subfamily,
                similarity,
                self.species,
                pass,
                self.discard_description()
            )
        }
    }
}

pub fn filter_lineage(args: Args) -> Result<Vec<PathBuf>> {
    let expectation = ExpectationTable::from_csv(&args.expectation)?;
    let map = read_species_map(&args.map)?;

    std::fs::create_dir_all(&args.outdir)?;

    let mut outputs = Vec::new();
    for path in &args.input {
        let family = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        let mut candidates = read_orthology(path)?;
        info!("Loaded {}: {} candidates", path.display(), candidates.len());

        if !args.all {
            candidates.retain(|c| c.candidate.contains("selenocysteine"));
        }
        rename_subfamilies(&mut candidates, &family);

        let mut rows = Vec::new();
        for ranked in rank_candidates(candidates) {
            let Some(lineage) = resolve_lineage(&ranked.candidate.species, &map, &expectation)?
            else {
                warn!(
                    "No expectation lineage for {}. Skipping...",
                    ranked.candidate.species
                );
                continue;
            };

            // subfamilies without an expectation column always pass
            let pass = match expectation.get(&lineage, &ranked.candidate.subfamily) {
                Some(expected) => i64::from(expected) > ranked.index_best,
                None => true,
            };

            rows.push(OutputRow {
                candidate: ranked.candidate.candidate,
                subfamily: ranked.candidate.subfamily,
                similarity: Some(ranked.candidate.similarity),
                species: ranked.candidate.species,
                lineage,
                pass,
            });
        }

        let missing = synthesize_missing(&rows, &map, &expectation, &family)?;
        let discarded = rows.iter().chain(&missing).filter(|r| !r.pass).count();
        info!(
            "{}: {} rows pass, {} discarded, {} missing",
            family,
            rows.iter().filter(|r| r.pass).count(),
            discarded,
            missing.len()
        );
        rows.extend(missing);

        let header = if args.lineage {
            TABLE_HEADER_LINEAGE
        } else {
            TABLE_HEADER
        };
        let lines = rows
            .iter()
            .map(|r| r.to_line(args.lineage))
            .collect::<Vec<_>>();

        let outfile = args
            .outdir
            .join(format!("{}.{}.tsv", family, args.suffix.trim_matches('.')));
        info!("--> writing output: {}", outfile.display());
        write_table(&outfile, header, &lines)?;
        outputs.push(outfile);
    }

    Ok(outputs)
}

/// family-specific subfamily merges carried over from the profiles
fn rename_subfamilies(candidates: &mut [Candidate], family: &str) {
    for candidate in candidates.iter_mut() {
        let renamed = match (family, candidate.subfamily.as_str()) {
            ("GPx", "GPX1B") => Some("GPX1"),
            ("GPx", "GPX3B") => Some("GPX3"),
            ("SelW", "SelW1") | ("SelW", "SelW2") => Some("SelW"),
            _ => None,
        };

        if let Some(renamed) = renamed {
            candidate.subfamily = renamed.to_string();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub candidate: Candidate,
    pub index_best: i64,
}

/// rank candidates within each (species, subfamily) group by similarity;
/// the best-scoring candidate gets index 0
pub fn rank_candidates(mut candidates: Vec<Candidate>) -> Vec<Ranked> {
    candidates.sort_by(|a, b| {
        (a.species.as_str(), a.subfamily.as_str())
            .cmp(&(b.species.as_str(), b.subfamily.as_str()))
            .then(
                a.similarity
                    .partial_cmp(&b.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let mut ranked = Vec::with_capacity(candidates.len());
    let mut start = 0;
    while start < candidates.len() {
        let group_of = |c: &Candidate| (c.species.clone(), c.subfamily.clone());
        let key = group_of(&candidates[start]);
        let end = start
            + candidates[start..]
                .iter()
                .take_while(|c| group_of(c) == key)
                .count();

        let size = end - start;
        for (offset, candidate) in candidates[start..end].iter().enumerate() {
            ranked.push(Ranked {
                candidate: candidate.clone(),
                index_best: (size - 1 - offset) as i64,
            });
        }

        start = end;
    }

    ranked
}

/// every mapped species is expected to carry the family's full complement;
/// rows observed short of the expectation become Missing predictions
fn synthesize_missing(
    rows: &[OutputRow],
    map: &HashMap<String, String>,
    expectation: &ExpectationTable,
    family: &str,
) -> Result<Vec<OutputRow>> {
    let columns = expectation.family_columns(family);
    if columns.is_empty() {
        warn!("No expectation columns match family {}", family);
        return Ok(Vec::new());
    }

    let mut counts: HashMap<(&str, &str), u32> = HashMap::new();
    for row in rows {
        *counts
            .entry((row.species.as_str(), row.subfamily.as_str()))
            .or_insert(0) += 1;
    }

    let mut species = map.keys().collect::<Vec<_>>();
    species.sort();

    let mut missing = Vec::new();
    for species in species {
        let Some(lineage) = resolve_lineage(species, map, expectation)? else {
            warn!("No expectation lineage for {}. Skipping...", species);
            continue;
        };

        for column in &columns {
            let expected = expectation.get(&lineage, column).unwrap_or(0);
            let actual = counts
                .get(&(species.as_str(), column.as_str()))
                .copied()
                .unwrap_or(0);

            for _ in actual..expected {
                missing.push(OutputRow {
                    candidate: String::new(),
                    subfamily: column.clone(),
                    similarity: None,
                    species: species.clone(),
                    lineage: lineage.clone(),
                    pass: false,
                });
            }
        }
    }

    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile;

    fn candidate(id: &str, similarity: f64, subfamily: &str, species: &str) -> Candidate {
        Candidate {
            candidate: id.to_string(),
            similarity,
            subfamily: subfamily.to_string(),
            species: species.to_string(),
        }
    }

    #[test]
    fn test_rank_candidates() {
        let ranked = rank_candidates(vec![
            candidate("a", 0.9, "GPX1", "Homo_sapiens"),
            candidate("b", 0.7, "GPX1", "Homo_sapiens"),
            candidate("c", 0.8, "GPX1", "Homo_sapiens"),
            candidate("d", 0.5, "GPX4", "Homo_sapiens"),
        ]);

        let index_of = |id: &str| {
            ranked
                .iter()
                .find(|r| r.candidate.candidate == id)
                .unwrap()
                .index_best
        };
        assert_eq!(index_of("a"), 0);
        assert_eq!(index_of("c"), 1);
        assert_eq!(index_of("b"), 2);
        assert_eq!(index_of("d"), 0);
    }

    #[test]
    fn test_rename_subfamilies() {
        let mut candidates = vec![
            candidate("a", 0.9, "GPX1B", "Homo_sapiens"),
            candidate("b", 0.9, "GPX4", "Homo_sapiens"),
        ];
        rename_subfamilies(&mut candidates, "GPx");
        assert_eq!(candidates[0].subfamily, "GPX1");
        assert_eq!(candidates[1].subfamily, "GPX4");

        let mut candidates = vec![candidate("a", 0.9, "SelW2", "Homo_sapiens")];
        rename_subfamilies(&mut candidates, "SelW");
        assert_eq!(candidates[0].subfamily, "SelW");
    }

    fn write_inputs(dir: &std::path::Path) -> (PathBuf, PathBuf, PathBuf) {
        let orthology = dir.join("GPx.orthology.tsv");
        let mut f = std::fs::File::create(&orthology).unwrap();
        writeln!(f, "Candidate\tSimilarity\tSubfamily\tSpecies").unwrap();
        writeln!(
            f,
            "GPx.1.selenocysteine.Homo_sapiens.hg38\t0.9000\tGPX1\tHomo_sapiens"
        )
        .unwrap();
        writeln!(
            f,
            "GPx.2.selenocysteine.Homo_sapiens.hg38\t0.7000\tGPX1\tHomo_sapiens"
        )
        .unwrap();
        writeln!(
            f,
            "GPx.3.selenocysteine.Homo_sapiens.hg38\t0.8000\tGPX1\tHomo_sapiens"
        )
        .unwrap();

        let expectation = dir.join("expectation.csv");
        let mut f = std::fs::File::create(&expectation).unwrap();
        writeln!(f, "Lineage,GPX1,GPX4").unwrap();
        writeln!(f, "Placentals,2,1").unwrap();

        let map = dir.join("map.tsv");
        let mut f = std::fs::File::create(&map).unwrap();
        writeln!(f, "Homo_sapiens\tPlacentals").unwrap();

        (orthology, expectation, map)
    }

    #[test]
    fn test_filter_lineage_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (orthology, expectation, map) = write_inputs(dir.path());

        let args = Args::from(vec![
            "-i".to_string(),
            orthology.display().to_string(),
            "-e".to_string(),
            expectation.display().to_string(),
            "-m".to_string(),
            map.display().to_string(),
            "--outdir".to_string(),
            dir.path().display().to_string(),
        ]);

        let outputs = filter_lineage(args).unwrap();
        let table = std::fs::read_to_string(&outputs[0]).unwrap();
        let lines = table.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], TABLE_HEADER);
        // 3 candidates + 1 missing GPX4 row
        assert_eq!(lines.len(), 5);

        // two GPX1 copies expected: the best two pass, the worst is discarded
        let row_of = |id: &str| lines.iter().find(|l| l.contains(id)).unwrap();
        assert!(row_of("GPx.1.").contains("True"));
        assert!(row_of("GPx.3.").contains("True"));
        assert!(row_of("GPx.2.").contains("False"));
        assert!(row_of("GPx.2.").contains("Low similarity score"));

        // GPX4 was expected once for placentals but never predicted
        let missing = lines
            .iter()
            .find(|l| l.starts_with('\t') && l.contains("GPX4"))
            .unwrap();
        assert!(missing.contains("Missing prediction"));
        assert!(missing.contains("False"));
    }

    #[test]
    fn test_filter_lineage_unknown_species_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (orthology, expectation, _) = write_inputs(dir.path());

        let map = dir.path().join("empty_map.tsv");
        let mut f = std::fs::File::create(&map).unwrap();
        writeln!(f, "Mus_musculus\tPlacentals").unwrap();

        let args = Args::from(vec![
            "-i".to_string(),
            orthology.display().to_string(),
            "-e".to_string(),
            expectation.display().to_string(),
            "-m".to_string(),
            map.display().to_string(),
            "--outdir".to_string(),
            dir.path().display().to_string(),
        ]);

        assert!(filter_lineage(args).is_err());
    }
}
