use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use hashbrown::HashMap;

/// one scored prediction out of a sp-orthology table
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub candidate: String,
    pub similarity: f64,
    pub subfamily: String,
    pub species: String,
}

/// expected copy numbers per (lineage, subfamily)
#[derive(Debug, Clone)]
pub struct ExpectationTable {
    pub lineages: Vec<String>,
    pub subfamilies: Vec<String>,
    counts: HashMap<(String, String), u32>,
}

impl ExpectationTable {
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("ERROR: cannot open {:?}", path))?;

        let headers = reader.headers()?.clone();
        let lineage_col = headers
            .iter()
            .position(|h| h == "Lineage")
            .ok_or_else(|| anyhow!("ERROR: no Lineage column in {:?}", path))?;
        let subfamilies = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != lineage_col)
            .map(|(_, h)| h.to_string())
            .collect::<Vec<_>>();

        let mut lineages = Vec::new();
        let mut counts = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let lineage = record
                .get(lineage_col)
                .ok_or_else(|| anyhow!("ERROR: short row in {:?}", path))?
                .to_string();

            for (idx, header) in headers.iter().enumerate() {
                if idx == lineage_col {
                    continue;
                }
                let count = record
                    .get(idx)
                    .unwrap_or("0")
                    .trim()
                    .parse::<u32>()
                    .with_context(|| {
                        format!("ERROR: non-numeric count for {} in {:?}", header, path)
                    })?;
                counts.insert((lineage.clone(), header.to_string()), count);
            }

            lineages.push(lineage);
        }

        if lineages.is_empty() {
            bail!("ERROR: no rows found in {:?}", path);
        }

        Ok(Self {
            lineages,
            subfamilies,
            counts,
        })
    }

    pub fn get(&self, lineage: &str, subfamily: &str) -> Option<u32> {
        self.counts
            .get(&(lineage.to_string(), subfamily.to_string()))
            .copied()
    }

    pub fn has_subfamily(&self, subfamily: &str) -> bool {
        self.subfamilies.iter().any(|s| s == subfamily)
    }

    /// expectation columns belonging to one family; GPx/DI/TXNRD columns are
    /// spelled upper-case in the table
    pub fn family_columns(&self, family: &str) -> Vec<String> {
        let needle = match family {
            "GPx" | "DI" | "TXNRD" => family.to_uppercase(),
            _ => family.to_string(),
        };

        self.subfamilies
            .iter()
            .filter(|s| s.contains(&needle))
            .cloned()
            .collect()
    }
}

/// read a sp-orthology output table by header names
pub fn read_orthology(path: &Path) -> Result<Vec<Candidate>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("ERROR: cannot open {:?}", path))?;

    let headers = reader.headers()?.clone();
    let col = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("ERROR: no {} column in {:?}", name, path))
    };
    let (candidate, similarity, subfamily, species) = (
        col("Candidate")?,
        col("Similarity")?,
        col("Subfamily")?,
        col("Species")?,
    );

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| {
            record
                .get(idx)
                .ok_or_else(|| anyhow!("ERROR: short row in {:?}", path))
        };

        rows.push(Candidate {
            candidate: field(candidate)?.to_string(),
            similarity: field(similarity)?.parse::<f64>().with_context(|| {
                format!("ERROR: non-numeric similarity in {:?}", path)
            })?,
            subfamily: field(subfamily)?.to_string(),
            species: field(species)?.to_string(),
        });
    }

    Ok(rows)
}

/// species -> lineage map; values may be single lineage names or full
/// ;-separated lineage strings
pub fn read_species_map(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).with_context(|| format!("ERROR: cannot open {:?}", path))?;
    let mut map = HashMap::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split('\t');
        let species = fields
            .next()
            .ok_or_else(|| anyhow!("ERROR: malformed line in {:?}: {}", path, line))?;
        let lineage = fields
            .next()
            .ok_or_else(|| anyhow!("ERROR: malformed line in {:?}: {}", path, line))?;

        map.insert(species.to_string(), lineage.to_string());
    }

    if map.is_empty() {
        bail!("ERROR: no species found in {:?}", path);
    }

    Ok(map)
}

/// find the expectation lineage of a species. A 3-part species name retries
/// as its first two parts. A full lineage string resolves to its most
/// specific component present in the expectation table; Ok(None) means the
/// species maps to no lineage the table knows
pub fn resolve_lineage(
    species: &str,
    map: &HashMap<String, String>,
    expectation: &ExpectationTable,
) -> Result<Option<String>> {
    let value = match map.get(species) {
        Some(value) => value,
        None => {
            let parts = species.split('_').collect::<Vec<_>>();
            if parts.len() == 3 {
                let shortened = parts[..2].join("_");
                map.get(shortened.as_str()).ok_or_else(|| {
                    anyhow!("ERROR: '{}' not found in the species map", shortened)
                })?
            } else {
                bail!("ERROR: '{}' not found in the species map", species)
            }
        }
    };

    if expectation.lineages.iter().any(|l| l == value) {
        return Ok(Some(value.clone()));
    }

    for component in value.split(';').rev() {
        let component = component.trim();
        if expectation.lineages.iter().any(|l| l == component) {
            return Ok(Some(component.to_string()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile;

    fn expectation() -> ExpectationTable {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Lineage,GPX1,GPX4,SelW").unwrap();
        writeln!(file, "Placentals,2,1,1").unwrap();
        writeln!(file, "Fish,1,2,1").unwrap();

        ExpectationTable::from_csv(file.path()).unwrap()
    }

    #[test]
    fn test_expectation_table() {
        let table = expectation();

        assert_eq!(table.lineages, vec!["Placentals", "Fish"]);
        assert_eq!(table.get("Placentals", "GPX1"), Some(2));
        assert_eq!(table.get("Fish", "GPX4"), Some(2));
        assert_eq!(table.get("Placentals", "GPX7"), None);
        assert!(table.has_subfamily("SelW"));
        assert!(!table.has_subfamily("DIO1"));
    }

    #[test]
    fn test_family_columns() {
        let table = expectation();

        assert_eq!(table.family_columns("GPx"), vec!["GPX1", "GPX4"]);
        assert_eq!(table.family_columns("SelW"), vec!["SelW"]);
        assert!(table.family_columns("DI").is_empty());
    }

    #[test]
    fn test_resolve_lineage() {
        let table = expectation();
        let mut map = HashMap::new();
        map.insert("Homo_sapiens".to_string(), "Placentals".to_string());
        map.insert(
            "Danio_rerio".to_string(),
            "Eukaryota; Metazoa; Fish".to_string(),
        );
        map.insert("Xenopus_laevis".to_string(), "Frog".to_string());

        assert_eq!(
            resolve_lineage("Homo_sapiens", &map, &table).unwrap(),
            Some("Placentals".to_string())
        );
        // full lineage strings resolve against the table components
        assert_eq!(
            resolve_lineage("Danio_rerio", &map, &table).unwrap(),
            Some("Fish".to_string())
        );
        // 3-part species names fall back to the 2-part form
        assert_eq!(
            resolve_lineage("Homo_sapiens_neanderthalensis", &map, &table).unwrap(),
            Some("Placentals".to_string())
        );
        // mapped, but no component known to the expectation table
        assert_eq!(resolve_lineage("Xenopus_laevis", &map, &table).unwrap(), None);
        // absent from the map entirely
        assert!(resolve_lineage("Mus_musculus", &map, &table).is_err());
    }
}
