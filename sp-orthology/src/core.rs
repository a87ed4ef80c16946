use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use log::info;
use rayon::prelude::*;

use config::{write_table, GAP};

use crate::cli::{Args, GapMode, Metric, WeightScheme};
use crate::utils::{is_result_title, read_alignment, species_of, subfamily_of, AliRecord};

pub const TABLE_HEADER: &str = "Candidate\tSimilarity\tSubfamily\tSpecies";

// normalization base for the information weight; 20 residue symbols
const RESIDUE_ALPHABET: f64 = 20.0;

pub fn classify_orthology(args: Args) -> Result<Vec<PathBuf>> {
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

        let records = read_alignment(path)?;

        let candidates = records
            .iter()
            .filter(|r| is_result_title(r.desc.as_deref()) && !r.id.contains("SEED"))
            .collect::<Vec<_>>();
        info!(
            "Loaded alignment {}: {} predictions and {} profile seqs",
            path.display(),
            candidates.len(),
            records.len() - candidates.len()
        );

        if candidates.is_empty() {
            bail!("ERROR: no selenoprofiles results found in {:?}", path);
        }

        let subfamilies = subfamily_groups(&records, &family);
        let weights = match args.metric {
            Metric::Weighted => subfamilies
                .iter()
                .map(|(_, group)| Some(column_weights(group, args.weights)))
                .collect::<Vec<_>>(),
            Metric::Identity => vec![None; subfamilies.len()],
        };

        let rows = candidates
            .par_iter()
            .map(|candidate| {
                let (subfamily, similarity) = best_subfamily(candidate, &subfamilies, &weights, args.gaps);

                format!(
                    "{}\t{:.4}\t{}\t{}",
                    candidate.id,
                    similarity,
                    subfamily,
                    species_of(&candidate.id)
                )
            })
            .collect::<Vec<_>>();

        let outfile = args
            .outdir
            .join(format!("{}.{}.tsv", family, args.suffix.trim_matches('.')));
        info!("--> writing output: {}", outfile.display());
        write_table(&outfile, TABLE_HEADER, &rows)?;
        outputs.push(outfile);
    }

    Ok(outputs)
}

/// partition the profile side of the alignment into scoring groups: SEED
/// anchors group by their subfamily field; without anchors the whole profile
/// scores as one group named after the family
fn subfamily_groups<'a>(
    records: &'a [AliRecord],
    family: &str,
) -> Vec<(String, Vec<&'a AliRecord>)> {
    let anchors = records
        .iter()
        .filter(|r| r.id.contains("SEED"))
        .collect::<Vec<_>>();

    if anchors.is_empty() {
        let profile = records
            .iter()
            .filter(|r| !is_result_title(r.desc.as_deref()))
            .collect::<Vec<_>>();

        return vec![(family.to_string(), profile)];
    }

    let mut groups: BTreeMap<String, Vec<&AliRecord>> = BTreeMap::new();
    for anchor in anchors {
        match subfamily_of(&anchor.id) {
            Some(subfamily) => groups.entry(subfamily).or_default().push(anchor),
            None => log::warn!("Anchor {} has no subfamily field. Skipping...", anchor.id),
        }
    }

    groups.into_iter().collect()
}

/// argmax of the candidate's similarity across subfamily groups; ties keep
/// the alphabetically first subfamily
fn best_subfamily(
    candidate: &AliRecord,
    subfamilies: &[(String, Vec<&AliRecord>)],
    weights: &[Option<Vec<f64>>],
    gaps: GapMode,
) -> (String, f64) {
    let mut best = (String::new(), f64::MIN);

    for ((subfamily, group), weight) in subfamilies.iter().zip(weights) {
        let score = score_candidate(candidate, group, weight.as_deref(), gaps);
        if score > best.1 {
            best = (subfamily.clone(), score);
        }
    }

    best
}

/// mean (weighted) identity of the candidate against every sequence of one
/// group over the shared alignment columns
pub fn score_candidate(
    candidate: &AliRecord,
    group: &[&AliRecord],
    weights: Option<&[f64]>,
    gaps: GapMode,
) -> f64 {
    if group.is_empty() {
        return 0.0;
    }

    let span = match gaps {
        GapMode::Trim => aligned_span(&candidate.seq),
        _ => (0, candidate.seq.len()),
    };

    let mut total = 0.0;
    for anchor in group {
        let mut num = 0.0;
        let mut den = 0.0;

        for col in 0..candidate.seq.len() {
            let a = anchor.seq[col];
            let b = candidate.seq[col];

            let counted = match gaps {
                GapMode::No => a != GAP && b != GAP,
                GapMode::Yes | GapMode::All => true,
                GapMode::Trim => col >= span.0 && col < span.1,
            };
            if !counted {
                continue;
            }

            let weight = weights.map(|w| w[col]).unwrap_or(1.0);
            let matches = match gaps {
                GapMode::All => a == b && a != GAP,
                _ => a == b,
            };

            if matches {
                num += weight;
            }
            den += weight;
        }

        total += if den > 0.0 { num / den } else { 0.0 };
    }

    total / group.len() as f64
}

/// first to one-past-last non-gap column of a sequence
fn aligned_span(seq: &[u8]) -> (usize, usize) {
    let start = seq.iter().position(|b| *b != GAP).unwrap_or(0);
    let end = seq.iter().rposition(|b| *b != GAP).map(|p| p + 1).unwrap_or(0);

    (start, end)
}

/// per-column weights of one group; columns made of gaps only weigh nothing
pub fn column_weights(group: &[&AliRecord], scheme: WeightScheme) -> Vec<f64> {
    let Some(width) = group.first().map(|r| r.seq.len()) else {
        return Vec::new();
    };

    (0..width)
        .map(|col| {
            let mut counts: BTreeMap<u8, f64> = BTreeMap::new();
            let mut total = 0.0;
            for record in group {
                let base = record.seq[col];
                if base == GAP {
                    continue;
                }
                *counts.entry(base).or_insert(0.0) += 1.0;
                total += 1.0;
            }

            if total == 0.0 {
                return 0.0;
            }

            match scheme {
                WeightScheme::Majority => {
                    counts.values().cloned().fold(0.0, f64::max) / total
                }
                WeightScheme::Information => {
                    let entropy: f64 = counts
                        .values()
                        .map(|count| {
                            let p = count / total;
                            -p * p.ln()
                        })
                        .sum();
                    (1.0 - entropy / RESIDUE_ALPHABET.ln()).max(0.0)
                }
                WeightScheme::Quadratic => counts
                    .values()
                    .map(|count| (count / total).powi(2))
                    .sum(),
            }
        })
        .collect()
}
