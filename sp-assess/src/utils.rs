use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use bio::bio_types::strand::Strand as BioStrand;
use bio::data_structures::interval_tree::IntervalTree;
use bio::io::{fasta, gff};
use flate2::read::MultiGzDecoder;
use hashbrown::HashMap;
use log::warn;

use config::{interval_overlap, Strand, CODON, FRAMES, NO_COORD, NO_REFERENCE, STOP_CODONS};

use crate::cli::StopMode;

pub type Genome = HashMap<String, Vec<u8>>;

/// feature classes the assessment works on; everything else is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Cds,
    Selenocysteine,
}

impl Feature {
    pub fn from_type(ftype: &str) -> Option<Feature> {
        if ftype.starts_with("CDS") {
            Some(Feature::Cds)
        } else if ftype.starts_with("Selenocysteine") {
            Some(Feature::Selenocysteine)
        } else {
            None
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Cds => write!(f, "CDS"),
            Feature::Selenocysteine => write!(f, "Selenocysteine"),
        }
    }
}

/// one coding interval; coordinates are 0-based half-open
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRecord {
    pub chrom: String,
    pub feature: Feature,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub id: String,
    pub frame: i64,
    pub frame_genome: i64,
}

impl IntervalRecord {
    pub fn new(
        chrom: &str,
        feature: Feature,
        start: i64,
        end: i64,
        strand: Strand,
        id: &str,
    ) -> Self {
        Self {
            chrom: chrom.to_string(),
            feature,
            start,
            end,
            strand,
            id: id.to_string(),
            frame: NO_COORD,
            frame_genome: NO_COORD,
        }
    }
}

/// one row of the prediction x reference long table
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotRecord {
    pub chrom: String,
    pub feature: Feature,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub transcript_id: String,
    pub frame_genome: i64,
    pub start_ens: i64,
    pub end_ens: i64,
    pub strand_ens: Strand,
    pub transcript_id_ens: String,
    pub frame_genome_ens: i64,
    pub overlap: i64,
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("ERROR: cannot open {:?}", path))?;

    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn gff_format(path: &Path) -> gff::GffType {
    let name = path.to_string_lossy();
    let name = name.strip_suffix(".gz").unwrap_or(&name);

    if name.ends_with(".gtf") {
        gff::GffType::GTF2
    } else {
        gff::GffType::GFF3
    }
}

/// read CDS (and optionally Selenocysteine) rows from a GTF/GFF file,
/// converting to 0-based half-open coordinates
pub fn read_features(path: &Path, id_attr: &str, keep_sec: bool) -> Result<Vec<IntervalRecord>> {
    let mut reader = gff::Reader::new(open_reader(path)?, gff_format(path));
    let mut rows = Vec::new();

    for record in reader.records() {
        let record =
            record.with_context(|| format!("ERROR: malformed record in {:?}", path))?;

        let feature = match Feature::from_type(record.feature_type()) {
            Some(feature) => feature,
            None => continue,
        };
        if feature == Feature::Selenocysteine && !keep_sec {
            continue;
        }

        let strand = match record.strand() {
            Some(BioStrand::Forward) => Strand::Forward,
            Some(BioStrand::Reverse) => Strand::Reverse,
            _ => bail!(
                "ERROR: unstranded {} feature at {}:{}-{} in {:?}",
                record.feature_type(),
                record.seqname(),
                record.start(),
                record.end(),
                path
            ),
        };

        let id = record
            .attributes()
            .get(id_attr)
            .ok_or_else(|| {
                anyhow!(
                    "ERROR: missing attribute '{}' at {}:{}-{} in {:?}",
                    id_attr,
                    record.seqname(),
                    record.start(),
                    record.end(),
                    path
                )
            })?
            .clone();

        rows.push(IntervalRecord {
            chrom: record.seqname().to_string(),
            feature,
            start: *record.start() as i64 - 1,
            end: *record.end() as i64,
            strand,
            id,
            frame: NO_COORD,
            frame_genome: NO_COORD,
        });
    }

    if rows.is_empty() {
        bail!("ERROR: no coding features found in {:?}", path);
    }

    Ok(rows)
}

/// reference ids may be written as CDS:<id>
pub fn normalize_reference_ids(rows: &mut [IntervalRecord]) {
    for row in rows.iter_mut() {
        if let Some(stripped) = row.id.strip_prefix("CDS:") {
            row.id = stripped.to_string();
        }
    }
}

/// selenocysteine features carry ids like selenocysteine:<prediction>; keep
/// the prediction part so they group with their transcript
pub fn normalize_prediction_ids(rows: &mut [IntervalRecord]) {
    for row in rows.iter_mut() {
        if let Some(tail) = row.id.split(':').nth(1) {
            row.id = tail.to_string();
        }
    }
}

/// load a FASTA file into memory, uppercased
pub fn read_genome(path: &Path) -> Result<Genome> {
    let reader = fasta::Reader::new(open_reader(path)?);
    let mut genome = Genome::new();

    for record in reader.records() {
        let record =
            record.with_context(|| format!("ERROR: malformed record in {:?}", path))?;
        genome.insert(record.id().to_string(), record.seq().to_ascii_uppercase());
    }

    Ok(genome)
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|base| match base {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            _ => b'N',
        })
        .collect()
}

/// order intervals of one transcript in 5' to 3' direction
fn sort_five_to_three(rows: &mut [IntervalRecord]) {
    match rows[0].strand {
        Strand::Forward => rows.sort_by_key(|r| r.start),
        Strand::Reverse => rows.sort_by_key(|r| std::cmp::Reverse(r.start)),
    }
}

/// last k bases of the spliced transcript sequence, 5' to 3'; rows must be
/// sorted 5' to 3'
fn spliced_tail(rows: &[IntervalRecord], genome: &Genome, k: i64) -> Result<Vec<u8>> {
    let mut tail = Vec::new();
    let mut need = k;

    for row in rows.iter().rev() {
        if need == 0 {
            break;
        }

        let seq = genome
            .get(&row.chrom)
            .ok_or_else(|| anyhow!("ERROR: chromosome {} not found in FASTA", row.chrom))?;
        if row.end as usize > seq.len() {
            bail!(
                "ERROR: interval {}:{}-{} exceeds FASTA sequence length {}",
                row.chrom,
                row.start,
                row.end,
                seq.len()
            );
        }

        let take = need.min(row.end - row.start);
        let mut chunk = match row.strand {
            Strand::Forward => seq[(row.end - take) as usize..row.end as usize].to_vec(),
            Strand::Reverse => revcomp(&seq[row.start as usize..(row.start + take) as usize]),
        };

        chunk.extend_from_slice(&tail);
        tail = chunk;
        need -= take;
    }

    Ok(tail)
}

/// remove the last k spliced bases of one transcript; rows must be sorted
/// 5' to 3'; intervals consumed whole are dropped
fn trim_spliced_tail(rows: &mut Vec<IntervalRecord>, k: i64) {
    let mut need = k;

    while need > 0 {
        let Some(last) = rows.last_mut() else { break };

        let take = need.min(last.end - last.start);
        match last.strand {
            Strand::Forward => last.end -= take,
            Strand::Reverse => last.start += take,
        }
        need -= take;

        if last.start == last.end {
            rows.pop();
        }
    }
}

/// strip trailing stop codons of reference transcripts according to the
/// selected mode; the probe window is the last 3 spliced bases only
pub fn strip_stop_codons(
    rows: Vec<IntervalRecord>,
    mode: StopMode,
    genome: Option<&Genome>,
) -> Result<Vec<IntervalRecord>> {
    if mode == StopMode::No {
        return Ok(rows);
    }

    let mut order = Vec::new();
    let mut groups: HashMap<String, Vec<IntervalRecord>> = HashMap::new();
    for row in rows {
        if !groups.contains_key(&row.id) {
            order.push(row.id.clone());
        }
        groups.entry(row.id.clone()).or_default().push(row);
    }

    let mut out = Vec::new();
    for id in order {
        let mut transcript = groups.remove(&id).unwrap();
        sort_five_to_three(&mut transcript);

        let strip = match mode {
            StopMode::All => true,
            StopMode::Auto => {
                let genome = genome.expect("stop mode 'auto' requires the genome");
                let tail = spliced_tail(&transcript, genome, CODON)?;
                STOP_CODONS.iter().any(|codon| codon.as_bytes() == tail)
            }
            StopMode::No => unreachable!(),
        };

        if strip {
            trim_spliced_tail(&mut transcript, CODON);
        }
        out.extend(transcript);
    }

    Ok(out)
}

/// assign each interval the codon phase of its first base, grouping by id;
/// the observable row order is preserved
pub fn calculate_frame(rows: &mut [IntervalRecord]) {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        groups.entry(row.id.clone()).or_default().push(idx);
    }

    for (_, mut idxs) in groups {
        match rows[idxs[0]].strand {
            Strand::Forward => idxs.sort_by_key(|&i| rows[i].start),
            Strand::Reverse => idxs.sort_by_key(|&i| std::cmp::Reverse(rows[i].start)),
        }

        let mut cumsum = 0;
        for &i in idxs.iter() {
            rows[i].frame = cumsum % FRAMES;
            cumsum += rows[i].end - rows[i].start;
        }
    }
}

/// strand-invariant register of the reading frame, comparable across
/// independently-phased interval sets
pub fn genome_frame(rows: &mut [IntervalRecord]) {
    for row in rows.iter_mut() {
        row.frame_genome = match row.strand {
            Strand::Forward => (row.start - row.frame).rem_euclid(FRAMES),
            Strand::Reverse => (row.end + row.frame).rem_euclid(FRAMES),
        };
    }
}

/// a Selenocysteine row inherits the phase of the CDS interval of its own
/// prediction that overlaps it; rows with no hosting CDS are dropped
pub fn assign_sec_frames(
    secs: Vec<IntervalRecord>,
    cds: &[IntervalRecord],
) -> Vec<IntervalRecord> {
    let mut by_id: HashMap<&str, Vec<&IntervalRecord>> = HashMap::new();
    for row in cds {
        by_id.entry(row.id.as_str()).or_default().push(row);
    }

    secs.into_iter()
        .filter_map(|mut sec| {
            let host = by_id.get(sec.id.as_str()).and_then(|rows| {
                rows.iter()
                    .find(|c| interval_overlap(&(c.start, c.end), &(sec.start, sec.end)) > 0)
            });

            match host {
                Some(cds) => {
                    sec.frame = cds.frame;
                    Some(sec)
                }
                None => {
                    warn!(
                        "Selenocysteine of {} has no hosting CDS interval. Skipping...",
                        sec.id
                    );
                    None
                }
            }
        })
        .collect()
}

/// left outer join of prediction rows against reference rows on genomic
/// overlap, per chromosome; strand-blind so that cross-strand overlaps stay
/// visible to the classifier
pub fn join_overlaps(
    predictions: &[IntervalRecord],
    reference: &[IntervalRecord],
) -> Vec<AnnotRecord> {
    let mut trees: HashMap<&str, IntervalTree<i64, usize>> = HashMap::new();
    for (idx, row) in reference.iter().enumerate() {
        if row.start >= row.end {
            continue;
        }
        trees
            .entry(row.chrom.as_str())
            .or_insert_with(IntervalTree::new)
            .insert(row.start..row.end, idx);
    }

    let mut joined = Vec::with_capacity(predictions.len());
    for row in predictions {
        let mut matched = false;

        if let Some(tree) = trees.get(row.chrom.as_str()) {
            for entry in tree.find(row.start..row.end) {
                let ens = &reference[*entry.data()];

                joined.push(AnnotRecord {
                    chrom: row.chrom.clone(),
                    feature: row.feature,
                    start: row.start,
                    end: row.end,
                    strand: row.strand,
                    transcript_id: row.id.clone(),
                    frame_genome: row.frame_genome,
                    start_ens: ens.start,
                    end_ens: ens.end,
                    strand_ens: ens.strand,
                    transcript_id_ens: ens.id.clone(),
                    frame_genome_ens: ens.frame_genome,
                    overlap: interval_overlap(&(row.start, row.end), &(ens.start, ens.end)),
                });
                matched = true;
            }
        }

        if !matched {
            // strand_ens mirrors the prediction so that purely-unmatched
            // groups classify as Missing, not as a strand disagreement
            joined.push(AnnotRecord {
                chrom: row.chrom.clone(),
                feature: row.feature,
                start: row.start,
                end: row.end,
                strand: row.strand,
                transcript_id: row.id.clone(),
                frame_genome: row.frame_genome,
                start_ens: NO_COORD,
                end_ens: NO_COORD,
                strand_ens: row.strand,
                transcript_id_ens: NO_REFERENCE.to_string(),
                frame_genome_ens: NO_COORD,
                overlap: NO_COORD,
            });
        }
    }

    joined
}
