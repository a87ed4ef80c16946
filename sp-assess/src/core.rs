use std::fmt;

use anyhow::Result;
use dashmap::DashMap;
use hashbrown::{HashMap, HashSet};
use log::info;
use rayon::prelude::*;

use config::{get_progress_bar, write_table, Strand, CODON, NO_REFERENCE};

use crate::cli::{Args, StopMode};
use crate::utils::{
    assign_sec_frames, calculate_frame, genome_frame, join_overlaps, normalize_prediction_ids,
    normalize_reference_ids, read_features, read_genome, strip_stop_codons, AnnotRecord, Feature,
};

pub const TABLE_HEADER: &str = "transcript_id\ttranscript_id_ens\tType_annotation";

/// outcome of comparing one prediction against one reference transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Annotation {
    Missing,
    OutOfFrame,
    WellAnnotated,
    Spliced,
    StopCodon,
    Skipped,
    Upstream,
    Downstream,
    Other,
}

impl Annotation {
    /// collapse positional labels for the aggregate table
    pub fn collapse(&self) -> &'static str {
        match self {
            Annotation::WellAnnotated => "Well annotated",
            Annotation::Missing => "Missing",
            _ => "Missannotation",
        }
    }

    /// ordinal priority; lower wins
    pub fn hierarchy(&self) -> u8 {
        match self {
            Annotation::WellAnnotated => 0,
            Annotation::Missing => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Annotation::Missing => "Missing",
            Annotation::OutOfFrame => "Out of frame",
            Annotation::WellAnnotated => "Well annotated",
            Annotation::Spliced => "Spliced",
            Annotation::StopCodon => "Stop codon",
            Annotation::Skipped => "Skipped",
            Annotation::Upstream => "Upstream",
            Annotation::Downstream => "Downstream",
            Annotation::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// classify one (prediction, reference) group; `sec` holds every
/// Selenocysteine row of this prediction, regardless of reference
pub fn classify_group(rows: &[AnnotRecord], sec: &[AnnotRecord]) -> Annotation {
    assert!(
        rows.iter().all(|r| r.strand == rows[0].strand),
        "ERROR: transcript {} has more than one strand!",
        rows[0].transcript_id
    );

    // selenocysteines matching this group's reference transcript
    let sp_sec = sec
        .iter()
        .filter(|s| rows.iter().any(|r| r.transcript_id_ens == s.transcript_id_ens))
        .collect::<Vec<_>>();

    if rows.iter().any(|r| r.strand != r.strand_ens) {
        return Annotation::Other;
    }

    if rows.iter().all(|r| r.transcript_id_ens == NO_REFERENCE) {
        return Annotation::Missing;
    }

    if rows
        .iter()
        .any(|r| r.feature == Feature::Cds && r.frame_genome != r.frame_genome_ens)
    {
        return Annotation::OutOfFrame;
    }

    if !sp_sec.is_empty()
        && sp_sec.iter().all(|s| {
            s.feature == Feature::Selenocysteine
                && s.transcript_id_ens != NO_REFERENCE
                && s.overlap == CODON
        })
    {
        return Annotation::WellAnnotated;
    }

    if rows.iter().any(|r| {
        r.feature == Feature::Selenocysteine
            && r.transcript_id_ens != NO_REFERENCE
            && r.overlap != CODON
    }) {
        return Annotation::Spliced;
    }

    positional(rows, sec)
}

/// locate the predicted selenocysteine relative to the reference span to
/// refine positional misannotations; with no selenocysteine at all the `+`
/// branch applies vacuously and yields Other
fn positional(rows: &[AnnotRecord], sec: &[AnnotRecord]) -> Annotation {
    let pairs =
        || sec.iter().flat_map(|s| rows.iter().map(move |r| (s, r)));

    if sec.iter().all(|s| s.strand == Strand::Forward) {
        if pairs().any(|(s, r)| s.start == r.end_ens)
            && !pairs().any(|(s, r)| s.end < r.start_ens)
        {
            Annotation::StopCodon
        } else if pairs().any(|(s, r)| s.start > r.end_ens)
            && pairs().any(|(s, r)| s.end <= r.start_ens)
        {
            Annotation::Skipped
        } else if pairs().any(|(s, r)| s.start > r.end_ens) {
            Annotation::Upstream
        } else if pairs().any(|(s, r)| s.end <= r.start_ens) {
            Annotation::Downstream
        } else {
            Annotation::Other
        }
    } else if sec.iter().all(|s| s.strand == Strand::Reverse) {
        if pairs().any(|(s, r)| s.end == r.start_ens)
            && !pairs().any(|(s, r)| s.start > r.end_ens)
        {
            Annotation::StopCodon
        } else if pairs().any(|(s, r)| s.start >= r.end_ens)
            && pairs().any(|(s, r)| s.end < r.start_ens)
        {
            Annotation::Skipped
        } else if pairs().any(|(s, r)| s.end < r.start_ens) {
            Annotation::Upstream
        } else if pairs().any(|(s, r)| s.start >= r.end_ens) {
            Annotation::Downstream
        } else {
            Annotation::Other
        }
    } else {
        Annotation::Other
    }
}

/// one classified (prediction, reference) row of the detail table
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub transcript_id: String,
    pub transcript_id_ens: String,
    pub annotation: Annotation,
    pub feature: Feature,
}

/// one row of the aggregate table
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub transcript_id: String,
    pub transcript_id_ens: String,
    pub annotation: &'static str,
}

/// drop rows the hierarchy shadows within one prediction
fn filter_group(rows: Vec<DetailRow>) -> Vec<DetailRow> {
    if !rows.iter().all(|r| r.annotation == Annotation::Missing) {
        rows.into_iter()
            .filter(|r| {
                r.annotation != Annotation::Missing && r.feature != Feature::Selenocysteine
            })
            .collect()
    } else if rows.iter().any(|r| r.feature == Feature::Selenocysteine) {
        rows.into_iter()
            .filter(|r| r.feature != Feature::Selenocysteine)
            .collect()
    } else {
        rows
    }
}

/// collapse all classifications of each prediction to its best label;
/// idempotent on its own detail output
pub fn reduce_hierarchy(details: Vec<DetailRow>) -> (Vec<DetailRow>, Vec<AggregateRow>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for row in details {
        let key = (
            row.transcript_id.clone(),
            row.transcript_id_ens.clone(),
            row.annotation,
            row.feature,
        );
        if seen.insert(key) {
            unique.push(row);
        }
    }
    unique.sort_by(|a, b| {
        (&a.transcript_id, &a.transcript_id_ens).cmp(&(&b.transcript_id, &b.transcript_id_ens))
    });

    let mut order = Vec::new();
    let mut groups: HashMap<String, Vec<DetailRow>> = HashMap::new();
    for row in unique {
        if !groups.contains_key(&row.transcript_id) {
            order.push(row.transcript_id.clone());
        }
        groups.entry(row.transcript_id.clone()).or_default().push(row);
    }

    let mut detail = Vec::new();
    let mut aggregate = Vec::new();

    for tid in order {
        let rows = filter_group(groups.remove(&tid).unwrap());
        if rows.is_empty() {
            continue;
        }

        // min_by_key keeps the first row on ties, so the lexicographically
        // smallest reference id wins within one hierarchy level
        let best = rows.iter().min_by_key(|r| r.annotation.hierarchy()).unwrap();
        aggregate.push(AggregateRow {
            transcript_id: tid,
            transcript_id_ens: best.transcript_id_ens.clone(),
            annotation: best.annotation.collapse(),
        });

        detail.extend(rows);
    }

    (detail, aggregate)
}

/// full assessment pipeline: read, strip stop codons, phase, join, classify,
/// reduce, write
pub fn assess(args: Args) -> Result<()> {
    info!("Reading input files...");
    let mut reference = read_features(&args.annotation, &args.genome_id, false)?;
    normalize_reference_ids(&mut reference);

    let mut predictions = read_features(&args.predictions, &args.sp_id, true)?;
    normalize_prediction_ids(&mut predictions);

    let mut reference = match args.stop {
        StopMode::Auto => {
            info!("Removing stop codons...");
            let genome = read_genome(&args.fasta)?;
            strip_stop_codons(reference, StopMode::Auto, Some(&genome))?
        }
        StopMode::All => {
            info!("Removing stop codons...");
            strip_stop_codons(reference, StopMode::All, None)?
        }
        StopMode::No => reference,
    };

    info!("Calculating frames...");
    calculate_frame(&mut reference);
    genome_frame(&mut reference);

    let (mut cds, sec): (Vec<_>, Vec<_>) = predictions
        .into_iter()
        .partition(|row| row.feature == Feature::Cds);
    calculate_frame(&mut cds);
    let mut sec = assign_sec_frames(sec, &cds);
    genome_frame(&mut cds);
    genome_frame(&mut sec);

    let mut predictions = cds;
    predictions.extend(sec);

    info!("Assessing annotations...");
    let annotation = join_overlaps(&predictions, &reference);

    let mut sec_by_id: HashMap<String, Vec<AnnotRecord>> = HashMap::new();
    for row in annotation.iter() {
        if row.feature == Feature::Selenocysteine {
            sec_by_id
                .entry(row.transcript_id.clone())
                .or_default()
                .push(row.clone());
        }
    }

    let mut groups: HashMap<(String, String), Vec<AnnotRecord>> = HashMap::new();
    for row in annotation {
        groups
            .entry((row.transcript_id.clone(), row.transcript_id_ens.clone()))
            .or_default()
            .push(row);
    }
    let groups = groups.into_iter().collect::<Vec<_>>();

    let pb = get_progress_bar(groups.len() as u64, "Classifying...");
    let empty = Vec::new();
    let labels: DashMap<(String, String), Annotation> = DashMap::new();
    groups.par_iter().for_each(|((tid, tid_ens), rows)| {
        let sec = sec_by_id.get(tid).unwrap_or(&empty);
        labels.insert((tid.clone(), tid_ens.clone()), classify_group(rows, sec));
        pb.inc(1);
    });
    pb.finish_and_clear();

    let details = groups
        .iter()
        .flat_map(|((tid, tid_ens), rows)| {
            let label = *labels
                .get(&(tid.clone(), tid_ens.clone()))
                .expect("every group is classified");

            rows.iter().map(move |row| DetailRow {
                transcript_id: tid.clone(),
                transcript_id_ens: tid_ens.clone(),
                annotation: label,
                feature: row.feature,
            })
        })
        .collect::<Vec<_>>();

    info!("Creating output tables...");
    let (detail, aggregate) = reduce_hierarchy(details);

    let detail_rows = detail
        .iter()
        .map(|r| format!("{}\t{}\t{}", r.transcript_id, r.transcript_id_ens, r.annotation))
        .collect::<Vec<_>>();
    write_table(&args.output, TABLE_HEADER, &detail_rows)?;

    let aggregate_rows = aggregate
        .iter()
        .map(|r| format!("{}\t{}\t{}", r.transcript_id, r.transcript_id_ens, r.annotation))
        .collect::<Vec<_>>();
    write_table(&args.aggregate, TABLE_HEADER, &aggregate_rows)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{NO_COORD, NO_REFERENCE};

    fn row(
        feature: Feature,
        start: i64,
        end: i64,
        strand: Strand,
        tid: &str,
        frame_genome: i64,
    ) -> AnnotRecord {
        AnnotRecord {
            chrom: "1".to_string(),
            feature,
            start,
            end,
            strand,
            transcript_id: tid.to_string(),
            frame_genome,
            start_ens: NO_COORD,
            end_ens: NO_COORD,
            strand_ens: strand,
            transcript_id_ens: NO_REFERENCE.to_string(),
            frame_genome_ens: NO_COORD,
            overlap: NO_COORD,
        }
    }

    fn matched(
        mut base: AnnotRecord,
        tid_ens: &str,
        start_ens: i64,
        end_ens: i64,
        strand_ens: Strand,
        frame_genome_ens: i64,
        overlap: i64,
    ) -> AnnotRecord {
        base.transcript_id_ens = tid_ens.to_string();
        base.start_ens = start_ens;
        base.end_ens = end_ens;
        base.strand_ens = strand_ens;
        base.frame_genome_ens = frame_genome_ens;
        base.overlap = overlap;
        base
    }

    #[test]
    fn test_missing_prediction() {
        // scenario A: no overlapping reference at all
        let rows = vec![
            row(Feature::Cds, 0, 30, Strand::Forward, "p1", 0),
            row(Feature::Selenocysteine, 9, 12, Strand::Forward, "p1", 0),
        ];
        let sec = vec![rows[1].clone()];

        assert_eq!(classify_group(&rows, &sec), Annotation::Missing);
    }

    #[test]
    fn test_missing_wins_over_frame_sentinels() {
        // unmatched rows carry sentinel frames; they must not read as
        // out-of-frame evidence
        let rows = vec![row(Feature::Cds, 0, 30, Strand::Forward, "p1", 2)];
        assert_eq!(classify_group(&rows, &[]), Annotation::Missing);
    }

    #[test]
    fn test_strand_disagreement_is_other() {
        let rows = vec![matched(
            row(Feature::Cds, 0, 30, Strand::Forward, "p1", 0),
            "ens1",
            0,
            30,
            Strand::Reverse,
            0,
            30,
        )];

        assert_eq!(classify_group(&rows, &[]), Annotation::Other);
    }

    #[test]
    fn test_out_of_frame() {
        // scenario B: frame registers disagree
        let rows = vec![matched(
            row(Feature::Cds, 10, 40, Strand::Forward, "p1", 1),
            "ens1",
            9,
            39,
            Strand::Forward,
            0,
            29,
        )];

        assert_eq!(classify_group(&rows, &[]), Annotation::OutOfFrame);
    }

    #[test]
    fn test_well_annotated() {
        // scenario C: selenocysteine overlaps the reference codon exactly
        let cds = matched(
            row(Feature::Cds, 0, 30, Strand::Forward, "p1", 0),
            "ens1",
            0,
            30,
            Strand::Forward,
            0,
            30,
        );
        let sec = matched(
            row(Feature::Selenocysteine, 9, 12, Strand::Forward, "p1", 0),
            "ens1",
            0,
            30,
            Strand::Forward,
            0,
            3,
        );
        let rows = vec![cds, sec.clone()];

        assert_eq!(classify_group(&rows, &[sec]), Annotation::WellAnnotated);
    }

    #[test]
    fn test_spliced() {
        let cds = matched(
            row(Feature::Cds, 0, 30, Strand::Forward, "p1", 0),
            "ens1",
            0,
            30,
            Strand::Forward,
            0,
            30,
        );
        let sec = matched(
            row(Feature::Selenocysteine, 28, 31, Strand::Forward, "p1", 0),
            "ens1",
            0,
            30,
            Strand::Forward,
            0,
            2,
        );
        let rows = vec![cds, sec.clone()];

        assert_eq!(classify_group(&rows, &[sec]), Annotation::Spliced);
    }

    #[test]
    fn test_stop_codon_plus() {
        // scenario D: sec [100,103) right at the reference end 100
        let cds = matched(
            row(Feature::Cds, 50, 103, Strand::Forward, "p1", 2),
            "ens1",
            50,
            100,
            Strand::Forward,
            2,
            50,
        );
        let sec = row(Feature::Selenocysteine, 100, 103, Strand::Forward, "p1", 2);
        let rows = vec![cds];

        assert_eq!(classify_group(&rows, &[sec]), Annotation::StopCodon);
    }

    #[test]
    fn test_skipped_plus() {
        // sec beyond the reference end, another sec copy before its start
        let cds = matched(
            row(Feature::Cds, 50, 200, Strand::Forward, "p1", 2),
            "ens1",
            60,
            100,
            Strand::Forward,
            2,
            40,
        );
        let secs = vec![
            row(Feature::Selenocysteine, 150, 153, Strand::Forward, "p1", 2),
            row(Feature::Selenocysteine, 40, 43, Strand::Forward, "p1", 2),
        ];

        assert_eq!(classify_group(&[cds], &secs), Annotation::Skipped);
    }

    #[test]
    fn test_upstream_and_downstream_plus() {
        let cds = matched(
            row(Feature::Cds, 50, 200, Strand::Forward, "p1", 2),
            "ens1",
            60,
            100,
            Strand::Forward,
            2,
            40,
        );

        let after = vec![row(Feature::Selenocysteine, 150, 153, Strand::Forward, "p1", 2)];
        assert_eq!(classify_group(&[cds.clone()], &after), Annotation::Upstream);

        let before = vec![row(Feature::Selenocysteine, 40, 43, Strand::Forward, "p1", 2)];
        assert_eq!(classify_group(&[cds], &before), Annotation::Downstream);
    }

    #[test]
    fn test_stop_codon_minus() {
        // mirror of scenario D on the minus strand
        let cds = matched(
            row(Feature::Cds, 97, 150, Strand::Reverse, "p1", 0),
            "ens1",
            100,
            150,
            Strand::Reverse,
            0,
            50,
        );
        let sec = row(Feature::Selenocysteine, 97, 100, Strand::Reverse, "p1", 0);

        assert_eq!(classify_group(&[cds], &[sec]), Annotation::StopCodon);
    }

    #[test]
    fn test_upstream_and_downstream_minus() {
        let cds = matched(
            row(Feature::Cds, 20, 200, Strand::Reverse, "p1", 0),
            "ens1",
            60,
            100,
            Strand::Reverse,
            0,
            40,
        );

        let after = vec![row(Feature::Selenocysteine, 40, 43, Strand::Reverse, "p1", 0)];
        assert_eq!(classify_group(&[cds.clone()], &after), Annotation::Upstream);

        let before = vec![row(Feature::Selenocysteine, 150, 153, Strand::Reverse, "p1", 0)];
        assert_eq!(classify_group(&[cds], &before), Annotation::Downstream);
    }

    #[test]
    fn test_no_selenocysteine_falls_through_to_other() {
        let cds = matched(
            row(Feature::Cds, 50, 200, Strand::Forward, "p1", 2),
            "ens1",
            60,
            250,
            Strand::Forward,
            2,
            140,
        );

        assert_eq!(classify_group(&[cds], &[]), Annotation::Other);
    }

    #[test]
    #[should_panic(expected = "more than one strand")]
    fn test_multi_strand_group_is_fatal() {
        let rows = vec![
            row(Feature::Cds, 0, 30, Strand::Forward, "p1", 0),
            row(Feature::Cds, 60, 90, Strand::Reverse, "p1", 0),
        ];

        classify_group(&rows, &[]);
    }

    fn detail(tid: &str, tid_ens: &str, annotation: Annotation, feature: Feature) -> DetailRow {
        DetailRow {
            transcript_id: tid.to_string(),
            transcript_id_ens: tid_ens.to_string(),
            annotation,
            feature,
        }
    }

    #[test]
    fn test_reduce_drops_shadowed_rows() {
        let details = vec![
            detail("p1", "-1", Annotation::Missing, Feature::Cds),
            detail("p1", "ens1", Annotation::OutOfFrame, Feature::Cds),
            detail("p1", "ens1", Annotation::OutOfFrame, Feature::Selenocysteine),
        ];

        let (detail_rows, aggregate) = reduce_hierarchy(details);
        assert_eq!(detail_rows.len(), 1);
        assert_eq!(detail_rows[0].transcript_id_ens, "ens1");

        // scenario B reduces to Missannotation
        assert_eq!(aggregate.len(), 1);
        assert_eq!(aggregate[0].annotation, "Missannotation");
    }

    #[test]
    fn test_reduce_all_missing() {
        let details = vec![
            detail("p1", "-1", Annotation::Missing, Feature::Cds),
            detail("p1", "-1", Annotation::Missing, Feature::Selenocysteine),
        ];

        let (detail_rows, aggregate) = reduce_hierarchy(details);
        assert_eq!(detail_rows.len(), 1);
        assert_eq!(detail_rows[0].feature, Feature::Cds);
        assert_eq!(aggregate[0].annotation, "Missing");
    }

    #[test]
    fn test_reduce_picks_best_by_hierarchy() {
        let details = vec![
            detail("p1", "ens2", Annotation::StopCodon, Feature::Cds),
            detail("p1", "ens1", Annotation::WellAnnotated, Feature::Cds),
            detail("p2", "ens3", Annotation::Spliced, Feature::Cds),
        ];

        let (_, aggregate) = reduce_hierarchy(details);
        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate[0].transcript_id, "p1");
        assert_eq!(aggregate[0].transcript_id_ens, "ens1");
        assert_eq!(aggregate[0].annotation, "Well annotated");
        assert_eq!(aggregate[1].annotation, "Missannotation");
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let details = vec![
            detail("p1", "ens2", Annotation::StopCodon, Feature::Cds),
            detail("p1", "ens1", Annotation::WellAnnotated, Feature::Cds),
            detail("p1", "-1", Annotation::Missing, Feature::Cds),
            detail("p2", "-1", Annotation::Missing, Feature::Cds),
        ];

        let (once, aggregate_once) = reduce_hierarchy(details);
        let (twice, aggregate_twice) = reduce_hierarchy(once.clone());

        assert_eq!(once, twice);
        assert_eq!(aggregate_once, aggregate_twice);
    }
}
