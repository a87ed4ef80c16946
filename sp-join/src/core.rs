use std::path::PathBuf;

use anyhow::{bail, Result};
use hashbrown::HashSet;
use log::info;
use rayon::prelude::*;

use std::collections::BTreeMap;

use config::GAP;

use crate::cli::Args;
use crate::utils::{correct_title, read_alignment, scan_dir, write_alignment, AliRecord};

pub fn join_alignments(args: Args) -> Result<Vec<PathBuf>> {
    let files = collect_inputs(&args)?;
    let families = group_by_family(files);

    if families.is_empty() {
        bail!("ERROR: no .ali files found");
    }

    std::fs::create_dir_all(&args.outdir)?;

    let joined = families
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(family, paths)| {
            info!("Joining {}: {} file(s)", family, paths.len());
            let merged = merge_family(&paths, &args)?;

            Ok((family, merged))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut outputs = Vec::new();
    for (family, merged) in joined {
        let outfile = args.outdir.join(format!("{}.ali", family));
        info!("Writing ---------> {}", outfile.display());
        write_alignment(&outfile, &merged)?;
        outputs.push(outfile);
    }

    Ok(outputs)
}

fn collect_inputs(args: &Args) -> Result<Vec<PathBuf>> {
    let mut files = args.input.clone();
    if let Some(dir) = &args.dir {
        scan_dir(dir, &mut files)?;
    }

    files.sort();
    files.dedup();

    Ok(files)
}

/// files group into families by the filename stem up to the first dot
fn group_by_family(files: Vec<PathBuf>) -> BTreeMap<String, Vec<PathBuf>> {
    let mut families: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for file in files {
        let family = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        families.entry(family).or_default().push(file);
    }

    families
}

/// merge the alignments of one family; the first occurrence of a title wins.
/// Aligned merging requires one shared width across inputs since alignment
/// transfer is left to the external aligner
fn merge_family(paths: &[PathBuf], args: &Args) -> Result<Vec<AliRecord>> {
    let mut merged: Vec<AliRecord> = Vec::new();
    let mut titles: HashSet<String> = HashSet::new();
    let mut width: Option<usize> = None;

    for path in paths {
        info!("Reading: {}", path.display());

        for mut record in read_alignment(path)? {
            if !args.keep_ids {
                correct_title(&mut record, path)?;
            }

            if args.unaligned {
                record.seq.retain(|base| *base != GAP);
            } else {
                match width {
                    None => width = Some(record.seq.len()),
                    Some(w) if w != record.seq.len() => bail!(
                        "ERROR: alignment width mismatch in {:?} ({} vs {}); \
                         realign the inputs or use --unaligned",
                        path,
                        record.seq.len(),
                        w
                    ),
                    _ => {}
                }
            }

            if titles.insert(record.id.clone()) {
                merged.push(record);
            }
        }
    }

    if !args.unaligned && !args.no_shrink {
        shrink(&mut merged);
    }

    Ok(merged)
}

/// drop columns where every sequence has a gap
pub fn shrink(records: &mut [AliRecord]) {
    let Some(width) = records.first().map(|r| r.seq.len()) else {
        return;
    };

    let keep = (0..width)
        .map(|col| records.iter().any(|r| r.seq[col] != GAP))
        .collect::<Vec<_>>();

    for record in records.iter_mut() {
        record.seq = record
            .seq
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(base, _)| *base)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile;

    fn ali(id: &str, seq: &[u8]) -> AliRecord {
        AliRecord {
            id: id.to_string(),
            desc: None,
            seq: seq.to_vec(),
        }
    }

    #[test]
    fn test_shrink_removes_gap_only_columns() {
        let mut records = vec![ali("a", b"M-G-W"), ali("b", b"M-A-W")];
        shrink(&mut records);

        assert_eq!(records[0].seq, b"MGW".to_vec());
        assert_eq!(records[1].seq, b"MAW".to_vec());
    }

    #[test]
    fn test_join_alignments_first_title_wins() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let one = dir.path().join("GPx.target1.ali");
        let mut f = std::fs::File::create(&one).unwrap();
        writeln!(f, ">GPx.GPX1.SEED.1 profile").unwrap();
        writeln!(f, "MG-W").unwrap();
        writeln!(
            f,
            ">GPx.1.selenocysteine chromosome:chr1 strand:+ positions:1-9 species:\"Homo sapiens\" target:/g/hg38.fa"
        )
        .unwrap();
        writeln!(f, "MGUW").unwrap();

        let two = dir.path().join("GPx.target2.ali");
        let mut f = std::fs::File::create(&two).unwrap();
        writeln!(f, ">GPx.GPX1.SEED.1 profile").unwrap();
        writeln!(f, "MGAW").unwrap();

        let args = Args::from(vec![
            "-i".to_string(),
            format!("{},{}", one.display(), two.display()),
            "-o".to_string(),
            out.path().display().to_string(),
        ]);

        let outputs = join_alignments(args).unwrap();
        assert_eq!(outputs.len(), 1);

        let merged = read_alignment(&outputs[0]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "GPx.GPX1.SEED.1");
        assert_eq!(merged[0].seq, b"MG-W".to_vec());
        assert_eq!(merged[1].id, "GPx.1.selenocysteine.Homo_sapiens.hg38");
    }

    #[test]
    fn test_join_alignments_width_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let one = dir.path().join("DI.ali");
        let mut f = std::fs::File::create(&one).unwrap();
        writeln!(f, ">DI.DIO1.SEED.1 profile").unwrap();
        writeln!(f, "MGW").unwrap();
        writeln!(f, ">DI.DIO2.SEED.1 profile").unwrap();
        writeln!(f, "MGWWW").unwrap();

        let args = Args::from(vec![
            "-i".to_string(),
            one.display().to_string(),
            "-o".to_string(),
            dir.path().display().to_string(),
        ]);
        assert!(join_alignments(args).is_err());
    }

    #[test]
    fn test_join_alignments_unaligned_degaps() {
        let dir = tempfile::tempdir().unwrap();

        let one = dir.path().join("SelW.ali");
        let mut f = std::fs::File::create(&one).unwrap();
        writeln!(f, ">SelW.SEED.1 profile").unwrap();
        writeln!(f, "M--GW").unwrap();

        let args = Args::from(vec![
            "-i".to_string(),
            one.display().to_string(),
            "-o".to_string(),
            dir.path().display().to_string(),
            "-u".to_string(),
        ]);

        let outputs = join_alignments(args).unwrap();
        let merged = read_alignment(&outputs[0]).unwrap();
        assert_eq!(merged[0].seq, b"MGW".to_vec());
    }
}
