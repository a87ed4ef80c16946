use log::info;

use sp_join::lib_sp_join;
use sp_lineage::lib_sp_lineage;
use sp_orthology::lib_sp_orthology;

const KEYS: [&str; 4] = ["--dir", "--expectation", "--map", "--outdir"];

/// run the join -> orthology -> lineage pipeline in-process, threading each
/// stage's output files into the next
pub fn lib(args: Vec<String>) {
    __check_args(&args);

    let dir = value_of(&args, "--dir");
    let expectation = value_of(&args, "--expectation");
    let map = value_of(&args, "--map");
    let outdir = value_of(&args, "--outdir");

    let joined = lib_sp_join(vec![
        "-d".to_string(),
        dir,
        "-o".to_string(),
        outdir.clone(),
    ])
    .expect("ERROR: Failed to join alignments");

    let scored = lib_sp_orthology(vec![
        "-i".to_string(),
        join_paths(&joined),
        "--outdir".to_string(),
        outdir.clone(),
    ])
    .expect("ERROR: Failed to classify subfamilies");

    let filtered = lib_sp_lineage(vec![
        "-i".to_string(),
        join_paths(&scored),
        "-e".to_string(),
        expectation,
        "-m".to_string(),
        map,
        "--outdir".to_string(),
        outdir,
    ])
    .expect("ERROR: Failed to filter by lineage expectation");

    info!("Pipeline complete: {} filtered table(s)", filtered.len());
}

fn join_paths(paths: &[std::path::PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn value_of(args: &[String], key: &str) -> String {
    args.iter()
        .position(|arg| arg.as_str() == key)
        .and_then(|idx| args.get(idx + 1))
        .unwrap_or_else(|| {
            log::error!("Missing value for argument: {}", key);
            std::process::exit(1);
        })
        .clone()
}

/// Check if all required arguments are present
fn __check_args(args: &[String]) {
    for key in KEYS.iter() {
        if !args.contains(&key.to_string()) {
            log::error!("Missing required argument: {}", key);
            std::process::exit(1);
        }
    }
}
