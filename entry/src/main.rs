/// selenotools: utilities for the selenoprofiles annotation pipeline
///
/// This is the entry point for the selenotools CLI.
/// It is responsible for parsing the CLI arguments
/// and executing the appropriate subcommand [sp-tool].
///
/// This wrapper offers 5 different subcommands:
/// - sp-assess
/// - sp-join
/// - sp-orthology
/// - sp-lineage
/// - run
///
/// Each subcommand offers a different stage of the post-processing of
/// selenoprofiles results: assessing predictions against a reference
/// genome annotation, joining per-target alignments, classifying
/// predictions into orthologous subfamilies, and filtering them by
/// phylogenetic expectation. 'run' chains join, orthology and lineage
/// over a results folder in one go.
///
/// To get help on the subcommands, you can run:
///
/// ```shell
/// selenotools sp-assess -- --help
/// ```
///
use clap::{Args, Parser, Subcommand};
use log::{error, info, Level};
use selenotools::lib;
use simple_logger::init_with_level;

use std::process::Command;

const ENTRY: &str = env!("CARGO_MANIFEST_DIR");
const RELEASES: &str = "target/release";

const HELP: &str = r#"
Usage: selenotools run --dir <PATH> --expectation <PATH> --map <PATH> --outdir <DIR>

 Options:
  --dir <PATH>                Selenoprofiles output folder scanned for .ali results
  --expectation <PATH>        Expectation table with one count column per subfamily [csv]
  --map <PATH>                Species-to-lineage table [tsv]
  --outdir <DIR>              Output directory for the joined/classified/filtered results
  -h, --help                  Print help
"#;

#[derive(Parser)]
#[command(name = "selenotools")]
#[command(about = "selenotools: utilities for the selenoprofiles annotation pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "sp-assess")]
    Assess(SpArgs),
    #[command(name = "sp-join")]
    Join(SpArgs),
    #[command(name = "sp-orthology")]
    Orthology(SpArgs),
    #[command(name = "sp-lineage")]
    Lineage(SpArgs),
    #[command(name = "run")]
    Run(SpArgs),
}

#[derive(Args)]
struct SpArgs {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, help = HELP)]
    args: Vec<String>,
}

fn main() {
    init_with_level(Level::Info).unwrap();
    let cli = Cli::parse();

    init();

    let (cmd, args) = match cli.command {
        Commands::Assess(args) => ("sp-assess", args.args),
        Commands::Join(args) => ("sp-join", args.args),
        Commands::Orthology(args) => ("sp-orthology", args.args),
        Commands::Lineage(args) => ("sp-lineage", args.args),
        Commands::Run(args) => ("run", args.args),
    };

    match cmd {
        "run" => lib(args),
        _ => {
            let package = std::path::Path::new(ENTRY)
                .parent()
                .expect("ERROR: Could not get parent dir")
                .join(RELEASES)
                .join(cmd);

            if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
                let output = Command::new(package)
                    .arg("--help")
                    .output()
                    .expect("ERROR: Failed to execute process");

                check_output(output);
            } else {
                let output = Command::new(package)
                    .args(args)
                    .output()
                    .expect("ERROR: Failed to execute process");

                check_output(output);
            }
        }
    }
}

fn check_output(output: std::process::Output) {
    if output.status.success() {
        info!("{}", String::from_utf8_lossy(&output.stdout));
    } else {
        error!("{}", String::from_utf8_lossy(&output.stderr));
        std::process::exit(1);
    }
}

fn init() {
    let message = format!(
        r#"

        selenotools: utilities for the selenoprofiles annotation pipeline

        this is the entry point for the selenotools CLI
        and it is responsible for parsing the CLI arguments
        for each sp-tool:

        - sp-assess
        - sp-join
        - sp-orthology
        - sp-lineage

        > version: {}

        for any bug, please open an issue on the repository.

        * to get help on the subcommands, run:
            selenotools <SUBCOMMAND> -- --help

        "#,
        env!("CARGO_PKG_VERSION")
    );

    println!("{}", message);
}
