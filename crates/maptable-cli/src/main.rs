use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, Command};
use maptable_core::{init_tracing, ConvertConfig};

fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("maptable")
        .version(maptable_core::VERSION)
        .about("Convert slice-based Go table tests into map-based table tests")
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Go test file or directory to convert")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Report what would change without writing files")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let target = matches
        .get_one::<String>("target")
        .map(PathBuf::from)
        .unwrap_or_default();
    let dry_run = matches.get_flag("dry-run");

    init_tracing(matches.get_flag("debug"));

    let config = ConvertConfig::default().dry_run(dry_run);
    let summary = maptable_cli::run(&target, config)?;

    println!(
        "Processed {} file(s): {} converted, {} table(s), {} loop(s) updated",
        summary.files_processed,
        summary.files_converted,
        summary.tables_converted,
        summary.loops_rewritten
    );
    if dry_run {
        println!("Dry run: no files were written");
    }
    println!("Conversion complete!");
    Ok(())
}
