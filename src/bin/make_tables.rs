//! CLI binary that aggregates a SqueezeMeta project into abundance tables

use clap::Parser;
use env_logger::Env;
use sqmtables_rs::{
    config::TablesConfig,
    tables::{make_tables, TablesOptions},
    SqmError, SqmResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "make_tables")]
#[command(about = "Aggregate SqueezeMeta results into functional and taxonomic tables")]
#[command(long_about = "
Reads the ORF table, the per-ORF taxonomy (identity-filtered and unfiltered)
and the contig table of a SqueezeMeta project and writes tab-separated matrices
with one column per sample:

  <project>.KO.abund.tsv / .KO.tpm.tsv        (and COG, PFAM when annotated)
  <project>.<rank>.prokfilter.abund.orfs.tsv  ORF reads per taxon
  <project>.<rank>.allfilter.abund.tsv        contig reads per taxon
  <project>.<rank>.allfilter.percent.tsv      the same as percentages

Input paths and annotation switches are taken from the project's
SqueezeMeta_conf.pl.
")]
struct Args {
    /// Base path of the SqueezeMeta project
    #[arg(value_name = "PROJECT_PATH")]
    project_path: PathBuf,

    /// Output directory
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Ignore ORFs without assigned functions in TPM calculation
    #[arg(long)]
    ignore_unclassified: bool,

    /// Also write per-ORF and per-contig lineage tables
    #[arg(long)]
    write_lineages: bool,

    /// Also write TPM of individual ORFs
    #[arg(long)]
    orf_tpm: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn tables_options(&self) -> TablesOptions {
        TablesOptions {
            ignore_unclassified: self.ignore_unclassified,
            write_lineages: self.write_lineages,
            orf_tpm: self.orf_tpm,
        }
    }
}

fn run() -> SqmResult<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    log::info!("Project: {:?}", args.project_path);
    log::info!("Output directory: {:?}", args.output_dir);

    let config = TablesConfig::from_project(&args.project_path)?;
    config.validate()?;
    log::info!("Configuration: {:?}", config);

    let summary = make_tables(&config, &args.output_dir, &args.tables_options())?;

    log::info!("Samples: {}", summary.samples.join(", "));
    log::info!(
        "ORFs: {} ({} without length skipped, {} without taxonomy)",
        summary.orfs,
        summary.skipped_orfs,
        summary.unclassified_orfs
    );
    log::info!("Contigs: {}", summary.contigs);
    for path in &summary.written {
        log::debug!("  {}", path.display());
    }
    log::info!("Wrote {} tables to {:?}", summary.written.len(), args.output_dir);

    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: SqmError) -> ! {
    match error {
        SqmError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check the project path and that the SqueezeMeta run finished.");
        }
        SqmError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Please check the project's SqueezeMeta_conf.pl.");
        }
        e @ (SqmError::MalformedHeader { .. } | SqmError::MissingColumn { .. }) => {
            eprintln!("Error: {}", e);
            eprintln!("The table header does not match the expected SqueezeMeta format.");
        }
        e @ SqmError::InvalidRecord { .. } => {
            eprintln!("Error: {}", e);
        }
        e @ SqmError::SampleMismatch { .. } => {
            eprintln!("Error: {}", e);
            eprintln!("All tables of a project must list the same samples in the same order.");
        }
        SqmError::Csv(ref e) => {
            eprintln!("Error: Table parsing error: {}", e);
        }
        SqmError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let args = Args::parse_from([
            "make_tables",
            "/data/lake",
            "/data/lake/tables",
            "--ignore-unclassified",
            "-v",
        ]);
        assert_eq!(args.project_path, PathBuf::from("/data/lake"));
        assert!(args.verbose);

        let options = args.tables_options();
        assert!(options.ignore_unclassified);
        assert!(!options.write_lineages);
        assert!(!options.orf_tpm);
    }

    #[test]
    fn test_output_dir_is_required() {
        assert!(Args::try_parse_from(["make_tables", "/data/lake"]).is_err());
    }
}
