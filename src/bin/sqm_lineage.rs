//! Resolve SqueezeMeta taxonomy strings into rank-complete lineages

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use serde::Serialize;
use sqmtables_rs::taxonomy::Lineage;
use sqmtables_rs::utils::open_table;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqm_lineage")]
#[command(about = "Resolve taxonomy strings into seven-rank lineages")]
#[command(long_about = "
Reads lines of the form `<id>\\t<taxonomy>` (for example an ORF taxonomy
.wranks file) and writes one row per id with the superkingdom to species
names. Ranks missing in the string are inherited from the nearest classified
rank below them or marked Unclassified. A line with only an id is treated as
fully unclassified.
")]
struct Args {
    /// Input table, plain or gzipped; stdin when omitted
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output TSV; stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write cumulative rank-prefixed lineages (k_...;p_...)
    #[arg(long)]
    cumulative: bool,

    /// Number of header lines to skip
    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct LineageRow<'a> {
    id: &'a str,
    superkingdom: &'a str,
    phylum: &'a str,
    class: &'a str,
    order: &'a str,
    family: &'a str,
    genus: &'a str,
    species: &'a str,
}

impl<'a> LineageRow<'a> {
    fn new(id: &'a str, names: &'a [String; 7]) -> Self {
        LineageRow {
            id,
            superkingdom: &names[0],
            phylum: &names[1],
            class: &names[2],
            order: &names[3],
            family: &names[4],
            genus: &names[5],
            species: &names[6],
        }
    }
}

fn resolve_lines<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    skip: usize,
    cumulative: bool,
) -> Result<usize> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);

    let mut resolved = 0;
    for (n, line) in reader.lines().enumerate().skip(skip) {
        let line = line.with_context(|| format!("reading line {}", n + 1))?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let (id, tax) = line.split_once('\t').unwrap_or((line, ""));
        let lineage = Lineage::resolve(tax);
        let names = if cumulative {
            lineage.cumulative()
        } else {
            lineage.names()
        };
        out.serialize(LineageRow::new(id, &names))
            .with_context(|| format!("writing lineage of {}", id))?;
        resolved += 1;
    }
    out.flush()?;
    Ok(resolved)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => open_table(path).with_context(|| format!("opening {}", path.display()))?,
        None => Box::new(io::stdin().lock()),
    };
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let resolved = resolve_lines(reader, writer, args.skip, args.cumulative)?;
    log::info!("Resolved {} lineages", resolved);
    Ok(())
}
