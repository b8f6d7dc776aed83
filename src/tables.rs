//! Build every output table of a project
//!
//! All inputs are parsed before the first table is written, so a malformed
//! input never leaves a half-written output directory behind.

use crate::aggregate::aggregate_by_rank;
use crate::config::TablesConfig;
use crate::matrix::write_matrix;
use crate::normalize::percentages;
use crate::orf_table::{parse_orf_table, OrfTableOptions};
use crate::tax_table::{parse_contig_table, LineageMap, OrfTaxonomy};
use crate::taxonomy::{LineageStyle, Rank};
use crate::utils::{create_output_dir, Timer};
use crate::{SqmError, SqmResult};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Optional behaviour of [`make_tables`]
#[derive(Debug, Clone, Default)]
pub struct TablesOptions {
    /// Leave ORFs without a functional label out of the functional tables
    pub ignore_unclassified: bool,
    /// Also write the per-ORF and per-contig lineage tables
    pub write_lineages: bool,
    /// Also write TPM of individual ORFs
    pub orf_tpm: bool,
}

/// What a run produced
#[derive(Debug, Clone, Default)]
pub struct TablesSummary {
    pub samples: Vec<String>,
    pub orfs: usize,
    pub skipped_orfs: usize,
    pub unclassified_orfs: usize,
    pub contigs: usize,
    pub written: Vec<PathBuf>,
}

struct OutputDir {
    dir: PathBuf,
    project: String,
    written: Vec<PathBuf>,
}

impl OutputDir {
    fn write<K, R, V, I>(&mut self, metric: &str, columns: &[String], rows: I) -> SqmResult<()>
    where
        K: AsRef<str>,
        R: AsRef<[V]>,
        V: Display,
        I: IntoIterator<Item = (K, R)>,
    {
        let path = self.dir.join(format!("{}.{}.tsv", self.project, metric));
        write_matrix(&path, columns, rows)?;
        self.written.push(path);
        Ok(())
    }
}

fn lineage_rows(lineages: &LineageMap) -> impl Iterator<Item = (&String, [String; 7])> + '_ {
    lineages.iter().map(|(id, lineage)| (id, lineage.names()))
}

/// Parse the project tables named by `config` and write every aggregate
/// into `output_dir` as `<project>.<metric>.tsv`.
pub fn make_tables<P: AsRef<Path>>(
    config: &TablesConfig,
    output_dir: P,
    options: &TablesOptions,
) -> SqmResult<TablesSummary> {
    let orf_options = OrfTableOptions {
        annotations: config.annotations(),
        ignore_unclassified: options.ignore_unclassified,
        orf_subset: None,
    };

    let orf_table = {
        let _timer = Timer::new("Parsing ORF table");
        parse_orf_table(&config.orf_table, &orf_options)?
    };
    let samples = &orf_table.samples;

    let mut taxonomy = {
        let _timer = Timer::new("Parsing ORF taxonomy");
        OrfTaxonomy::read(config.filtered_taxonomy(), config.unfiltered_taxonomy())?
    };
    let unclassified_orfs = taxonomy.fill_missing(orf_table.orfs.keys().map(String::as_str));
    let prokfilter = taxonomy.reconciled();

    let contigs = {
        let _timer = Timer::new("Parsing contig table");
        parse_contig_table(&config.contig_table)?
    };
    if contigs.samples != *samples {
        return Err(SqmError::SampleMismatch {
            path: config.contig_table.to_string_lossy().to_string(),
            expected: samples.join(", "),
            found: contigs.samples.join(", "),
        });
    }

    create_output_dir(&output_dir)?;
    let mut out = OutputDir {
        dir: output_dir.as_ref().to_path_buf(),
        project: config.project_name.clone(),
        written: Vec::new(),
    };

    let _timer = Timer::new("Writing tables");
    for profile in &orf_table.functions {
        let name = profile.annotation.table_name();
        out.write(&format!("{}.abund", name), samples, &profile.rounded_abundances())?;
        out.write(&format!("{}.tpm", name), samples, &profile.tpm)?;
    }
    if options.orf_tpm {
        out.write("orf.tpm", samples, &orf_table.orf_tpm())?;
    }

    if options.write_lineages {
        let ranks: Vec<String> = Rank::ALL.iter().map(|r| r.name().to_string()).collect();
        out.write("orf.tax.allfilter", &ranks, lineage_rows(&taxonomy.filtered))?;
        out.write("orf.tax.nofilter", &ranks, lineage_rows(&taxonomy.unfiltered))?;
        out.write("orf.tax.prokfilter", &ranks, lineage_rows(&prokfilter))?;
        out.write("contig.tax", &ranks, lineage_rows(&contigs.lineages))?;
    }

    for rank in Rank::ALL {
        let orf_abunds = aggregate_by_rank(
            orf_table.abundance_rows(),
            &prokfilter,
            rank,
            LineageStyle::Plain,
        );
        out.write(&format!("{}.prokfilter.abund.orfs", rank), samples, &orf_abunds)?;

        let contig_abunds = aggregate_by_rank(
            contigs.abundance_rows(),
            &contigs.lineages,
            rank,
            LineageStyle::Cumulative,
        );
        out.write(&format!("{}.allfilter.abund", rank), samples, &contig_abunds)?;
        out.write(
            &format!("{}.allfilter.percent", rank),
            samples,
            &percentages(&contig_abunds),
        )?;
    }

    log::info!("Wrote {} tables to {:?}", out.written.len(), out.dir);
    Ok(TablesSummary {
        samples: samples.clone(),
        orfs: orf_table.orfs.len(),
        skipped_orfs: orf_table.skipped_rows,
        unclassified_orfs,
        contigs: contigs.abundances.len(),
        written: out.written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Project {
        _dir: tempfile::TempDir,
        config: TablesConfig,
        output: PathBuf,
    }

    fn write_lines(path: &Path, lines: &[&str]) {
        fs::write(path, lines.join("\n") + "\n").unwrap();
    }

    fn project(contig_header: &str) -> Project {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        fs::create_dir(&results).unwrap();

        write_lines(
            &results.join("13.lake.orftable"),
            &[
                "# Created by SqueezeMeta",
                "ORF\tCONTIG ID\tLENGTH NT\tKEGG ID\tCOG ID\tPFAM\tRAW READ COUNT S1\tRAW READ COUNT S2",
                "orf1\tc1\t300\tK001;K002\tCOG1\tPF1\t10\t2",
                "orf2\tc1\t100\tK001\tCOG2\tPF1\t0\t4",
                "orf3\tc2\t600\t\tCOG1\t\t6\t6",
                "rRNA1\tc2\t\t\t\t\t3\t3",
            ],
        );
        write_lines(
            &results.join("06.lake.fun3.tax.wranks"),
            &[
                "# Created by SqueezeMeta",
                "ORF\tTAX",
                "orf1\tk_Bacteria;g_Foo",
                "orf2\tk_Eukaryota;p_Chordata",
            ],
        );
        write_lines(
            &results.join("06.lake.fun3.tax.noidfilter.wranks"),
            &[
                "# Created by SqueezeMeta",
                "ORF\tTAX",
                "orf1\tk_Bacteria;g_Foo;s_Foo bar",
                "orf2\tk_Bacteria;p_Firmicutes",
            ],
        );
        write_lines(
            &results.join("19.lake.contigtable"),
            &[
                "# Created by SqueezeMeta",
                contig_header,
                "c1\tk_Bacteria;p_Firmicutes\t30\t10",
                "c2\t\t10\t30",
            ],
        );

        let config = TablesConfig {
            project_name: "lake".to_string(),
            orf_table: results.join("13.lake.orftable"),
            orf_taxonomy_prefix: results.join("06.lake.fun3.tax").to_string_lossy().to_string(),
            contig_table: results.join("19.lake.contigtable"),
            kegg: true,
            cog: false,
            pfam: true,
            double_pass: false,
        };
        let output = dir.path().join("tables");
        Project {
            _dir: dir,
            config,
            output,
        }
    }

    fn read(project: &Project, metric: &str) -> String {
        fs::read_to_string(project.output.join(format!("lake.{}.tsv", metric))).unwrap()
    }

    #[test]
    fn test_make_tables_end_to_end() {
        let project = project("Contig ID\tTax\tRaw S1\tRaw S2");
        let summary = make_tables(&project.config, &project.output, &TablesOptions::default()).unwrap();

        assert_eq!(summary.samples, vec!["S1", "S2"]);
        assert_eq!(summary.orfs, 3);
        assert_eq!(summary.skipped_orfs, 1);
        assert_eq!(summary.unclassified_orfs, 1);
        assert_eq!(summary.contigs, 2);
        // KO and PFAM (abund + tpm), three taxonomic tables per rank.
        assert_eq!(summary.written.len(), 4 + 3 * 7);
        assert!(summary.written.iter().all(|p| p.exists()));
        assert!(!project.output.join("lake.COG.abund.tsv").exists());

        assert_eq!(
            read(&project, "KO.abund"),
            "\tS1\tS2\nK001\t5\t5\nK002\t5\t1\nUnclassified\t6\t6\n"
        );
        assert_eq!(
            read(&project, "superkingdom.prokfilter.abund.orfs"),
            "\tS1\tS2\nBacteria\t10\t2\nEukaryota\t0\t4\nUnclassified\t6\t6\n"
        );
        assert_eq!(
            read(&project, "superkingdom.allfilter.percent"),
            "\tS1\tS2\nk_Bacteria\t75\t25\nk_Unclassified\t25\t75\n"
        );
        assert!(read(&project, "genus.prokfilter.abund.orfs").contains("\nFoo\t10\t2\n"));
        assert!(read(&project, "phylum.allfilter.abund")
            .contains("\nk_Bacteria;p_Firmicutes\t30\t10\n"));
    }

    #[test]
    fn test_tpm_columns_sum_to_a_million() {
        let project = project("Contig ID\tTax\tRaw S1\tRaw S2");
        make_tables(&project.config, &project.output, &TablesOptions::default()).unwrap();

        let tpm = read(&project, "KO.tpm");
        let mut totals = [0.0f64; 2];
        for line in tpm.lines().skip(1) {
            for (total, value) in totals.iter_mut().zip(line.split('\t').skip(1)) {
                *total += value.parse::<f64>().unwrap();
            }
        }
        for total in totals {
            assert!((total - 1_000_000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_optional_tables() {
        let project = project("Contig ID\tTax\tRaw S1\tRaw S2");
        let options = TablesOptions {
            ignore_unclassified: true,
            write_lineages: true,
            orf_tpm: true,
        };
        let summary = make_tables(&project.config, &project.output, &options).unwrap();
        assert_eq!(summary.written.len(), 4 + 1 + 4 + 3 * 7);

        assert!(!read(&project, "KO.abund").contains(crate::UNCLASSIFIED));
        let prokfilter = read(&project, "orf.tax.prokfilter");
        assert!(prokfilter.starts_with("\tsuperkingdom\tphylum\tclass\torder\tfamily\tgenus\tspecies\n"));
        assert!(prokfilter.contains("\norf2\tEukaryota\tChordata\t"));
        assert!(read(&project, "orf.tpm").contains("\norf3\t"));
    }

    #[test]
    fn test_sample_mismatch_is_fatal() {
        let project = project("Contig ID\tTax\tRaw S2\tRaw S1");
        assert!(matches!(
            make_tables(&project.config, &project.output, &TablesOptions::default()),
            Err(SqmError::SampleMismatch { .. })
        ));
        assert!(!project.output.exists());
    }
}
