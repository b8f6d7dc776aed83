//! ORF table parsing and functional aggregation
//!
//! The ORF table (`13.<project>.orftable`) has one row per gene with its
//! nucleotide length, its KEGG/COG/PFAM annotations and one raw read count
//! column per sample. Parsing yields the per-ORF counts and, for every
//! enabled annotation system, the counts summed per functional label.

use crate::header::{line_of, parse_counts, required_field, TableHeader};
use crate::normalize;
use crate::utils::tsv_reader;
use crate::{SqmError, SqmResult, UNCLASSIFIED};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Marker identifying raw read count columns in the ORF table header
pub const ORF_SAMPLE_MARKER: &str = "RAW READ COUNT";

/// Functional annotation systems present in the ORF table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Annotation {
    Kegg,
    Cog,
    Pfam,
}

impl Annotation {
    pub const ALL: [Annotation; 3] = [Annotation::Kegg, Annotation::Cog, Annotation::Pfam];

    /// ORF table column holding the labels
    pub fn column(self) -> &'static str {
        match self {
            Annotation::Kegg => "KEGG ID",
            Annotation::Cog => "COG ID",
            Annotation::Pfam => "PFAM",
        }
    }

    /// Name used in output file names
    pub fn table_name(self) -> &'static str {
        match self {
            Annotation::Kegg => "KO",
            Annotation::Cog => "COG",
            Annotation::Pfam => "PFAM",
        }
    }
}

/// Counts of a single ORF, one entry per sample
#[derive(Debug, Clone, PartialEq)]
pub struct OrfRecord {
    /// Nucleotide length, always positive
    pub length: u64,
    pub abundances: Vec<u64>,
    /// 1 where the ORF has reads in the sample, else 0
    pub copies: Vec<u32>,
    /// `length` where the ORF has reads in the sample, else 0
    pub lengths: Vec<u64>,
}

impl OrfRecord {
    pub fn new(length: u64, abundances: Vec<u64>) -> Self {
        let copies: Vec<u32> = abundances.iter().map(|&a| u32::from(a > 0)).collect();
        let lengths = copies.iter().map(|&c| length * u64::from(c)).collect();
        OrfRecord {
            length,
            abundances,
            copies,
            lengths,
        }
    }

    pub fn n_samples(&self) -> usize {
        self.abundances.len()
    }
}

/// Counts accumulated over every ORF sharing a functional label.
///
/// All three vectors are sized once at construction and indexed by sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCounts {
    pub abundances: Vec<f64>,
    pub copies: Vec<u32>,
    pub lengths: Vec<f64>,
}

impl FeatureCounts {
    pub fn new(n_samples: usize) -> Self {
        FeatureCounts {
            abundances: vec![0.0; n_samples],
            copies: vec![0; n_samples],
            lengths: vec![0.0; n_samples],
        }
    }

    pub fn n_samples(&self) -> usize {
        self.abundances.len()
    }

    /// Add one of `parts` equal shares of an ORF.
    ///
    /// Reads and length are divided between the labels of a multi-label ORF,
    /// but each label still counts one full copy: the ORF is treated as
    /// `parts` smaller genes, each present wherever the ORF is.
    pub fn add_share(&mut self, orf: &OrfRecord, parts: usize) {
        debug_assert_eq!(self.n_samples(), orf.n_samples());
        let parts = parts.max(1) as f64;
        for i in 0..self.n_samples() {
            self.abundances[i] += orf.abundances[i] as f64 / parts;
            self.copies[i] += orf.copies[i];
            self.lengths[i] += orf.lengths[i] as f64 / parts;
        }
    }

    /// Abundances rounded to the nearest integer, ties to even
    pub fn rounded_abundances(&self) -> Vec<u64> {
        self.abundances
            .iter()
            .map(|a| a.round_ties_even().max(0.0) as u64)
            .collect()
    }
}

impl From<&OrfRecord> for FeatureCounts {
    fn from(orf: &OrfRecord) -> Self {
        let mut counts = FeatureCounts::new(orf.n_samples());
        counts.add_share(orf, 1);
        counts
    }
}

/// Aggregated counts for one annotation system
#[derive(Debug, Clone)]
pub struct FunctionalProfile {
    pub annotation: Annotation,
    pub features: BTreeMap<String, FeatureCounts>,
    pub tpm: BTreeMap<String, Vec<f64>>,
}

impl FunctionalProfile {
    fn new(annotation: Annotation, features: BTreeMap<String, FeatureCounts>) -> Self {
        let tpm = normalize::tpm(&features);
        FunctionalProfile {
            annotation,
            features,
            tpm,
        }
    }

    /// Per-label abundances rounded for the `.abund` tables
    pub fn rounded_abundances(&self) -> BTreeMap<String, Vec<u64>> {
        self.features
            .iter()
            .map(|(label, counts)| (label.clone(), counts.rounded_abundances()))
            .collect()
    }
}

/// What to aggregate while reading the ORF table
#[derive(Debug, Clone)]
pub struct OrfTableOptions {
    pub annotations: Vec<Annotation>,
    /// Drop "Unclassified" labels instead of aggregating them
    pub ignore_unclassified: bool,
    /// Only keep these ORFs when set
    pub orf_subset: Option<HashSet<String>>,
}

impl Default for OrfTableOptions {
    fn default() -> Self {
        Self {
            annotations: Annotation::ALL.to_vec(),
            ignore_unclassified: false,
            orf_subset: None,
        }
    }
}

/// Parsed ORF table
#[derive(Debug, Clone)]
pub struct OrfTable {
    pub samples: Vec<String>,
    pub orfs: HashMap<String, OrfRecord>,
    pub functions: Vec<FunctionalProfile>,
    /// Rows skipped because they had no nucleotide length
    pub skipped_rows: usize,
}

impl OrfTable {
    pub fn function(&self, annotation: Annotation) -> Option<&FunctionalProfile> {
        self.functions.iter().find(|f| f.annotation == annotation)
    }

    /// Raw abundances keyed by ORF id
    pub fn abundance_rows(&self) -> impl Iterator<Item = (&str, &[u64])> + '_ {
        self.orfs
            .iter()
            .map(|(id, orf)| (id.as_str(), orf.abundances.as_slice()))
    }

    /// TPM of the individual ORFs
    pub fn orf_tpm(&self) -> BTreeMap<String, Vec<f64>> {
        let counts: BTreeMap<String, FeatureCounts> = self
            .orfs
            .iter()
            .map(|(id, orf)| (id.clone(), FeatureCounts::from(orf)))
            .collect();
        normalize::tpm(&counts)
    }
}

/// Split an annotation field into its labels.
///
/// `*` flags are dropped and an empty field yields the single label
/// "Unclassified".
pub fn split_labels(field: &str) -> Vec<String> {
    let cleaned = field.replace('*', "");
    let labels: Vec<String> = cleaned
        .trim()
        .trim_matches(';')
        .split(';')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        vec![UNCLASSIFIED.to_string()]
    } else {
        labels
    }
}

fn add_to_features(
    features: &mut BTreeMap<String, FeatureCounts>,
    labels: &[String],
    orf: &OrfRecord,
    ignore_unclassified: bool,
) {
    for label in labels {
        if ignore_unclassified && label == UNCLASSIFIED {
            continue;
        }
        features
            .entry(label.clone())
            .or_insert_with(|| FeatureCounts::new(orf.n_samples()))
            .add_share(orf, labels.len());
    }
}

/// Stream the ORF table and aggregate it per functional label
pub fn parse_orf_table<P: AsRef<Path>>(path: P, options: &OrfTableOptions) -> SqmResult<OrfTable> {
    let path_str = path.as_ref().to_string_lossy().to_string();
    let mut reader = tsv_reader(&path)?;
    let header = TableHeader::read(&mut reader, &path_str)?;

    let orf_idx = header.column("ORF")?;
    let length_idx = header.column("LENGTH NT")?;
    let sample_columns = header.sample_columns(ORF_SAMPLE_MARKER)?;
    let annotation_idx: Vec<(Annotation, usize)> = options
        .annotations
        .iter()
        .map(|&a| header.column(a.column()).map(|idx| (a, idx)))
        .collect::<SqmResult<_>>()?;

    let samples: Vec<String> = sample_columns.iter().map(|(_, s)| s.clone()).collect();
    log::info!("ORF table {} has {} samples: {:?}", path_str, samples.len(), samples);

    let mut orfs = HashMap::new();
    let mut features: Vec<BTreeMap<String, FeatureCounts>> =
        vec![BTreeMap::new(); annotation_idx.len()];
    let mut skipped_rows = 0;

    for result in reader.records() {
        let record = result?;
        let orf_id = required_field(&record, orf_idx, &header)?;

        if let Some(subset) = &options.orf_subset {
            if !subset.contains(orf_id) {
                continue;
            }
        }

        // rRNAs and tRNAs are listed without a nucleotide length.
        let length_field = record.get(length_idx).unwrap_or("");
        let length = if length_field.is_empty() {
            0
        } else {
            length_field
                .parse::<u64>()
                .map_err(|_| SqmError::InvalidRecord {
                    path: path_str.clone(),
                    line: line_of(&record),
                    reason: format!("invalid length '{}' for ORF {}", length_field, orf_id),
                })?
        };
        if length == 0 {
            log::warn!(
                "Skipping ORF {} without length ({}, line {})",
                orf_id,
                path_str,
                line_of(&record)
            );
            skipped_rows += 1;
            continue;
        }

        let orf = OrfRecord::new(length, parse_counts(&record, &sample_columns, &header)?);

        for (pos, (_, idx)) in annotation_idx.iter().enumerate() {
            let labels = split_labels(record.get(*idx).unwrap_or(""));
            add_to_features(&mut features[pos], &labels, &orf, options.ignore_unclassified);
        }

        orfs.insert(orf_id.to_string(), orf);
    }

    log::info!(
        "Read {} ORFs from {} ({} rows without length skipped)",
        orfs.len(),
        path_str,
        skipped_rows
    );

    let functions = annotation_idx
        .iter()
        .zip(features)
        .map(|((annotation, _), features)| {
            log::info!("{} labels: {}", annotation.table_name(), features.len());
            FunctionalProfile::new(*annotation, features)
        })
        .collect();

    Ok(OrfTable {
        samples,
        orfs,
        functions,
        skipped_rows,
    })
}
