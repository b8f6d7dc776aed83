//! Per-ORF and per-contig taxonomy tables
//!
//! ORF taxonomies come in two flavours: the identity-filtered assignment
//! (`<prefix>.wranks`) and the unfiltered one (`<prefix>.noidfilter.wranks`).
//! [`OrfTaxonomy::reconciled`] keeps the filtered lineage whenever either of
//! them places the ORF in Bacteria or Archaea.

use crate::header::{line_of, parse_counts, required_field, TableHeader};
use crate::taxonomy::Lineage;
use crate::utils::tsv_reader;
use crate::{SqmError, SqmResult};
use std::collections::HashMap;
use std::path::Path;

/// Marker identifying raw read count columns in the contig table header
pub const CONTIG_SAMPLE_MARKER: &str = "Raw";

/// Taxonomy substituted for rows that carry no taxonomy string
pub const NO_RANK_UNCLASSIFIED: &str = "n_Unclassified";

pub type LineageMap = HashMap<String, Lineage>;

/// Read a per-ORF taxonomy table.
///
/// Each row holds an ORF id, optionally followed by its taxonomy string. A
/// bare id means the ORF could not be classified at all.
pub fn parse_orf_taxonomy<P: AsRef<Path>>(path: P) -> SqmResult<LineageMap> {
    let path_str = path.as_ref().to_string_lossy().to_string();
    let mut reader = tsv_reader(&path)?;
    TableHeader::read(&mut reader, &path_str)?;

    let mut lineages = HashMap::new();
    for result in reader.records() {
        let record = result?;
        let (orf, tax) = match record.len() {
            1 => (&record[0], NO_RANK_UNCLASSIFIED),
            2 => (&record[0], &record[1]),
            n => {
                return Err(SqmError::InvalidRecord {
                    path: path_str,
                    line: line_of(&record),
                    reason: format!("expected an ORF id and a taxonomy string, found {} fields", n),
                })
            }
        };
        if orf.is_empty() {
            return Err(SqmError::InvalidRecord {
                path: path_str,
                line: line_of(&record),
                reason: "empty ORF id".to_string(),
            });
        }
        lineages.insert(orf.to_string(), Lineage::resolve(tax));
    }

    log::info!("Read {} ORF taxonomies from {}", lineages.len(), path_str);
    Ok(lineages)
}

/// Pick between the filtered and unfiltered lineage of one entity
pub fn reconcile<'a>(filtered: &'a Lineage, unfiltered: &'a Lineage) -> &'a Lineage {
    if filtered.is_prokaryotic() || unfiltered.is_prokaryotic() {
        filtered
    } else {
        unfiltered
    }
}

/// Filtered and unfiltered ORF lineages
#[derive(Debug, Clone, Default)]
pub struct OrfTaxonomy {
    pub filtered: LineageMap,
    pub unfiltered: LineageMap,
}

impl OrfTaxonomy {
    pub fn read<P: AsRef<Path>>(filtered: P, unfiltered: P) -> SqmResult<Self> {
        Ok(OrfTaxonomy {
            filtered: parse_orf_taxonomy(filtered)?,
            unfiltered: parse_orf_taxonomy(unfiltered)?,
        })
    }

    /// Mark every ORF missing from either table as unclassified in both.
    /// Returns how many ORFs were filled in.
    pub fn fill_missing<'a, I>(&mut self, orf_ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut filled = 0;
        for orf in orf_ids {
            if self.filtered.contains_key(orf) && self.unfiltered.contains_key(orf) {
                continue;
            }
            self.filtered.insert(orf.to_string(), Lineage::unclassified());
            self.unfiltered.insert(orf.to_string(), Lineage::unclassified());
            filled += 1;
        }
        if filled > 0 {
            log::info!("{} ORFs without taxonomy set to Unclassified", filled);
        }
        filled
    }

    /// One lineage per ORF following [`reconcile`]. An ORF present in only
    /// one table is compared against an unclassified lineage.
    pub fn reconciled(&self) -> LineageMap {
        let unclassified = Lineage::unclassified();
        let mut lineages: LineageMap = HashMap::with_capacity(self.filtered.len());

        for (orf, filtered) in &self.filtered {
            let unfiltered = self.unfiltered.get(orf).unwrap_or(&unclassified);
            lineages.insert(orf.clone(), reconcile(filtered, unfiltered).clone());
        }
        for (orf, unfiltered) in &self.unfiltered {
            if !self.filtered.contains_key(orf) {
                lineages.insert(orf.clone(), reconcile(&unclassified, unfiltered).clone());
            }
        }
        lineages
    }
}

/// Parsed contig table
#[derive(Debug, Clone)]
pub struct ContigTable {
    pub samples: Vec<String>,
    pub abundances: HashMap<String, Vec<u64>>,
    pub lineages: LineageMap,
}

impl ContigTable {
    /// Raw abundances keyed by contig id
    pub fn abundance_rows(&self) -> impl Iterator<Item = (&str, &[u64])> + '_ {
        self.abundances
            .iter()
            .map(|(id, counts)| (id.as_str(), counts.as_slice()))
    }
}

/// Read the contig table (`19.<project>.contigtable`)
pub fn parse_contig_table<P: AsRef<Path>>(path: P) -> SqmResult<ContigTable> {
    let path_str = path.as_ref().to_string_lossy().to_string();
    let mut reader = tsv_reader(&path)?;
    let header = TableHeader::read(&mut reader, &path_str)?;

    let contig_idx = header.column("Contig ID")?;
    let tax_idx = header.column("Tax")?;
    let sample_columns = header.sample_columns(CONTIG_SAMPLE_MARKER)?;
    let samples: Vec<String> = sample_columns.iter().map(|(_, s)| s.clone()).collect();

    let mut abundances = HashMap::new();
    let mut lineages = HashMap::new();
    for result in reader.records() {
        let record = result?;
        let contig = required_field(&record, contig_idx, &header)?.to_string();
        let tax = match record.get(tax_idx).unwrap_or("") {
            "" => NO_RANK_UNCLASSIFIED,
            tax => tax,
        };
        lineages.insert(contig.clone(), Lineage::resolve(tax));
        abundances.insert(contig, parse_counts(&record, &sample_columns, &header)?);
    }

    log::info!("Read {} contigs from {}", abundances.len(), path_str);
    Ok(ContigTable {
        samples,
        abundances,
        lineages,
    })
}
