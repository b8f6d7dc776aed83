//! # sqmtables - SqueezeMeta table aggregation
//!
//! Aggregates per-ORF read counts produced by the SqueezeMeta pipeline into
//! functional (KEGG/COG/PFAM) abundance and TPM matrices, and into per-rank
//! taxonomic abundance and percentage matrices.

pub mod aggregate;
pub mod config;
pub mod header;
pub mod matrix;
pub mod normalize;
pub mod orf_table;
pub mod tables;
pub mod tax_table;
pub mod taxonomy;
pub mod utils;

use std::fmt::Display;
use std::ops::AddAssign;

/// Label used for ORFs or taxa without any assignment
pub const UNCLASSIFIED: &str = "Unclassified";

/// Numeric cell type of an abundance matrix.
///
/// Raw counts stay integral (`u64`) all the way to the output tables, while
/// split or normalised values are carried as `f64`.
pub trait Abundance: Copy + Default + AddAssign + Display {
    fn as_f64(self) -> f64;
}

impl Abundance for u64 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Abundance for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

/// Add `other` into `acc` element-wise. Both vectors are indexed by sample.
pub fn add_assign_samples<T: Abundance>(acc: &mut [T], other: &[T]) {
    debug_assert_eq!(acc.len(), other.len());
    for (a, b) in acc.iter_mut().zip(other) {
        *a += *b;
    }
}

/// Error types for the sqmtables library
#[derive(Debug, thiserror::Error)]
pub enum SqmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Malformed header in {path}: {reason}")]
    MalformedHeader { path: String, reason: String },

    #[error("Column '{column}' not found in header of {path}")]
    MissingColumn { path: String, column: String },

    #[error("Invalid record in {path}, line {line}: {reason}")]
    InvalidRecord {
        path: String,
        line: u64,
        reason: String,
    },

    #[error("Samples in {path} ({found}) do not match the ORF table samples ({expected})")]
    SampleMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SqmResult<T> = Result<T, SqmError>;
