//! Per-sample normalisation: RPK, TPM and percentages
//!
//! Every metric is computed column-wise; values from different samples are
//! never combined.

use crate::orf_table::FeatureCounts;
use crate::Abundance;
use std::collections::BTreeMap;

/// Average feature length per sample.
///
/// `None` marks samples where the feature has no copies, where the average
/// is undefined.
pub fn average_lengths(counts: &FeatureCounts) -> Vec<Option<f64>> {
    counts
        .lengths
        .iter()
        .zip(&counts.copies)
        .map(|(&length, &copies)| (copies > 0).then(|| length / f64::from(copies)))
        .collect()
}

/// Reads per kilobase of average feature length. Undefined values become 0.
pub fn rpk(counts: &FeatureCounts) -> Vec<f64> {
    counts
        .abundances
        .iter()
        .zip(average_lengths(counts))
        .map(|(&abundance, avg_length)| match avg_length {
            Some(length) if length > 0.0 => abundance / (length / 1000.0),
            _ => 0.0,
        })
        .collect()
}

/// Sum of each sample column over all rows
pub fn column_totals<T: Abundance>(rows: &BTreeMap<String, Vec<T>>) -> Vec<f64> {
    let n_samples = rows.values().next().map(Vec::len).unwrap_or(0);
    let mut totals = vec![0.0; n_samples];
    for values in rows.values() {
        for (total, value) in totals.iter_mut().zip(values) {
            *total += value.as_f64();
        }
    }
    totals
}

/// Rescale every sample column so it sums to `scale`.
///
/// A column summing to zero has nothing to distribute and stays all zero.
pub fn normalize_to_scale<T: Abundance>(
    rows: &BTreeMap<String, Vec<T>>,
    scale: f64,
) -> BTreeMap<String, Vec<f64>> {
    let totals = column_totals(rows);
    rows.iter()
        .map(|(key, values)| {
            let scaled = values
                .iter()
                .zip(&totals)
                .map(|(value, &total)| {
                    if total > 0.0 {
                        value.as_f64() / total * scale
                    } else {
                        0.0
                    }
                })
                .collect();
            (key.clone(), scaled)
        })
        .collect()
}

/// Percentage of each sample's total
pub fn percentages<T: Abundance>(rows: &BTreeMap<String, Vec<T>>) -> BTreeMap<String, Vec<f64>> {
    normalize_to_scale(rows, 100.0)
}

/// Transcripts per million computed from each feature's RPK
pub fn tpm(features: &BTreeMap<String, FeatureCounts>) -> BTreeMap<String, Vec<f64>> {
    let rpks: BTreeMap<String, Vec<f64>> = features
        .iter()
        .map(|(key, counts)| (key.clone(), rpk(counts)))
        .collect();
    normalize_to_scale(&rpks, 1_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows<T: Clone>(entries: &[(&str, Vec<T>)]) -> BTreeMap<String, Vec<T>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_average_lengths_undefined_without_copies() {
        let counts = FeatureCounts {
            abundances: vec![10.0, 0.0],
            copies: vec![2, 0],
            lengths: vec![900.0, 0.0],
        };
        assert_eq!(average_lengths(&counts), vec![Some(450.0), None]);
        assert_eq!(rpk(&counts), vec![10.0 / 0.45, 0.0]);
    }

    #[test]
    fn test_normalize_to_scale_column_sums() {
        let abund = rows(&[
            ("Bacteria", vec![10u64, 0, 7]),
            ("Archaea", vec![5, 3, 0]),
            ("Unclassified", vec![1, 9, 2]),
        ]);
        for scale in [100.0, 1_000_000.0] {
            let normalized = normalize_to_scale(&abund, scale);
            for total in column_totals(&normalized) {
                assert!((total - scale).abs() < 1e-9 * scale);
            }
        }
    }

    #[test]
    fn test_normalize_does_not_mix_samples() {
        let abund = rows(&[("a", vec![1u64, 30]), ("b", vec![3, 10])]);
        let pct = percentages(&abund);
        assert_eq!(pct["a"], vec![25.0, 75.0]);
        assert_eq!(pct["b"], vec![75.0, 25.0]);
    }

    #[test]
    fn test_normalize_all_zero_column() {
        let abund = rows(&[("a", vec![0u64, 4]), ("b", vec![0, 4])]);
        let pct = percentages(&abund);
        assert_eq!(pct["a"], vec![0.0, 50.0]);
        assert!(pct.values().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_normalize_empty() {
        let empty: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        assert!(normalize_to_scale(&empty, 100.0).is_empty());
        assert!(column_totals(&empty).is_empty());
    }

    #[test]
    fn test_tpm_weights_by_length() {
        let mut features = BTreeMap::new();
        features.insert(
            "short".to_string(),
            FeatureCounts {
                abundances: vec![10.0],
                copies: vec![1],
                lengths: vec![500.0],
            },
        );
        features.insert(
            "long".to_string(),
            FeatureCounts {
                abundances: vec![10.0],
                copies: vec![1],
                lengths: vec![2000.0],
            },
        );
        let tpm = tpm(&features);
        assert!((tpm["short"][0] - 800_000.0).abs() < 1e-6);
        assert!((tpm["long"][0] - 200_000.0).abs() < 1e-6);
    }
}
