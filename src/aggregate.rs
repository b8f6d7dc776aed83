//! Roll entity abundances up to taxa at a given rank

use crate::taxonomy::{Lineage, LineageStyle, Rank};
use crate::{add_assign_samples, Abundance};
use std::collections::{BTreeMap, HashMap};

/// Sum abundances of ORFs or contigs per taxon at `rank`.
///
/// Entities without a lineage are left out of the totals.
pub fn aggregate_by_rank<'a, T, I>(
    entities: I,
    lineages: &HashMap<String, Lineage>,
    rank: Rank,
    style: LineageStyle,
) -> BTreeMap<String, Vec<T>>
where
    T: Abundance + 'a,
    I: IntoIterator<Item = (&'a str, &'a [T])>,
{
    let mut totals: BTreeMap<String, Vec<T>> = BTreeMap::new();
    let mut missing = 0usize;

    for (id, abundances) in entities {
        let Some(lineage) = lineages.get(id) else {
            log::debug!("{} has no taxonomy, left out of {} totals", id, rank);
            missing += 1;
            continue;
        };
        let taxon = totals
            .entry(lineage.label(rank, style))
            .or_insert_with(|| vec![T::default(); abundances.len()]);
        add_assign_samples(taxon, abundances);
    }

    if missing > 0 {
        log::info!("{} entities without taxonomy left out of {} totals", missing, rank);
    }
    totals
}
