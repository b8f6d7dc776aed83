//! Taxonomic ranks and rank-complete lineage resolution
//!
//! SqueezeMeta writes taxonomies as compact strings such as
//! `k_Bacteria;p_Proteobacteria;g_Escherichia`. Ranks may be missing either
//! because NCBI has no node at that level (the lineage continues below it) or
//! because the sequence could not be classified that deep. [`Lineage::resolve`]
//! turns such a string into exactly seven values, one per [`Rank`].

use crate::UNCLASSIFIED;
use std::fmt::{self, Display, Write};

/// One of the seven ranks reported in the output tables, most general first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Superkingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    pub const ALL: [Rank; 7] = [
        Rank::Superkingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Single-letter prefix used in taxonomy strings
    pub fn code(self) -> char {
        match self {
            Rank::Superkingdom => 'k',
            Rank::Phylum => 'p',
            Rank::Class => 'c',
            Rank::Order => 'o',
            Rank::Family => 'f',
            Rank::Genus => 'g',
            Rank::Species => 's',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Rank::Superkingdom => "superkingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
        }
    }

    /// Position in [`Rank::ALL`], 0 for superkingdom through 6 for species
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_code(code: &str) -> Option<Rank> {
        Rank::ALL
            .into_iter()
            .find(|rank| code.len() == 1 && code.starts_with(rank.code()))
    }

}

impl Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value resolved for a single rank of a lineage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankValue {
    /// Name taken directly from the taxonomy string
    Concrete(String),
    /// No node at this rank, but the sequence is classified below it.
    /// `from` is the nearest more specific name.
    Inherited { from: String, rank: Rank },
    /// Not classified this deep. Carries the most specific name found, if any.
    Unclassified(Option<String>),
}

impl RankValue {
    pub fn is_concrete(&self) -> bool {
        matches!(self, RankValue::Concrete(_))
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, RankValue::Unclassified(_))
    }
}

impl Display for RankValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankValue::Concrete(name) => f.write_str(name),
            RankValue::Inherited { from, rank } => write!(f, "{} (no {} in NCBI)", from, rank),
            RankValue::Unclassified(None) => f.write_str(UNCLASSIFIED),
            RankValue::Unclassified(Some(name)) => write!(f, "{} {}", UNCLASSIFIED, name),
        }
    }
}

/// How a lineage is rendered into row keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageStyle {
    /// The name at the requested rank only
    Plain,
    /// `k_<name>;p_<name>;...` up to and including the requested rank, which
    /// keeps apart taxa sharing a name under different parents
    Cumulative,
}

/// A rank-complete lineage, superkingdom first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    values: [RankValue; 7],
}

impl Lineage {
    /// Resolve a semicolon-delimited `<code>_<name>` taxonomy string.
    ///
    /// Tokens with an unknown rank code (e.g. `n_` for "no rank") are ignored,
    /// so an empty string and `n_Unclassified` both resolve to a fully
    /// unclassified lineage. When a code appears twice the last one wins.
    pub fn resolve(tax: &str) -> Self {
        let mut named: [Option<&str>; 7] = [None; 7];
        for token in tax.trim().trim_matches(';').split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.split_once('_') {
                Some((_, name)) if name.trim().is_empty() => {
                    log::debug!("Ignoring empty taxonomy token '{}' in '{}'", token, tax)
                }
                Some((code, name)) => match Rank::from_code(code) {
                    Some(rank) => named[rank.index()] = Some(name),
                    None => log::trace!("Ignoring unranked taxonomy token '{}'", token),
                },
                None => log::debug!("Ignoring malformed taxonomy token '{}' in '{}'", token, tax),
            }
        }

        // Species to superkingdom: inherit from the nearest classified rank below,
        // leave the rest for the unclassified fill.
        let mut resolved: [Option<RankValue>; 7] = Default::default();
        let mut nearest: Option<&str> = None;
        let mut most_specific: Option<&str> = None;
        for rank in Rank::ALL.into_iter().rev() {
            resolved[rank.index()] = match (named[rank.index()], nearest) {
                (Some(name), _) => {
                    nearest = Some(name);
                    most_specific.get_or_insert(name);
                    Some(RankValue::Concrete(name.to_string()))
                }
                (None, Some(from)) => Some(RankValue::Inherited {
                    from: from.to_string(),
                    rank,
                }),
                (None, None) => None,
            };
        }

        let fill = RankValue::Unclassified(most_specific.map(str::to_string));
        Lineage {
            values: resolved.map(|value| value.unwrap_or_else(|| fill.clone())),
        }
    }

    /// Lineage used for sequences missing from a taxonomy table
    pub fn unclassified() -> Self {
        Lineage {
            values: std::array::from_fn(|_| RankValue::Unclassified(None)),
        }
    }

    pub fn values(&self) -> &[RankValue; 7] {
        &self.values
    }

    pub fn get(&self, rank: Rank) -> &RankValue {
        &self.values[rank.index()]
    }

    /// Plain display names for all ranks
    pub fn names(&self) -> [String; 7] {
        std::array::from_fn(|i| self.values[i].to_string())
    }

    /// Cumulative rank-prefixed names for all ranks
    pub fn cumulative(&self) -> [String; 7] {
        Rank::ALL.map(|rank| self.cumulative_label(rank))
    }

    /// `k_<name>;p_<name>;...` up to and including `rank`
    fn cumulative_label(&self, rank: Rank) -> String {
        let mut chain = String::new();
        for r in Rank::ALL.into_iter().take(rank.index() + 1) {
            if r != Rank::Superkingdom {
                chain.push(';');
            }
            // Writing into a String cannot fail.
            let _ = write!(chain, "{}_{}", r.code(), self.values[r.index()]);
        }
        chain
    }

    /// Row key for this lineage at `rank`
    pub fn label(&self, rank: Rank, style: LineageStyle) -> String {
        match style {
            LineageStyle::Plain => self.values[rank.index()].to_string(),
            LineageStyle::Cumulative => self.cumulative_label(rank),
        }
    }

    pub fn superkingdom(&self) -> String {
        self.values[Rank::Superkingdom.index()].to_string()
    }

    /// True when the superkingdom is Bacteria or Archaea
    pub fn is_prokaryotic(&self) -> bool {
        matches!(self.superkingdom().as_str(), "Bacteria" | "Archaea")
    }
}
