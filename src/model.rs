//! Arena-of-handles data model.
//!
//! Proteomes, attributes, levels, and clusters are addressed by dense
//! `u32` handles into `Vec`s owned by `AloCollection`/`ClusterCollection`.
//! There are no back-references: every relationship is a lookup.

use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(ProteomeId);
define_id!(ClusterId);
define_id!(AttributeId);
define_id!(LevelId);
define_id!(TreeNodeId);

/// A stable protein identifier of the form `<proteome_prefix>.<local_id>`.
pub type ProteinId = Arc<CompactString>;

#[derive(Debug, Clone)]
pub struct Proteome {
    pub id: ProteomeId,
    pub name: CompactString,
    /// Input-order index; equals `id.0` unless an explicit `IDX` column
    /// reordered proteomes relative to file order.
    pub idx: u32,
    pub taxid: Option<u64>,
    pub is_outgroup: bool,
    /// attribute -> the level this proteome belongs to under that attribute.
    pub level_by_attribute: FxHashMap<AttributeId, LevelId>,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: CompactString,
    /// Levels in discovery order; report writers sort lexicographically
    /// by name at emission time.
    pub levels: Vec<LevelId>,
    pub level_by_name: FxHashMap<CompactString, LevelId>,
}

#[derive(Debug, Clone)]
pub struct Level {
    pub id: LevelId,
    pub attribute_id: AttributeId,
    pub name: CompactString,
    /// Sorted ascending by `ProteomeId`.
    pub proteomes: Vec<ProteomeId>,
    pub proteome_set: FxHashSet<ProteomeId>,
}

impl Level {
    pub fn proteome_count(&self) -> usize {
        self.proteomes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterType {
    Singleton,
    Specific,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    TrueOneToOne,
    Fuzzy,
    Neither,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: CompactString,
    pub protein_ids: Vec<ProteinId>,
    pub protein_count_by_proteome: FxHashMap<ProteomeId, u32>,
    /// Sorted ascending.
    pub proteome_ids: Vec<ProteomeId>,
    pub singleton: bool,
    /// Populated by the analyser: one entry per attribute.
    pub cluster_type_by_attribute: FxHashMap<AttributeId, ClusterType>,
    /// Populated by the analyser: one entry per (attribute, level).
    pub coverage_by_level: FxHashMap<(AttributeId, LevelId), f64>,
    pub protein_median: f64,
}

impl Cluster {
    pub fn protein_count(&self) -> u32 {
        self.protein_ids.len() as u32
    }

    pub fn proteome_count(&self) -> usize {
        self.proteome_ids.len()
    }
}

pub const ATTRIBUTE_ALL: &str = "all";
pub const ATTRIBUTE_TAXON: &str = "TAXON";
pub const ATTRIBUTE_RESERVED: [&str; 3] = ["IDX", "OUT", "TAXID"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_ordered_by_value() {
        assert!(ClusterId(1) < ClusterId(2));
        assert_eq!(ClusterId(5).index(), 5);
    }
}
