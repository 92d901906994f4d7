//! Cluster analyser: classification, cardinality,
//! representation tests, and pairwise representation tests.
//!
//! Grounded on the original source's `attribute_metrics.py`
//! (`precompute_cluster_info`, `add_special_cluster_counts`) for the
//! exact classification precedence and cardinality rule, and on
//! `cluster_metrics.py::add_taxon_split_columns` for the
//! representation-test shape. Parallelised per-cluster with `rayon`
//! `par_iter().fold().reduce()`, mirroring the codebase's
//! `enrichment_analysis.rs::calculate_statistics`.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::alo::AloCollection;
use crate::config::RunConfig;
use crate::model::{AttributeId, Cardinality, Cluster, ClusterId, ClusterType, LevelId};
use crate::stats::{self, TestResult};

#[derive(Debug, Clone)]
pub struct CardinalityRecord {
    pub cluster_id: ClusterId,
    pub attribute_id: AttributeId,
    pub level_id: LevelId,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone)]
pub struct RepresentationRecord {
    pub cluster_id: ClusterId,
    pub attribute_id: AttributeId,
    pub level_id: LevelId,
    pub result: Option<TestResult>,
}

#[derive(Debug, Clone)]
pub struct PairwiseRecord {
    pub cluster_id: ClusterId,
    pub attribute_id: AttributeId,
    pub level1: LevelId,
    pub level2: LevelId,
    pub result: Option<TestResult>,
}

#[derive(Debug, Default)]
pub struct AnalysisOutput {
    pub cardinality: Vec<CardinalityRecord>,
    pub representation: Vec<RepresentationRecord>,
    pub pairwise: Vec<PairwiseRecord>,
}

struct ClusterOutcome {
    cluster_type_by_attribute: FxHashMap<AttributeId, ClusterType>,
    coverage_by_level: FxHashMap<(AttributeId, LevelId), f64>,
    protein_median: f64,
    cardinality: Vec<CardinalityRecord>,
    representation: Vec<RepresentationRecord>,
    pairwise: Vec<PairwiseRecord>,
}

pub fn analyse_clusters(clusters: &mut [Cluster], alo: &AloCollection, config: &RunConfig) -> AnalysisOutput {
    let outcomes: Vec<ClusterOutcome> = clusters
        .par_iter()
        .map(|cluster| analyse_one_cluster(cluster, alo, config))
        .collect();

    let mut output = AnalysisOutput::default();
    for (cluster, outcome) in clusters.iter_mut().zip(outcomes.into_iter()) {
        cluster.cluster_type_by_attribute = outcome.cluster_type_by_attribute;
        cluster.coverage_by_level = outcome.coverage_by_level;
        cluster.protein_median = outcome.protein_median;
        output.cardinality.extend(outcome.cardinality);
        output.representation.extend(outcome.representation);
        output.pairwise.extend(outcome.pairwise);
    }

    output.cardinality.sort_by_key(|r| (r.cluster_id.0, r.attribute_id.0, r.level_id.0));
    output.representation.sort_by_key(|r| (r.cluster_id.0, r.attribute_id.0, r.level_id.0));
    output.pairwise.sort_by_key(|r| (r.cluster_id.0, r.attribute_id.0, r.level1.0, r.level2.0));

    output
}

fn analyse_one_cluster(cluster: &Cluster, alo: &AloCollection, config: &RunConfig) -> ClusterOutcome {
    let mut cluster_type_by_attribute = FxHashMap::default();
    let mut coverage_by_level = FxHashMap::default();
    let mut cardinality = Vec::new();
    let mut representation = Vec::new();
    let mut pairwise = Vec::new();
    let mut protein_median = 0.0;

    for attribute in &alo.attributes {
        // Bucket this cluster's nonzero per-proteome counts by the
        // level each proteome occupies under this attribute.
        let level_counts = level_value_buckets(cluster, alo, attribute.id);

        let cluster_type = if cluster.singleton {
            ClusterType::Singleton
        } else if level_counts.len() == 1 {
            ClusterType::Specific
        } else {
            ClusterType::Shared
        };
        cluster_type_by_attribute.insert(attribute.id, cluster_type);

        if attribute.name == "all" {
            let all_counts: Vec<u32> = cluster.protein_count_by_proteome.values().copied().filter(|&c| c > 0).collect();
            let as_f64: Vec<f64> = all_counts.iter().map(|&c| c as f64).collect();
            protein_median = stats::median(&as_f64);
        }

        let present_levels: Vec<LevelId> = level_counts.keys().copied().collect();

        for &level_id in &present_levels {
            let level = alo.level(level_id);
            let v = &level_counts[&level_id];
            let coverage = v.len() as f64 / level.proteome_count().max(1) as f64;
            coverage_by_level.insert((attribute.id, level_id), coverage);

            if !cluster.singleton && v.len() > 2 {
                let card = classify_cardinality(v, config);
                if card != Cardinality::Neither {
                    cardinality.push(CardinalityRecord {
                        cluster_id: cluster.id,
                        attribute_id: attribute.id,
                        level_id,
                        cardinality: card,
                    });
                }
            }

            let outside: Vec<u32> = present_levels
                .iter()
                .filter(|&&other| other != level_id)
                .flat_map(|other| level_counts[other].iter().copied())
                .collect();
            let result = stats::representation_test(v, &outside, config.test, config.min_proteomes);
            representation.push(RepresentationRecord {
                cluster_id: cluster.id,
                attribute_id: attribute.id,
                level_id,
                result,
            });
        }

        // Pairwise representation test, admitted pairs only, level1 <
        // level2 lexicographically.
        let mut sorted_present: Vec<LevelId> = present_levels.clone();
        sorted_present.sort_by_key(|&l| alo.level(l).name.clone());
        for i in 0..sorted_present.len() {
            for j in (i + 1)..sorted_present.len() {
                let (l1, l2) = (sorted_present[i], sorted_present[j]);
                let v1 = &level_counts[&l1];
                let v2 = &level_counts[&l2];
                let positive1 = v1.iter().filter(|&&c| c > 0).count();
                let positive2 = v2.iter().filter(|&&c| c > 0).count();
                if positive1 < config.min_proteomes || positive2 < config.min_proteomes {
                    continue;
                }
                let result = stats::representation_test(v1, v2, config.test, config.min_proteomes);
                pairwise.push(PairwiseRecord {
                    cluster_id: cluster.id,
                    attribute_id: attribute.id,
                    level1: l1,
                    level2: l2,
                    result,
                });
            }
        }
    }

    ClusterOutcome {
        cluster_type_by_attribute,
        coverage_by_level,
        protein_median,
        cardinality,
        representation,
        pairwise,
    }
}

/// Buckets a cluster's strictly-positive per-proteome counts by the
/// level each proteome occupies under `attribute_id`. Shared between
/// the analyser and the report writers so both agree on what "this
/// cluster's values at this level" means.
pub fn level_value_buckets(cluster: &Cluster, alo: &AloCollection, attribute_id: AttributeId) -> FxHashMap<LevelId, Vec<u32>> {
    let mut level_counts: FxHashMap<LevelId, Vec<u32>> = FxHashMap::default();
    for (&proteome_id, &count) in &cluster.protein_count_by_proteome {
        if count == 0 {
            continue;
        }
        let level_id = alo.proteome(proteome_id).level_by_attribute[&attribute_id];
        level_counts.entry(level_id).or_default().push(count);
    }
    level_counts
}

/// Cardinality classification: `true-1-to-1` takes
/// precedence over `fuzzy-1-to-1`.
fn classify_cardinality(v: &[u32], config: &RunConfig) -> Cardinality {
    if v.iter().all(|&c| c == 1) {
        return Cardinality::TrueOneToOne;
    }
    let at_target = v.iter().filter(|&&c| c == config.fuzzy_count).count();
    let fraction = at_target as f64 / v.len() as f64;
    if fraction >= config.fuzzy_fraction {
        let rest_in_range = v
            .iter()
            .filter(|&&c| c != config.fuzzy_count)
            .all(|&c| config.in_fuzzy_range(c));
        if rest_in_range {
            return Cardinality::Fuzzy;
        }
    }
    Cardinality::Neither
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_classification_matches_spec_scenario() {
        let config = RunConfig::default();
        // [1,1,1,1,2]: fuzzy_count=1 default, 4/5=0.8 >= 0.75, remaining {2} in [0,20]\{1}.
        assert_eq!(classify_cardinality(&[1, 1, 1, 1, 2], &config), Cardinality::Fuzzy);
        // Changing last to 25 puts it outside [0,20]: neither true nor fuzzy.
        assert_eq!(classify_cardinality(&[1, 1, 1, 1, 25], &config), Cardinality::Neither);
        // All ones: true 1-to-1 takes precedence.
        assert_eq!(classify_cardinality(&[1, 1, 1], &config), Cardinality::TrueOneToOne);
    }
}
