//! `<a>.attribute_metrics.txt` writer.
//!
//! Grounded on the original source's `attribute_metrics.py::
//! precompute_cluster_info` / `add_special_cluster_counts` for the
//! singleton/specific/shared and 1-to-1/fuzzy breakdown, and on the
//! codebase's `write_results.rs` for the `BufWriter` + reusable
//! `line_buffer` idiom.

use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::alo::AloCollection;
use crate::analyser::{level_value_buckets, AnalysisOutput};
use crate::model::{Cardinality, Cluster, ClusterType, LevelId};
use crate::report::BUFFER_SIZE;

#[derive(Default, Clone, Copy)]
struct TypeTotals {
    clusters: u64,
    proteins: u64,
    span: u64,
}

pub fn write_attribute_metrics(dir: &Path, attribute_name: &str, clusters: &[Cluster], alo: &AloCollection, analysis: &AnalysisOutput) -> io::Result<()> {
    let attribute_id = alo.attribute_by_name[attribute_name];
    let attribute = alo.attribute(attribute_id);

    let cardinality_lookup: FxHashMap<(u32, u32), Cardinality> = analysis
        .cardinality
        .iter()
        .filter(|r| r.attribute_id == attribute_id)
        .map(|r| ((r.cluster_id.0, r.level_id.0), r.cardinality))
        .collect();

    // Dataset-wide totals by classification, independent of level.
    let mut global_totals: FxHashMap<ClusterType, TypeTotals> = FxHashMap::default();
    for cluster in clusters {
        if let Some(&ty) = cluster.cluster_type_by_attribute.get(&attribute_id) {
            let entry = global_totals.entry(ty).or_default();
            entry.clusters += 1;
            entry.proteins += cluster.protein_count_by_proteome.values().map(|&c| c as u64).sum::<u64>();
            entry.span += cluster.protein_count() as u64;
        }
    }
    let global_singleton = global_totals.get(&ClusterType::Singleton).copied().unwrap_or_default();
    let global_specific = global_totals.get(&ClusterType::Specific).copied().unwrap_or_default();
    let global_shared = global_totals.get(&ClusterType::Shared).copied().unwrap_or_default();

    // Per-level accumulators, built in a single pass over clusters so
    // each cluster's per-proteome counts are bucketed by level only once.
    #[derive(Default, Clone)]
    struct LevelTotals {
        by_type: FxHashMap<ClusterType, TypeTotals>,
        specific_true_1to1: u64,
        specific_fuzzy: u64,
        shared_true_1to1: u64,
        shared_fuzzy: u64,
    }
    let mut per_level: FxHashMap<LevelId, LevelTotals> = FxHashMap::default();

    for cluster in clusters {
        let Some(&ty) = cluster.cluster_type_by_attribute.get(&attribute_id) else {
            continue;
        };
        let buckets = level_value_buckets(cluster, alo, attribute_id);
        for (&level_id, values) in &buckets {
            let per_level_count: u32 = values.iter().sum();
            let totals = per_level.entry(level_id).or_default();
            let entry = totals.by_type.entry(ty).or_default();
            entry.clusters += 1;
            entry.proteins += per_level_count as u64;
            entry.span += cluster.protein_count() as u64;

            if let Some(&card) = cardinality_lookup.get(&(cluster.id.0, level_id.0)) {
                match (ty, card) {
                    (ClusterType::Specific, Cardinality::TrueOneToOne) => totals.specific_true_1to1 += 1,
                    (ClusterType::Specific, Cardinality::Fuzzy) => totals.specific_fuzzy += 1,
                    (ClusterType::Shared, Cardinality::TrueOneToOne) => totals.shared_true_1to1 += 1,
                    (ClusterType::Shared, Cardinality::Fuzzy) => totals.shared_fuzzy += 1,
                    _ => {}
                }
            }
        }
    }

    let path = dir.join(format!("{attribute_name}.attribute_metrics.txt"));
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    writer.write_all(b"#attribute\ttaxon_set\tcluster_total_count\tprotein_total_count\tprotein_total_span\tsingleton_cluster_count\tsingleton_protein_count\tsingleton_protein_span\tspecific_cluster_count\tspecific_protein_count\tspecific_protein_span\tshared_cluster_count\tshared_protein_count\tshared_protein_span\tspecific_cluster_true_1to1_count\tspecific_cluster_fuzzy_count\tshared_cluster_true_1to1_count\tshared_cluster_fuzzy_count\tabsent_cluster_total_count\tabsent_cluster_singleton_count\tabsent_cluster_specific_count\tabsent_cluster_shared_count\tTAXON_count\tTAXON_taxa\n")?;

    let mut sorted_levels: Vec<LevelId> = attribute.levels.clone();
    sorted_levels.sort_by_key(|&l| alo.level(l).name.clone());

    let mut line = String::with_capacity(256);
    for &level_id in &sorted_levels {
        let level = alo.level(level_id);
        let level_totals = per_level.get(&level_id).cloned().unwrap_or_default();
        let specific_true_1to1 = level_totals.specific_true_1to1;
        let specific_fuzzy = level_totals.specific_fuzzy;
        let shared_true_1to1 = level_totals.shared_true_1to1;
        let shared_fuzzy = level_totals.shared_fuzzy;

        let singleton = level_totals.by_type.get(&ClusterType::Singleton).copied().unwrap_or_default();
        let specific = level_totals.by_type.get(&ClusterType::Specific).copied().unwrap_or_default();
        let shared = level_totals.by_type.get(&ClusterType::Shared).copied().unwrap_or_default();
        let cluster_total = singleton.clusters + specific.clusters + shared.clusters;
        let protein_total = singleton.proteins + specific.proteins + shared.proteins;
        let span_total = singleton.span + specific.span + shared.span;

        let absent_singleton = global_singleton.clusters - singleton.clusters;
        let absent_specific = global_specific.clusters - specific.clusters;
        let absent_shared = global_shared.clusters - shared.clusters;

        let taxa: Vec<&str> = level.proteomes.iter().map(|p| alo.proteome(*p).name.as_str()).collect();

        line.clear();
        write!(
            line,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            attribute_name,
            level.name,
            cluster_total,
            protein_total,
            span_total,
            singleton.clusters,
            singleton.proteins,
            singleton.span,
            specific.clusters,
            specific.proteins,
            specific.span,
            shared.clusters,
            shared.proteins,
            shared.span,
            specific_true_1to1,
            specific_fuzzy,
            shared_true_1to1,
            shared_fuzzy,
            absent_singleton + absent_specific + absent_shared,
            absent_singleton,
            absent_specific,
            absent_shared,
            level.proteome_count(),
            taxa.join(","),
        )
        .unwrap();
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}
