//! `<a>.<level>.cluster_metrics.txt` and `<a>.<level>.cluster_1to1s.txt`
//! writers. One row per cluster per file; clusters
//! absent from the level still get a row with `cluster_status=absent`
//! and `N/A` statistics (original source's `cluster_metrics.py::
//! add_taxon_split_columns`).

use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::alo::AloCollection;
use crate::analyser::AnalysisOutput;
use crate::model::{AttributeId, Cardinality, Cluster, ClusterType, LevelId, ProteomeId};
use crate::report::format::{format_coverage, log2_mean_str, pvalue_str, representation_str, NOT_AVAILABLE};
use crate::report::BUFFER_SIZE;
use crate::stats::{self, TestResult};

fn cluster_type_str(ty: ClusterType) -> &'static str {
    match ty {
        ClusterType::Singleton => "singleton",
        ClusterType::Specific => "specific",
        ClusterType::Shared => "shared",
    }
}

fn partition(cluster: &Cluster, alo: &AloCollection, attribute_id: AttributeId, level_id: LevelId) -> (Vec<(ProteomeId, u32)>, Vec<(ProteomeId, u32)>) {
    let mut inside = Vec::new();
    let mut outside = Vec::new();
    for (&proteome_id, &count) in &cluster.protein_count_by_proteome {
        if count == 0 {
            continue;
        }
        let lvl = alo.proteome(proteome_id).level_by_attribute[&attribute_id];
        if lvl == level_id {
            inside.push((proteome_id, count));
        } else {
            outside.push((proteome_id, count));
        }
    }
    (inside, outside)
}

pub fn write_level_reports(
    dir: &Path,
    attribute_name: &str,
    level_name: &str,
    attribute_id: AttributeId,
    level_id: LevelId,
    clusters: &[Cluster],
    alo: &AloCollection,
    analysis: &AnalysisOutput,
) -> io::Result<()> {
    let representation_lookup: std::collections::HashMap<u32, &Option<TestResult>> = analysis
        .representation
        .iter()
        .filter(|r| r.attribute_id == attribute_id && r.level_id == level_id)
        .map(|r| (r.cluster_id.0, &r.result))
        .collect();
    let cardinality_lookup: std::collections::HashMap<u32, Cardinality> = analysis
        .cardinality
        .iter()
        .filter(|r| r.attribute_id == attribute_id && r.level_id == level_id)
        .map(|r| (r.cluster_id.0, r.cardinality))
        .collect();

    write_cluster_metrics(dir, attribute_name, level_name, attribute_id, level_id, clusters, alo, &representation_lookup)?;
    write_cluster_1to1s(dir, attribute_name, level_name, attribute_id, clusters, &cardinality_lookup)
}

fn write_cluster_metrics(
    dir: &Path,
    attribute_name: &str,
    level_name: &str,
    attribute_id: AttributeId,
    level_id: LevelId,
    clusters: &[Cluster],
    alo: &AloCollection,
    representation_lookup: &std::collections::HashMap<u32, &Option<TestResult>>,
) -> io::Result<()> {
    let path = dir.join(format!("{attribute_name}.{level_name}.cluster_metrics.txt"));
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    writer.write_all(b"#cluster_id\tcluster_status\tcluster_type\tcluster_protein_count\tcluster_proteome_count\tTAXON_protein_count\tTAXON_mean_count\tnon_taxon_mean_count\trepresentation\tlog2_mean(TAXON/others)\tpvalue(TAXON vs. others)\tTAXON_coverage\tTAXON_count\tnon_TAXON_count\tTAXON_taxa\tnon_TAXON_taxa\n")?;

    let mut line = String::with_capacity(256);
    for cluster in clusters {
        let Some(&cluster_type) = cluster.cluster_type_by_attribute.get(&attribute_id) else {
            continue;
        };
        let (inside, outside) = partition(cluster, alo, attribute_id, level_id);
        let status = if inside.is_empty() { "absent" } else { "present" };

        let inside_counts: Vec<f64> = inside.iter().map(|(_, c)| *c as f64).collect();
        let outside_counts: Vec<f64> = outside.iter().map(|(_, c)| *c as f64).collect();
        let taxon_protein_count: u32 = inside.iter().map(|(_, c)| c).sum();
        let taxon_mean = if inside_counts.is_empty() { None } else { Some(stats::mean(&inside_counts)) };
        let non_taxon_mean = if outside_counts.is_empty() { None } else { Some(stats::mean(&outside_counts)) };

        let result = representation_lookup.get(&cluster.id.0).copied().cloned().unwrap_or(None);
        let coverage = cluster.coverage_by_level.get(&(attribute_id, level_id)).copied().unwrap_or(0.0);

        let taxon_taxa: Vec<&str> = inside.iter().map(|(p, _)| alo.proteome(*p).name.as_str()).collect();
        let non_taxon_taxa: Vec<&str> = outside.iter().map(|(p, _)| alo.proteome(*p).name.as_str()).collect();

        line.clear();
        write!(
            line,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            cluster.name,
            status,
            cluster_type_str(cluster_type),
            cluster.protein_count(),
            cluster.proteome_count(),
            taxon_protein_count,
            taxon_mean.map(|v| format!("{v:.4}")).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            non_taxon_mean.map(|v| format!("{v:.4}")).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            representation_str(&result),
            log2_mean_str(&result),
            pvalue_str(&result),
            format_coverage(coverage),
            inside.len(),
            outside.len(),
            taxon_taxa.join(","),
            non_taxon_taxa.join(","),
        )
        .unwrap();
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}

fn write_cluster_1to1s(
    dir: &Path,
    attribute_name: &str,
    level_name: &str,
    attribute_id: AttributeId,
    clusters: &[Cluster],
    cardinality_lookup: &std::collections::HashMap<u32, Cardinality>,
) -> io::Result<()> {
    let path = dir.join(format!("{attribute_name}.{level_name}.cluster_1to1s.txt"));
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    writer.write_all(b"#cluster_id\tlevel\tcluster_type\tcardinality\n")?;

    let mut line = String::with_capacity(128);
    for cluster in clusters {
        let Some(&card) = cardinality_lookup.get(&cluster.id.0) else {
            continue;
        };
        let Some(&cluster_type) = cluster.cluster_type_by_attribute.get(&attribute_id) else {
            continue;
        };
        let card_str = match card {
            Cardinality::TrueOneToOne => "true_1to1",
            Cardinality::Fuzzy => "fuzzy",
            Cardinality::Neither => continue,
        };

        line.clear();
        write!(line, "{}\t{}\t{}\t{}\n", cluster.name, level_name, cluster_type_str(cluster_type), card_str).unwrap();
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}
