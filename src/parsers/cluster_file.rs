//! Cluster file parser.
//!
//! Grounded on the line-oriented `BufReader` idiom in the codebase's
//! study-population parser, and on the exact `summary.json` accounting
//! recovered from the original source's `clusterfile` parser (total /
//! filtered / included / excluded counts and breakdowns).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{EngineError, Result};
use crate::model::{Cluster, ClusterId, ProteomeId};

#[derive(Debug, Clone)]
pub struct ClusterFileSummary {
    pub total_clusters: usize,
    pub total_proteins: usize,
    pub total_proteomes: usize,
    pub filtered_clusters: usize,
    pub filtered_proteins: usize,
    pub included_proteins_count: usize,
    pub excluded_proteins_count: usize,
    pub included_proteomes: BTreeMap<String, usize>,
    pub excluded_proteomes: BTreeMap<String, usize>,
    pub included_proteins: Vec<String>,
    pub excluded_proteins: Vec<String>,
}

pub fn parse_cluster_file(
    path: &Path,
    proteome_by_name: &FxHashMap<CompactString, ProteomeId>,
) -> Result<(Vec<Cluster>, ClusterFileSummary)> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let reader = BufReader::with_capacity(256 * 1024, file);

    let mut seen_cluster_ids: FxHashSet<CompactString> = FxHashSet::default();
    let mut clusters = Vec::new();

    let mut total_proteins = 0usize;
    let mut included_proteins_count_set: FxHashSet<CompactString> = FxHashSet::default();
    let mut excluded_proteins_count_set: FxHashSet<CompactString> = FxHashSet::default();
    let mut included_proteomes: BTreeMap<String, usize> = BTreeMap::new();
    let mut excluded_proteomes: BTreeMap<String, usize> = BTreeMap::new();
    let mut included_proteins: Vec<String> = Vec::new();
    let mut excluded_proteins: Vec<String> = Vec::new();
    let mut filtered_proteins = 0usize;
    let mut filtered_cluster_ids: FxHashSet<CompactString> = FxHashSet::default();

    let mut next_cluster_index: u32 = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EngineError::io(path, e))?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (cluster_id_str, proteins_str) = line.split_once(": ").ok_or_else(|| {
            EngineError::input(
                path,
                format!("malformed cluster line {}: missing ': ' separator", line_no + 1),
            )
        })?;
        let cluster_id_str = CompactString::from(cluster_id_str);

        if !seen_cluster_ids.insert(cluster_id_str.clone()) {
            return Err(EngineError::input(
                path,
                format!("duplicate cluster id '{}'", cluster_id_str),
            ));
        }

        let mut protein_count_by_proteome: FxHashMap<ProteomeId, u32> = FxHashMap::default();
        let mut protein_ids: Vec<Arc<CompactString>> = Vec::new();

        for token in proteins_str.split_whitespace() {
            total_proteins += 1;
            let dot = token.find('.').ok_or_else(|| {
                EngineError::input(
                    path,
                    format!("malformed protein id '{}' on line {}: missing '.'", token, line_no + 1),
                )
            })?;
            let prefix = &token[..dot];

            match proteome_by_name.get(prefix) {
                Some(&proteome_id) => {
                    filtered_proteins += 1;
                    filtered_cluster_ids.insert(cluster_id_str.clone());
                    included_proteins_count_set.insert(CompactString::from(token));
                    *included_proteomes.entry(prefix.to_string()).or_insert(0) += 1;
                    included_proteins.push(token.to_string());
                    *protein_count_by_proteome.entry(proteome_id).or_insert(0) += 1;
                    protein_ids.push(Arc::new(CompactString::from(token)));
                }
                None => {
                    excluded_proteins_count_set.insert(CompactString::from(token));
                    *excluded_proteomes.entry(prefix.to_string()).or_insert(0) += 1;
                    excluded_proteins.push(token.to_string());
                }
            }
        }

        if protein_count_by_proteome.is_empty() {
            continue;
        }

        let mut proteome_ids: Vec<ProteomeId> = protein_count_by_proteome.keys().copied().collect();
        proteome_ids.sort();

        clusters.push(Cluster {
            id: ClusterId(next_cluster_index),
            name: cluster_id_str,
            singleton: protein_ids.len() == 1,
            protein_ids,
            protein_count_by_proteome,
            proteome_ids,
            cluster_type_by_attribute: FxHashMap::default(),
            coverage_by_level: FxHashMap::default(),
            protein_median: 0.0,
        });
        next_cluster_index += 1;
    }

    included_proteins.sort();
    excluded_proteins.sort();

    let summary = ClusterFileSummary {
        total_clusters: seen_cluster_ids.len(),
        total_proteins,
        total_proteomes: proteome_by_name.len(),
        filtered_clusters: filtered_cluster_ids.len(),
        filtered_proteins,
        included_proteins_count: included_proteins_count_set.len(),
        excluded_proteins_count: excluded_proteins_count_set.len(),
        included_proteomes,
        excluded_proteomes,
        included_proteins,
        excluded_proteins,
    };

    log::info!(
        "[STATUS]\t- parsed {} clusters ({} included, {} proteins excluded) from {}",
        summary.total_clusters,
        summary.filtered_clusters,
        summary.excluded_proteins_count,
        path.display()
    );

    Ok((clusters, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn proteome_map(names: &[&str]) -> FxHashMap<CompactString, ProteomeId> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (CompactString::from(*n), ProteomeId(i as u32)))
            .collect()
    }

    #[test]
    fn parses_basic_cluster_file_and_excludes_unknown_proteomes() {
        let dir = tempfile_dir();
        let path = dir.join("clusters.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "OG1: A.1 B.1").unwrap();
        writeln!(f, "OG2: A.7").unwrap();
        writeln!(f, "OG3: A.1 A.2 A.3 B.1 B.2 C.1 D.1").unwrap();
        writeln!(f, "OG4: Z.1").unwrap();
        drop(f);

        let proteomes = proteome_map(&["A", "B", "C", "D"]);
        let (clusters, summary) = parse_cluster_file(&path, &proteomes).unwrap();

        // OG4 references only an unknown proteome and is dropped entirely.
        assert_eq!(clusters.len(), 3);
        assert_eq!(summary.total_clusters, 4);
        assert_eq!(summary.filtered_clusters, 3);
        assert_eq!(summary.excluded_proteins_count, 1);

        let og2 = clusters.iter().find(|c| c.name == "OG2").unwrap();
        assert!(og2.singleton);
        assert_eq!(og2.protein_count(), 1);
    }

    #[test]
    fn duplicate_cluster_id_is_rejected() {
        let dir = tempfile_dir();
        let path = dir.join("dup.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "OG1: A.1").unwrap();
        writeln!(f, "OG1: A.2").unwrap();
        drop(f);

        let proteomes = proteome_map(&["A"]);
        assert!(parse_cluster_file(&path, &proteomes).is_err());
    }

    fn tempfile_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "kinfin-engine-test-{}-{}",
            std::process::id(),
            ClusterId(rand_u32())
                .0
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn rand_u32() -> u32 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos()
    }
}
