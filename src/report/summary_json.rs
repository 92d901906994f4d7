//! `summary.json` writer. Key order is hand-written
//! rather than left to `serde_json::Map`'s default (alphabetical,
//! since this crate does not enable serde_json's `preserve_order`
//! feature) to pin an exact, stable key order.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::parsers::cluster_file::ClusterFileSummary;

pub fn write_summary_json(path: &Path, summary: &ClusterFileSummary) -> io::Result<()> {
    let included_proteomes = serde_json::to_string(&summary.included_proteomes)?;
    let excluded_proteomes = serde_json::to_string(&summary.excluded_proteomes)?;
    let included_proteins = serde_json::to_string(&summary.included_proteins)?;
    let excluded_proteins = serde_json::to_string(&summary.excluded_proteins)?;

    let body = format!(
        "{{\n  \"total_clusters\": {},\n  \"total_proteins\": {},\n  \"total_proteomes\": {},\n  \"filtered_clusters\": {},\n  \"filtered_proteins\": {},\n  \"included_proteins_count\": {},\n  \"excluded_proteins_count\": {},\n  \"included_proteomes\": {},\n  \"excluded_proteomes\": {},\n  \"included_proteins\": {},\n  \"excluded_proteins\": {}\n}}\n",
        summary.total_clusters,
        summary.total_proteins,
        summary.total_proteomes,
        summary.filtered_clusters,
        summary.filtered_proteins,
        summary.included_proteins_count,
        summary.excluded_proteins_count,
        included_proteomes,
        excluded_proteomes,
        included_proteins,
        excluded_proteins,
    );

    let mut file = File::create(path)?;
    file.write_all(body.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn key_order_matches_spec() {
        let summary = ClusterFileSummary {
            total_clusters: 1,
            total_proteins: 2,
            total_proteomes: 1,
            filtered_clusters: 1,
            filtered_proteins: 2,
            included_proteins_count: 2,
            excluded_proteins_count: 0,
            included_proteomes: BTreeMap::new(),
            excluded_proteomes: BTreeMap::new(),
            included_proteins: vec!["A.1".to_string()],
            excluded_proteins: vec![],
        };
        let dir = std::env::temp_dir().join(format!("kinfin-summary-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("summary.json");
        write_summary_json(&path, &summary).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let keys = [
            "total_clusters",
            "total_proteins",
            "total_proteomes",
            "filtered_clusters",
            "filtered_proteins",
            "included_proteins_count",
            "excluded_proteins_count",
            "included_proteomes",
            "excluded_proteomes",
            "included_proteins",
            "excluded_proteins",
        ];
        let mut last_pos = 0;
        for key in keys {
            let pos = content.find(key).unwrap();
            assert!(pos >= last_pos, "key {key} out of order");
            last_pos = pos;
        }
    }
}
