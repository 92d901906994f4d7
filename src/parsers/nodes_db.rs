//! NCBI-style taxid nodes database.
//!
//! One row per node: `node_id<TAB>rank<TAB>name<TAB>parent_id`. May be
//! gzip-compressed. Grounded on the original source's `nodesdb` parser
//! (column order) and the codebase's existing `flate2` dependency,
//! here used at run time instead of only at build time.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use rustc_hash::FxHashMap;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub rank: String,
    pub name: String,
    pub parent: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NodesDb {
    pub nodes: FxHashMap<u64, NodeRecord>,
}

impl NodesDb {
    /// Walks parent pointers from `taxid` toward the root, filling in
    /// each requested taxrank the first time it is encountered.
    /// Missing ranks default to `"not_available"`.
    pub fn lineage(&self, taxid: u64, taxranks: &[String]) -> FxHashMap<String, String> {
        let mut lineage: FxHashMap<String, String> = FxHashMap::default();
        let mut current = taxid;
        loop {
            let Some(entry) = self.nodes.get(&current) else {
                break;
            };
            if taxranks.contains(&entry.rank) && !lineage.contains_key(&entry.rank) {
                lineage.insert(entry.rank.clone(), entry.name.clone());
                if lineage.len() == taxranks.len() {
                    break;
                }
            }
            if entry.parent == current {
                break; // root points to itself
            }
            current = entry.parent;
        }
        for rank in taxranks {
            lineage
                .entry(rank.clone())
                .or_insert_with(|| "not_available".to_string());
        }
        lineage
    }
}

pub fn parse_nodes_db(path: &Path) -> Result<NodesDb> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let reader: Box<dyn BufRead> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut nodes = FxHashMap::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EngineError::io(path, e))?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            return Err(EngineError::input(
                path,
                format!("malformed nodes-db line {}: expected 4 tab-separated columns", line_no + 1),
            ));
        }
        let node_id: u64 = fields[0].parse().map_err(|_| {
            EngineError::input(path, format!("non-numeric node id on line {}", line_no + 1))
        })?;
        let parent: u64 = fields[3].parse().map_err(|_| {
            EngineError::input(path, format!("non-numeric parent id on line {}", line_no + 1))
        })?;
        nodes.insert(
            node_id,
            NodeRecord {
                rank: fields[1].to_string(),
                name: fields[2].to_string(),
                parent,
            },
        );
    }

    log::info!("[STATUS]\t- parsed {} nodes-db entries from {}", nodes.len(), path.display());
    Ok(NodesDb { nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn lineage_walk_fills_ranks_and_marks_missing() {
        let mut nodes = FxHashMap::default();
        nodes.insert(3, NodeRecord { rank: "species".into(), name: "sp".into(), parent: 2 });
        nodes.insert(2, NodeRecord { rank: "genus".into(), name: "genusA".into(), parent: 1 });
        nodes.insert(1, NodeRecord { rank: "root".into(), name: "root".into(), parent: 1 });
        let db = NodesDb { nodes };

        let taxranks = vec!["phylum".to_string(), "genus".to_string()];
        let lineage = db.lineage(3, &taxranks);
        assert_eq!(lineage.get("genus").unwrap(), "genusA");
        assert_eq!(lineage.get("phylum").unwrap(), "not_available");
    }

    #[test]
    fn parses_plain_tsv() {
        let dir = std::env::temp_dir().join(format!("kinfin-nodesdb-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("nodes.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# comment").unwrap();
        writeln!(f, "1\troot\troot\t1").unwrap();
        writeln!(f, "2\tgenus\tgenusA\t1").unwrap();
        drop(f);

        let db = parse_nodes_db(&path).unwrap();
        assert_eq!(db.nodes.len(), 2);
    }
}
