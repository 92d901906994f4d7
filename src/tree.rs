//! Tree-node arena and apomorphy/synapomorphy accumulation.
//!
//! Grounded on `alo_collections.py`'s `write_tree`/`generate_chart_for_node`
//! for the counter names and synapomorphy classification. No direct
//! teacher analogue exists (the codebase's DAG code is a fixed
//! ontology graph, not a dynamically sized phylogenetic tree); the
//! arena shape is an arena-of-handles: `Vec<TreeNode>` with
//! parent/children indices, every traversal iterative.

use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{EngineError, Result};
use crate::model::{Cluster, ProteomeId, TreeNodeId};
use crate::parsers::newick::RawTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynapomorphyKind {
    CompletePresence,
    PartialAbsence,
}

impl SynapomorphyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SynapomorphyKind::CompletePresence => "complete_presence",
            SynapomorphyKind::PartialAbsence => "partial_absence",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynapomorphyRecord {
    pub cluster_name: CompactString,
    pub node_id: TreeNodeId,
    pub kind: SynapomorphyKind,
    pub node_taxon_coverage: f64,
    pub children_coverage: String,
    pub node_taxa_present: String,
}

#[derive(Debug, Clone, Default)]
pub struct NodeCounters {
    pub absent: u32,
    pub singleton: u32,
    pub shared: u32,
    pub specific: u32,
    pub apomorphic_singletons: u32,
    pub apomorphic_non_singletons: u32,
    pub synapomorphic_complete_presence: u32,
    pub synapomorphic_partial_absence: u32,
}

impl NodeCounters {
    pub fn synapomorphic_total(&self) -> u32 {
        self.synapomorphic_complete_presence + self.synapomorphic_partial_absence
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: TreeNodeId,
    pub name: CompactString,
    pub parent: Option<TreeNodeId>,
    pub children: Vec<TreeNodeId>,
    pub proteomes: FxHashSet<ProteomeId>,
    pub counters: NodeCounters,
}

#[derive(Debug, Clone)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
    pub root: TreeNodeId,
    pub outgroup: TreeNodeId,
}

impl Tree {
    pub fn node(&self, id: TreeNodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: TreeNodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    /// BFS order over node ids, root first.
    pub fn bfs_order(&self) -> Vec<TreeNodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(self.root);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &child in &self.node(id).children {
                queue.push_back(child);
            }
        }
        order
    }

    /// Accumulates apomorphy/synapomorphy counters for one cluster.
    /// Returns any synapomorphy records produced.
    pub fn accumulate_cluster(&mut self, cluster: &Cluster) -> Vec<SynapomorphyRecord> {
        let cluster_proteomes: FxHashSet<ProteomeId> = cluster.proteome_ids.iter().copied().collect();
        let mut records = Vec::new();

        for node_id in self.bfs_order() {
            let (intersection, diff_nonempty, node_proteome_count, children): (
                FxHashSet<ProteomeId>,
                bool,
                usize,
                Vec<TreeNodeId>,
            ) = {
                let node = self.node(node_id);
                let intersection: FxHashSet<ProteomeId> =
                    cluster_proteomes.intersection(&node.proteomes).copied().collect();
                let diff_nonempty = cluster_proteomes.iter().any(|p| !node.proteomes.contains(p));
                (intersection, diff_nonempty, node.proteomes.len(), node.children.clone())
            };

            if intersection.is_empty() {
                self.node_mut(node_id).counters.absent += 1;
                continue;
            }

            if cluster.singleton {
                let counters = &mut self.node_mut(node_id).counters;
                counters.singleton += 1;
                counters.apomorphic_singletons += 1;
                continue;
            }

            if diff_nonempty {
                self.node_mut(node_id).counters.shared += 1;
                continue;
            }

            // diff empty, non-singleton: specific.
            self.node_mut(node_id).counters.specific += 1;

            if cluster.proteome_count() == 1 {
                self.node_mut(node_id).counters.apomorphic_non_singletons += 1;
                continue;
            }

            if children.is_empty() {
                continue;
            }
            let all_children_present = children.iter().all(|&child_id| {
                !self.node(child_id).proteomes.is_disjoint(&cluster_proteomes)
            });
            if !all_children_present {
                continue;
            }

            let coverage = intersection.len() as f64 / node_proteome_count.max(1) as f64;
            let kind = if (coverage - 1.0).abs() < 1e-12 {
                SynapomorphyKind::CompletePresence
            } else {
                SynapomorphyKind::PartialAbsence
            };

            let children_coverage = children
                .iter()
                .map(|&child_id| {
                    let child = self.node(child_id);
                    let child_cov = if child.proteomes.is_empty() {
                        0.0
                    } else {
                        child.proteomes.intersection(&cluster_proteomes).count() as f64
                            / child.proteomes.len() as f64
                    };
                    format!("{}={:.2}", child.name, child_cov)
                })
                .collect::<Vec<_>>()
                .join(",");

            let mut present_names: Vec<ProteomeId> = intersection.iter().copied().collect();
            present_names.sort();
            let node_taxa_present = present_names
                .iter()
                .map(|p| p.0.to_string())
                .collect::<Vec<_>>()
                .join(",");

            let counters = &mut self.node_mut(node_id).counters;
            match kind {
                SynapomorphyKind::CompletePresence => counters.synapomorphic_complete_presence += 1,
                SynapomorphyKind::PartialAbsence => counters.synapomorphic_partial_absence += 1,
            }

            records.push(SynapomorphyRecord {
                cluster_name: cluster.name.clone(),
                node_id,
                kind,
                node_taxon_coverage: coverage,
                children_coverage,
                node_taxa_present,
            });
        }

        records
    }
}

pub fn build_tree(
    raw: &RawTree,
    proteome_by_name: &FxHashMap<CompactString, ProteomeId>,
    outgroup_proteomes: &[ProteomeId],
) -> Result<Tree> {
    let mut nodes: Vec<TreeNode> = raw
        .nodes
        .iter()
        .enumerate()
        .map(|(i, raw_node)| TreeNode {
            id: TreeNodeId(i as u32),
            name: CompactString::from(raw_node.leaf_name.clone().unwrap_or_default()),
            parent: raw_node.parent.map(|p| TreeNodeId(p as u32)),
            children: raw_node.children.iter().map(|&c| TreeNodeId(c as u32)).collect(),
            proteomes: FxHashSet::default(),
            counters: NodeCounters::default(),
        })
        .collect();

    // Leaf proteome sets.
    for (i, raw_node) in raw.nodes.iter().enumerate() {
        if let Some(name) = &raw_node.leaf_name {
            if raw_node.children.is_empty() {
                let proteome_id = proteome_by_name.get(name.as_str()).copied().ok_or_else(|| {
                    EngineError::config(format!(
                        "Newick leaf '{}' does not match any proteome in the config",
                        name
                    ))
                })?;
                nodes[i].proteomes.insert(proteome_id);
            }
        }
    }

    // Bottom-up union via iterative post-order.
    let mut post_order = Vec::with_capacity(nodes.len());
    let mut stack = vec![(raw.root, false)];
    while let Some((idx, processed)) = stack.pop() {
        if processed {
            post_order.push(idx);
            continue;
        }
        stack.push((idx, true));
        for &child in &raw.nodes[idx].children {
            stack.push((child, false));
        }
    }
    for idx in post_order {
        let children: Vec<usize> = raw.nodes[idx].children.clone();
        if !children.is_empty() {
            let mut union = FxHashSet::default();
            for c in children {
                union.extend(nodes[c].proteomes.iter().copied());
            }
            nodes[idx].proteomes = union;
        }
    }

    // BFS numbering of internal node names.
    let root_id = TreeNodeId(raw.root as u32);
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(root_id);
    let mut bfs_counter = 0u32;
    while let Some(id) = queue.pop_front() {
        let is_internal = !nodes[id.index()].children.is_empty();
        if is_internal {
            nodes[id.index()].name = CompactString::from(format!("node{}", bfs_counter));
            bfs_counter += 1;
        }
        let children = nodes[id.index()].children.clone();
        for child in children {
            queue.push_back(child);
        }
    }

    if outgroup_proteomes.is_empty() {
        return Err(EngineError::config(
            "tree supplied with no outgroup: no proteome has OUT=1",
        ));
    }
    let outgroup_set: FxHashSet<ProteomeId> = outgroup_proteomes.iter().copied().collect();
    let outgroup = find_lca(&nodes, root_id, &outgroup_set)?;

    Ok(Tree {
        nodes,
        root: root_id,
        outgroup,
    })
}

/// Lowest common ancestor of all nodes exactly matching `targets`,
/// found by intersecting each target's ancestor path (iterative,
/// parent-pointer walk, no recursion).
fn find_lca(
    nodes: &[TreeNode],
    root: TreeNodeId,
    targets: &FxHashSet<ProteomeId>,
) -> Result<TreeNodeId> {
    let mut leaves: Vec<TreeNodeId> = Vec::new();
    for node in nodes {
        if node.children.is_empty() {
            if let Some(&p) = node.proteomes.iter().next() {
                if node.proteomes.len() == 1 && targets.contains(&p) {
                    leaves.push(node.id);
                }
            }
        }
    }
    if leaves.is_empty() {
        return Err(EngineError::config("no tree leaf matches an OUT=1 proteome"));
    }

    let path_of = |mut id: TreeNodeId| -> Vec<TreeNodeId> {
        let mut path = vec![id];
        while let Some(p) = nodes[id.index()].parent {
            path.push(p);
            id = p;
        }
        path
    };

    let mut common: FxHashSet<TreeNodeId> = path_of(leaves[0]).into_iter().collect();
    for &leaf in &leaves[1..] {
        let path: FxHashSet<TreeNodeId> = path_of(leaf).into_iter().collect();
        common = common.intersection(&path).copied().collect();
    }

    // Pick the deepest (furthest from root) node in `common`.
    let depth_of = |mut id: TreeNodeId| -> usize {
        let mut depth = 0;
        while let Some(p) = nodes[id.index()].parent {
            depth += 1;
            id = p;
        }
        depth
    };
    common
        .into_iter()
        .max_by_key(|&id| depth_of(id))
        .ok_or_else(|| EngineError::config("could not determine outgroup LCA"))
        .map(|id| {
            let _ = root;
            id
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::newick::parse_newick;

    fn proteome_map(names: &[&str]) -> FxHashMap<CompactString, ProteomeId> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (CompactString::from(*n), ProteomeId(i as u32)))
            .collect()
    }

    #[test]
    fn builds_tree_and_finds_outgroup() {
        let raw = parse_newick("((A,B),C);").unwrap();
        let proteomes = proteome_map(&["A", "B", "C"]);
        let tree = build_tree(&raw, &proteomes, &[ProteomeId(0)]).unwrap();
        assert_eq!(tree.node(tree.outgroup).proteomes.len(), 1);
        assert!(tree.node(tree.outgroup).proteomes.contains(&ProteomeId(0)));
    }

    #[test]
    fn root_proteome_set_is_union_of_all_leaves() {
        let raw = parse_newick("((A,B),C);").unwrap();
        let proteomes = proteome_map(&["A", "B", "C"]);
        let tree = build_tree(&raw, &proteomes, &[ProteomeId(0)]).unwrap();
        assert_eq!(tree.node(tree.root).proteomes.len(), 3);
    }

    #[test]
    fn missing_outgroup_is_config_error() {
        let raw = parse_newick("((A,B),C);").unwrap();
        let proteomes = proteome_map(&["A", "B", "C"]);
        assert!(build_tree(&raw, &proteomes, &[]).is_err());
    }
}
