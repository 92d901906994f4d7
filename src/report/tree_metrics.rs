//! `tree.node_metrics.txt` and `tree.cluster_metrics.txt` writers
//!, built from `Tree`'s accumulated counters and the
//! `SynapomorphyRecord`s collected across every cluster.

use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::report::BUFFER_SIZE;
use crate::tree::{SynapomorphyRecord, Tree, TreeNode};

/// Serialises the tree back to Newick, with BFS-synthesised internal
/// node names as labels (branch lengths are not retained by the
/// parser, so none are emitted).
pub fn write_tree_newick(dir: &Path, tree: &Tree) -> io::Result<()> {
    let path = dir.join("tree.nwk");
    let mut newick = String::with_capacity(tree.nodes.len() * 8);
    write_newick_node(tree, tree.root, &mut newick);
    newick.push(';');
    newick.push('\n');
    std::fs::write(path, newick)
}

fn write_newick_node(tree: &Tree, id: crate::model::TreeNodeId, out: &mut String) {
    let node = tree.node(id);
    if !node.children.is_empty() {
        out.push('(');
        for (i, &child) in node.children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_newick_node(tree, child, out);
        }
        out.push(')');
    }
    out.push_str(&node.name);
}

/// Renders the tree as indented ASCII text, one node per line.
pub fn write_tree_ascii(dir: &Path, tree: &Tree) -> io::Result<()> {
    let path = dir.join("tree.txt");
    let mut text = String::with_capacity(tree.nodes.len() * 16);
    write_ascii_node(tree, tree.root, 0, &mut text);
    std::fs::write(path, text)
}

fn write_ascii_node(tree: &Tree, id: crate::model::TreeNodeId, depth: usize, out: &mut String) {
    let node: &TreeNode = tree.node(id);
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&format!("{} ({} proteomes)\n", node.name, node.proteomes.len()));
    for &child in &node.children {
        write_ascii_node(tree, child, depth + 1, out);
    }
}

pub fn write_tree_node_metrics(dir: &Path, tree: &Tree) -> io::Result<()> {
    let path = dir.join("tree.node_metrics.txt");
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    writer.write_all(
        b"#nodeID\ttaxon_specific_apomorphies_singletons\ttaxon_specific_apomorphies_non_singletons\tnode_specific_synapomorphies_total\tnode_specific_synapomorphies_complete_presence\tnode_specific_synapomorphies_partial_absence\tproteome_count\n",
    )?;

    let mut line = String::with_capacity(160);
    for id in tree.bfs_order() {
        let node = tree.node(id);
        line.clear();
        write!(
            line,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            node.name,
            node.counters.apomorphic_singletons,
            node.counters.apomorphic_non_singletons,
            node.counters.synapomorphic_total(),
            node.counters.synapomorphic_complete_presence,
            node.counters.synapomorphic_partial_absence,
            node.proteomes.len(),
        )
        .unwrap();
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}

pub fn write_tree_cluster_metrics(dir: &Path, tree: &Tree, records: &[SynapomorphyRecord]) -> io::Result<()> {
    let path = dir.join("tree.cluster_metrics.txt");
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    writer.write_all(b"#clusterID\tnodeID\tsynapomorphy_type\tnode_taxon_coverage\tchildren_coverage\tnode_taxa_present\n")?;

    let mut line = String::with_capacity(256);
    for record in records {
        let node = tree.node(record.node_id);
        line.clear();
        write!(
            line,
            "{}\t{}\t{}\t{:.4}\t{}\t{}\n",
            record.cluster_name,
            node.name,
            record.kind.as_str(),
            record.node_taxon_coverage,
            record.children_coverage,
            record.node_taxa_present,
        )
        .unwrap();
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}
