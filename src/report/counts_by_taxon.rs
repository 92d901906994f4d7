//! `cluster_counts_by_taxon.txt` writer: `#ID` plus one
//! sorted column per proteome, integer per-cluster counts, rows sorted
//! by cluster id (parse order, already ascending).

use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::alo::AloCollection;
use crate::model::Cluster;
use crate::report::BUFFER_SIZE;

pub fn write_counts_by_taxon(dir: &Path, clusters: &[Cluster], alo: &AloCollection) -> io::Result<()> {
    let mut proteomes = alo.proteomes.clone();
    proteomes.sort_by(|a, b| a.name.cmp(&b.name));

    let path = dir.join("cluster_counts_by_taxon.txt");
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);

    let mut header = String::from("#ID");
    for proteome in &proteomes {
        write!(header, "\t{}", proteome.name).unwrap();
    }
    header.push('\n');
    writer.write_all(header.as_bytes())?;

    let mut line = String::with_capacity(256);
    for cluster in clusters {
        line.clear();
        write!(line, "{}", cluster.name).unwrap();
        for proteome in &proteomes {
            let count = cluster.protein_count_by_proteome.get(&proteome.id).copied().unwrap_or(0);
            write!(line, "\t{count}").unwrap();
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}
