//! `<a>.pairwise_representation_test.txt` writer,
//! sorted by `(#cluster_id, TAXON_1, TAXON_2)`.

use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::alo::AloCollection;
use crate::analyser::{AnalysisOutput, PairwiseRecord};
use crate::model::{AttributeId, Cluster};
use crate::report::format::{log2_mean_str, pvalue_str, representation_str};
use crate::report::BUFFER_SIZE;

pub fn write_pairwise(dir: &Path, attribute_name: &str, attribute_id: AttributeId, clusters: &[Cluster], alo: &AloCollection, analysis: &AnalysisOutput) -> io::Result<()> {
    let mut records: Vec<&PairwiseRecord> = analysis.pairwise.iter().filter(|r| r.attribute_id == attribute_id).collect();
    records.sort_by_key(|r| (r.cluster_id.0, alo.level(r.level1).name.clone(), alo.level(r.level2).name.clone()));

    let cluster_names: std::collections::HashMap<u32, &str> = clusters.iter().map(|c| (c.id.0, c.name.as_str())).collect();

    let path = dir.join(format!("{attribute_name}.pairwise_representation_test.txt"));
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    writer.write_all(b"#cluster_id\tTAXON_1\tTAXON_2\trepresentation\tlog2_mean(TAXON_1/TAXON_2)\tpvalue\n")?;

    let mut line = String::with_capacity(160);
    for record in records {
        let cluster_name = cluster_names.get(&record.cluster_id.0).copied().unwrap_or("?");
        line.clear();
        write!(
            line,
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            cluster_name,
            alo.level(record.level1).name,
            alo.level(record.level2).name,
            representation_str(&record.result),
            log2_mean_str(&record.result),
            pvalue_str(&record.result),
        )
        .unwrap();
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}
