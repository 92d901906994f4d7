//! `<a>.cluster_summary.txt` writer: one row per
//! (cluster, attribute), with a fixed column prefix and one dynamic
//! `<level>_count`/`<level>_median`/`<level>_cov` column group per
//! level of that attribute (the `TAXON` attribute omits median/cov).

use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::alo::AloCollection;
use crate::analyser::level_value_buckets;
use crate::model::{Cluster, ATTRIBUTE_TAXON};
use crate::report::format::format_coverage;
use crate::report::format::NOT_AVAILABLE;
use crate::report::BUFFER_SIZE;
use crate::stats;

pub fn write_cluster_summary(dir: &Path, attribute_name: &str, clusters: &[Cluster], alo: &AloCollection) -> io::Result<()> {
    let attribute_id = alo.attribute_by_name[attribute_name];
    let attribute = alo.attribute(attribute_id);
    let is_taxon = attribute_name == ATTRIBUTE_TAXON;

    let mut sorted_levels = attribute.levels.clone();
    sorted_levels.sort_by_key(|&l| alo.level(l).name.clone());

    let path = dir.join(format!("{attribute_name}.cluster_summary.txt"));
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);

    let mut header = String::from("#cluster_id\tcluster_protein_count\tprotein_median_count\tTAXON_count\tattribute\tattribute_cluster_type\tprotein_span_mean\tprotein_span_sd");
    for &level_id in &sorted_levels {
        let name = &alo.level(level_id).name;
        write!(header, "\t{name}_count").unwrap();
        if !is_taxon {
            write!(header, "\t{name}_median\t{name}_cov").unwrap();
        }
    }
    header.push('\n');
    writer.write_all(header.as_bytes())?;

    let mut line = String::with_capacity(256);
    for cluster in clusters {
        let Some(&cluster_type) = cluster.cluster_type_by_attribute.get(&attribute_id) else {
            continue;
        };
        let buckets = level_value_buckets(cluster, alo, attribute_id);

        line.clear();
        write!(
            line,
            "{}\t{}\t{:.2}\t{}\t{}\t{}\t{}\t{}",
            cluster.name,
            cluster.protein_count(),
            cluster.protein_median,
            cluster.proteome_count(),
            attribute_name,
            cluster_type_str(cluster_type),
            NOT_AVAILABLE,
            NOT_AVAILABLE,
        )
        .unwrap();

        for &level_id in &sorted_levels {
            let values = buckets.get(&level_id);
            let count: u32 = values.map(|v| v.iter().sum()).unwrap_or(0);
            write!(line, "\t{count}").unwrap();
            if !is_taxon {
                match values {
                    Some(v) if !v.is_empty() => {
                        let as_f64: Vec<f64> = v.iter().map(|&c| c as f64).collect();
                        let median = stats::median(&as_f64);
                        let coverage = *cluster.coverage_by_level.get(&(attribute_id, level_id)).unwrap_or(&0.0);
                        write!(line, "\t{:.2}\t{}", median, format_coverage(coverage)).unwrap();
                    }
                    _ => {
                        write!(line, "\t{}\t{}", NOT_AVAILABLE, format_coverage(0.0)).unwrap();
                    }
                }
            }
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}

fn cluster_type_str(ty: crate::model::ClusterType) -> &'static str {
    match ty {
        crate::model::ClusterType::Singleton => "singleton",
        crate::model::ClusterType::Specific => "specific",
        crate::model::ClusterType::Shared => "shared",
    }
}
