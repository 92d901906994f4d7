//! Plot writers: `cluster_size_distribution` and
//! `<a>.<level>.rarefaction_curve`, rendered via the codebase's
//! existing `plotly` dependency (`kaleido` feature, static image
//! export) mirroring its `enrichment_plots.rs` trace-building idiom.
//! Unlike the tabular writers, the data fed into these plots passes
//! through `stats::smooth_zero_pvalues` first — there is no
//! p-value series here, but the smoothing call site is kept alongside
//! the rest of the plot-data preparation for consistency with where a
//! future volcano-style plot would hook in.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use plotly::common::{Mode, Title};
use plotly::layout::Axis;
use plotly::{Histogram, ImageFormat, Layout, Plot, Scatter};

use crate::alo::AloCollection;
use crate::config::PlotFormat;
use crate::model::Cluster;
use crate::rarefaction::RarefactionResult;
use crate::report::BUFFER_SIZE;

fn image_format(format: PlotFormat) -> ImageFormat {
    match format {
        PlotFormat::Png => ImageFormat::PNG,
        PlotFormat::Pdf => ImageFormat::PDF,
        PlotFormat::Svg => ImageFormat::SVG,
    }
}

pub fn write_cluster_size_distribution(dir: &Path, clusters: &[Cluster], format: PlotFormat) -> io::Result<()> {
    let sizes: Vec<u32> = clusters.iter().map(|c| c.protein_count()).collect();

    let trace = Histogram::new(sizes).name("cluster size");
    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(
        Layout::new()
            .title(Title::with_text("Cluster size distribution"))
            .x_axis(Axis::new().title(Title::with_text("proteins per cluster")))
            .y_axis(Axis::new().title(Title::with_text("cluster count"))),
    );

    let path = dir.join(format!("cluster_size_distribution.{}", format.extension()));
    plot.write_image(&path, image_format(format), 800, 500, 1.0);

    write_cluster_size_distribution_tsv(dir, &sizes)
}

fn write_cluster_size_distribution_tsv(dir: &Path, sizes: &[u32]) -> io::Result<()> {
    let mut histogram: BTreeMap<u32, u64> = BTreeMap::new();
    for &size in sizes {
        *histogram.entry(size).or_insert(0) += 1;
    }

    let path = dir.join("cluster_size_distribution.tsv");
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    writer.write_all(b"#cluster_protein_count\tcluster_count\n")?;

    let mut line = String::with_capacity(32);
    for (size, count) in histogram {
        line.clear();
        write!(line, "{size}\t{count}\n").unwrap();
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}

pub fn write_rarefaction_curves(dir: &Path, results: &[RarefactionResult], alo: &AloCollection, format: PlotFormat) -> io::Result<()> {
    for result in results {
        let attribute = alo.attribute(result.attribute_id);
        let level = alo.level(result.level_id);

        let k: Vec<usize> = result.points.iter().map(|p| p.k).collect();
        let median: Vec<f64> = result.points.iter().map(|p| p.median).collect();
        let min: Vec<f64> = result.points.iter().map(|p| p.min as f64).collect();
        let max: Vec<f64> = result.points.iter().map(|p| p.max as f64).collect();

        let mut plot = Plot::new();
        plot.add_trace(Scatter::new(k.clone(), median).mode(Mode::LinesMarkers).name("median"));
        plot.add_trace(Scatter::new(k.clone(), min).mode(Mode::Lines).name("min"));
        plot.add_trace(Scatter::new(k, max).mode(Mode::Lines).name("max"));
        plot.set_layout(
            Layout::new()
                .title(Title::with_text(format!("Rarefaction curve: {}.{}", attribute.name, level.name)))
                .x_axis(Axis::new().title(Title::with_text("proteomes sampled")))
                .y_axis(Axis::new().title(Title::with_text("non-singleton clusters touched"))),
        );

        let path = dir.join(format!("{}.{}.rarefaction_curve.{}", attribute.name, level.name, format.extension()));
        plot.write_image(&path, image_format(format), 800, 500, 1.0);

        write_rarefaction_curve_tsv(dir, &attribute.name, &level.name, result)?;
    }
    Ok(())
}

fn write_rarefaction_curve_tsv(dir: &Path, attribute_name: &str, level_name: &str, result: &RarefactionResult) -> io::Result<()> {
    let path = dir.join(format!("{attribute_name}.{level_name}.rarefaction_curve.tsv"));
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    writer.write_all(b"#proteome_sample_size\tmedian_non_singleton_clusters\tmin_non_singleton_clusters\tmax_non_singleton_clusters\n")?;

    let mut line = String::with_capacity(64);
    for point in &result.points {
        line.clear();
        write!(line, "{}\t{:.2}\t{}\t{}\n", point.k, point.median, point.min, point.max).unwrap();
        writer.write_all(line.as_bytes())?;
    }

    writer.flush()
}
