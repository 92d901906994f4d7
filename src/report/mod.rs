//! Report writer.
//!
//! Grounded on the codebase's `write_results.rs`: the same
//! `clean_directory` + `create_dir_all` idiom, the same
//! `BufWriter::with_capacity(BUFFER_SIZE, file)` + reusable
//! `line_buffer` + `write!` + `write_all` pattern for every tabular
//! artefact.

pub mod attribute_metrics;
pub mod cluster_metrics;
pub mod cluster_summary;
pub mod counts_by_taxon;
pub mod format;
pub mod pairwise;
pub mod plots;
pub mod summary_json;
pub mod tree_metrics;

use std::fs;
use std::io;
use std::path::Path;

pub const BUFFER_SIZE: usize = 8192 * 32;

/// Removes then recreates the output directory, mirroring the
/// codebase's `clean_directory` helper.
pub fn prepare_output_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}
