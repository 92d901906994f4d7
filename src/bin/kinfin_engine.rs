//! `kinfin-engine` CLI: a single `analyse` sub-command.
//!
//! Grounded on the codebase's `src/bin/taxago.rs`: `clap::Parser`
//! derive structs, `mimalloc::MiMalloc` as the global allocator, an
//! explicit `rayon::ThreadPoolBuilder::build_global()` call, and a
//! `match ... { Err(e) => { eprintln!(...); return ExitCode::FAILURE }
//! }` idiom in `main` rather than propagating with `?`.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use kinfin_engine::alo::build_alo_collection;
use kinfin_engine::analyser::analyse_clusters;
use kinfin_engine::config::{PlotFormat, RunConfig, TestKind};
use kinfin_engine::error::{EngineError, Result};
use kinfin_engine::parsers::cluster_file::parse_cluster_file;
use kinfin_engine::parsers::config_file::{parse_config_csv, parse_config_json};
use kinfin_engine::parsers::newick::parse_newick;
use kinfin_engine::parsers::nodes_db::parse_nodes_db;
use kinfin_engine::report;
use kinfin_engine::rarefaction::run_rarefaction;
use kinfin_engine::tree::build_tree;

#[derive(Parser, Debug)]
#[command(name = "kinfin-engine", about, version, author)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the cluster analysis engine over a cluster file and an
    /// attribute-config table, and write the full report bundle.
    Analyse(AnalyseArgs),
}

#[derive(Args, Debug)]
struct AnalyseArgs {
    #[arg(short = 'g', long = "cluster-file", value_name = "FILE", help = "Orthologous-group cluster file.", required = true)]
    cluster_file: PathBuf,

    #[arg(short = 'c', long = "config-file", value_name = "FILE", help = "Taxon-attribute configuration table (CSV, or JSON with --taxon-idx-mapping).", required = true)]
    config_file: PathBuf,

    #[arg(long = "config-json", help = "Parse --config-file as the JSON variant instead of CSV.")]
    config_json: bool,

    #[arg(long = "taxon-idx-mapping", value_name = "FILE", help = "TAXON -> IDX JSON map, required when --config-json is set.")]
    taxon_idx_mapping: Option<PathBuf>,

    #[arg(short = 'o', long = "output-dir", value_name = "DIRECTORY", help = "Directory the report bundle is written into.", required = true)]
    output_dir: PathBuf,

    #[arg(long = "nodes-db", value_name = "FILE", help = "NCBI-style taxid nodes database (tab-separated, optionally gzip-compressed), required when the config declares TAXID.")]
    nodes_db: Option<PathBuf>,

    #[arg(short = 't', long = "tree-file", value_name = "FILE", help = "Newick tree file (ALOs are accumulated against its nodes).")]
    tree_file: Option<PathBuf>,

    #[arg(long = "taxranks", value_name = "LIST", help = "Comma-separated taxranks synthesised from TAXID lineage lookup.", default_value = "phylum,order,genus")]
    taxranks: String,

    #[arg(short = 'n', long = "fuzzy-count", value_name = "COUNT", help = "Target per-proteome protein count for fuzzy 1-to-1 classification.", default_value_t = 1)]
    fuzzy_count: u32,

    #[arg(short = 'f', long = "fuzzy-fraction", value_name = "FRACTION", help = "Minimum fraction of proteomes at the target count for fuzzy 1-to-1.", default_value_t = 0.75)]
    fuzzy_fraction: f64,

    #[arg(long = "fuzzy-min", value_name = "COUNT", help = "Minimum count an exception may take in a fuzzy 1-to-1 cluster.", default_value_t = 0)]
    fuzzy_min: u32,

    #[arg(long = "fuzzy-max", value_name = "COUNT", help = "Maximum count an exception may take in a fuzzy 1-to-1 cluster.", default_value_t = 20)]
    fuzzy_max: u32,

    #[arg(long = "min-proteomes", value_name = "COUNT", help = "Minimum positive-count proteomes required on each side of a representation test.", default_value_t = 2)]
    min_proteomes: usize,

    #[arg(long = "test", value_enum, help = "Representation-test variant.", default_value_t = TestKind::Mannwhitneyu)]
    test: TestKind,

    #[arg(short = 'r', long = "repetitions", value_name = "COUNT", help = "Rarefaction repetitions per (attribute, level).", default_value_t = 30)]
    repetitions: u32,

    #[arg(long = "seed", value_name = "SEED", help = "RNG seed driving the rarefaction sampler.", default_value_t = 0)]
    seed: u64,

    #[arg(
        long = "infer-singletons",
        help = "Treat proteins absent from the clustering as implicit singleton clusters.",
        default_value_t = true
    )]
    infer_singletons: bool,

    #[arg(long = "plot-format", value_enum, help = "Image format for rendered plots.", default_value_t = PlotFormat::Svg)]
    plot_format: PlotFormat,

    #[arg(long = "cores", value_name = "NUMBER", help = "Worker threads for the rayon pool. Uses all available by default.", default_value_t = num_cpus::get())]
    num_cores: usize,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli_args = CliArgs::parse();
    let Command::Analyse(args) = cli_args.command;

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: AnalyseArgs) -> Result<()> {
    let config = RunConfig {
        fuzzy_count: args.fuzzy_count,
        fuzzy_fraction: args.fuzzy_fraction,
        fuzzy_min: args.fuzzy_min,
        fuzzy_max: args.fuzzy_max,
        min_proteomes: args.min_proteomes.max(1),
        test: args.test,
        repetitions: args.repetitions,
        seed: args.seed,
        taxranks: args.taxranks.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
        infer_singletons: args.infer_singletons,
        plot_format: args.plot_format,
        threads: args.num_cores.max(1),
    };
    config.validate()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .map_err(|e| EngineError::config(format!("failed to initialize rayon thread pool: {e}")))?;

    log::info!("[STATUS]\t- starting analysis with {} worker thread(s)", config.threads);

    let config_table = if args.config_json {
        let mapping = args.taxon_idx_mapping.ok_or_else(|| {
            EngineError::config("--taxon-idx-mapping is required when --config-json is set")
        })?;
        parse_config_json(&args.config_file, &mapping)?
    } else {
        parse_config_csv(&args.config_file)?
    };

    let nodes_db = match &args.nodes_db {
        Some(path) => Some(parse_nodes_db(path)?),
        None => None,
    };

    let alo = build_alo_collection(&config_table, nodes_db.as_ref(), &config.taxranks)?;

    let (mut clusters, summary) = parse_cluster_file(&args.cluster_file, &alo.proteome_by_name)?;
    if clusters.is_empty() {
        return Err(EngineError::referential(
            "no cluster retained a protein from a configured proteome; nothing to analyse",
        ));
    }

    let tree = match &args.tree_file {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
            let raw = parse_newick(&content)?;
            let outgroup = alo.outgroup_proteomes();
            Some(build_tree(&raw, &alo.proteome_by_name, &outgroup)?)
        }
        None => None,
    };

    let analysis = analyse_clusters(&mut clusters, &alo, &config);

    let mut tree = tree;
    let mut synapomorphies = Vec::new();
    if let Some(tree) = tree.as_mut() {
        for cluster in &clusters {
            synapomorphies.extend(tree.accumulate_cluster(cluster));
        }
    }

    log::info!("[STATUS]\t- running rarefaction sampler");
    let rarefaction_results = run_rarefaction(&clusters, &alo, &config);

    report::prepare_output_dir(&args.output_dir).map_err(|e| EngineError::io(&args.output_dir, e))?;

    log::info!("[STATUS]\t- writing report bundle to {}", args.output_dir.display());

    report::summary_json::write_summary_json(&args.output_dir.join("summary.json"), &summary)
        .map_err(|e| EngineError::io(&args.output_dir, e))?;
    report::counts_by_taxon::write_counts_by_taxon(&args.output_dir, &clusters, &alo)
        .map_err(|e| EngineError::io(&args.output_dir, e))?;
    report::plots::write_cluster_size_distribution(&args.output_dir, &clusters, config.plot_format)
        .map_err(|e| EngineError::io(&args.output_dir, e))?;

    for attribute in &alo.attributes {
        let attribute_dir = args.output_dir.join(attribute.name.as_str());
        std::fs::create_dir_all(&attribute_dir).map_err(|e| EngineError::io(&attribute_dir, e))?;

        report::attribute_metrics::write_attribute_metrics(&attribute_dir, &attribute.name, &clusters, &alo, &analysis)
            .map_err(|e| EngineError::io(&attribute_dir, e))?;
        report::cluster_summary::write_cluster_summary(&attribute_dir, &attribute.name, &clusters, &alo)
            .map_err(|e| EngineError::io(&attribute_dir, e))?;
        report::pairwise::write_pairwise(&attribute_dir, &attribute.name, attribute.id, &clusters, &alo, &analysis)
            .map_err(|e| EngineError::io(&attribute_dir, e))?;

        let mut sorted_levels = attribute.levels.clone();
        sorted_levels.sort_by_key(|&l| alo.level(l).name.clone());
        for level_id in sorted_levels {
            let level = alo.level(level_id);
            report::cluster_metrics::write_level_reports(
                &attribute_dir,
                &attribute.name,
                &level.name,
                attribute.id,
                level_id,
                &clusters,
                &alo,
                &analysis,
            )
            .map_err(|e| EngineError::io(&attribute_dir, e))?;
        }

        let attribute_rarefaction: Vec<_> = rarefaction_results
            .iter()
            .filter(|r| r.attribute_id == attribute.id)
            .cloned()
            .collect();
        report::plots::write_rarefaction_curves(&attribute_dir, &attribute_rarefaction, &alo, config.plot_format)
            .map_err(|e| EngineError::io(&attribute_dir, e))?;
    }

    if let Some(tree) = &tree {
        let tree_dir = args.output_dir.join("tree");
        std::fs::create_dir_all(&tree_dir).map_err(|e| EngineError::io(&tree_dir, e))?;

        report::tree_metrics::write_tree_newick(&tree_dir, tree).map_err(|e| EngineError::io(&tree_dir, e))?;
        report::tree_metrics::write_tree_ascii(&tree_dir, tree).map_err(|e| EngineError::io(&tree_dir, e))?;
        report::tree_metrics::write_tree_node_metrics(&tree_dir, tree).map_err(|e| EngineError::io(&tree_dir, e))?;
        report::tree_metrics::write_tree_cluster_metrics(&tree_dir, tree, &synapomorphies)
            .map_err(|e| EngineError::io(&tree_dir, e))?;
    }

    log::info!(
        "[STATUS]\t- finished: {} clusters analysed, {} excluded proteins",
        clusters.len(),
        summary.excluded_proteins_count
    );

    Ok(())
}
