//! Landcover change dashboard backend: loads the configured time slices and
//! writes class statistics, transition matrices, Sankey flow graphs,
//! comparison tables and map previews for an external renderer.
//!
//! JSON goes to stdout unless `--output` is given; logs go to stderr
//! (`RUST_LOG` overrides the default `info` level).

mod config;
mod raster;
mod render;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use landflow_core::{
    compare_counts, compute_transition_chain, compute_transitions, count_classes, to_flow_chain,
    to_flow_graph, write_comparison_csv, ClassCount, ClassRegistry, ClassShare, FlowGraph, LabelGrid,
    TransitionMatrix,
};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{DashboardConfig, TimeSlice};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "landflow",
    about = "Class statistics and transition flows between classified landcover rasters"
)]
struct Cli {
    /// Dashboard configuration (title, class registry, time slices)
    #[arg(long, global = true, default_value = "data/dashboard.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Slice pair selection; defaults to the first and last configured slice.
#[derive(clap::Args, Debug)]
struct PairArgs {
    /// Label of the earlier slice
    #[arg(long)]
    from: Option<String>,

    /// Label of the later slice
    #[arg(long)]
    to: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-class pixel counts and shares of one slice
    Stats {
        #[arg(long)]
        slice: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sankey flow graph between two slices
    Flows {
        #[command(flatten)]
        pair: PairArgs,
        /// Chain every configured slice in order instead of a single pair
        #[arg(long, conflicts_with_all = ["from", "to"])]
        chain: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Cross-tabulated transition matrix
    Matrix {
        #[command(flatten)]
        pair: PairArgs,
        /// Also write the matrix as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Per-class count comparison exported as CSV
    Compare {
        #[command(flatten)]
        pair: PairArgs,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Colored PNG preview of one slice
    Map {
        #[arg(long)]
        slice: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Every output at once into a directory
    Report {
        #[command(flatten)]
        pair: PairArgs,
        #[arg(short, long)]
        output: PathBuf,
    },
}

// ── Output types ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SliceStats<'a> {
    slice: &'a str,
    total: u64,
    nodata_cells: u64,
    unknown_cells: u64,
    shares: Vec<ClassShare>,
}

impl<'a> SliceStats<'a> {
    fn new(slice: &'a str, counts: &ClassCount, registry: &ClassRegistry) -> Self {
        Self {
            slice,
            total: counts.total(),
            nodata_cells: counts.nodata_cells,
            unknown_cells: counts.unknown_cells,
            shares: counts.shares(registry),
        }
    }
}

#[derive(Serialize)]
struct FlowReport<'a> {
    title: &'a str,
    slices: Vec<&'a str>,
    #[serde(flatten)]
    graph: FlowGraph,
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn load_slice(slice: &TimeSlice, registry: &ClassRegistry) -> Result<LabelGrid> {
    let grid = raster::load_grid(&slice.path, registry.nodata())
        .with_context(|| format!("cannot load slice {:?} from {}", slice.label, slice.path.display()))?;
    info!(
        slice = %slice.label,
        rows = grid.height,
        cols = grid.width,
        valid = grid.valid_cells(),
        "loaded grid"
    );
    Ok(grid)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, value)?;
            w.flush()?;
            info!("wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut w = stdout.lock();
            serde_json::to_writer_pretty(&mut w, value)?;
            writeln!(w)?;
        }
    }
    Ok(())
}

fn create_csv(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn warn_if_empty(graph: &FlowGraph) {
    if graph.is_empty() {
        warn!("no data: no cell is classified in both slices, flow graph is empty");
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn cmd_stats(cfg: &DashboardConfig, label: &str, output: Option<&Path>) -> Result<()> {
    let slice = cfg.slice(label)?;
    let grid = load_slice(slice, &cfg.registry)?;
    let counts = count_classes(&grid, &cfg.registry);
    if counts.unknown_cells > 0 {
        warn!(slice = %slice.label, cells = counts.unknown_cells, "dropped cells with unregistered class codes");
    }
    write_json(&SliceStats::new(&slice.label, &counts, &cfg.registry), output)
}

fn cmd_flows(cfg: &DashboardConfig, pair: &PairArgs, chain: bool, output: Option<&Path>) -> Result<()> {
    let slices: Vec<&TimeSlice> = if chain {
        cfg.slices.iter().collect()
    } else {
        let (a, b) = cfg.pair(pair.from.as_deref(), pair.to.as_deref())?;
        vec![a, b]
    };
    let grids = slices
        .iter()
        .map(|s| load_slice(s, &cfg.registry))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&LabelGrid> = grids.iter().collect();

    let steps = compute_transition_chain(&refs, cfg.registry.nodata())?;
    let graph = to_flow_chain(&steps, &cfg.registry)?;
    warn_if_empty(&graph);

    let report = FlowReport {
        title: cfg.title(),
        slices: slices.iter().map(|s| s.label.as_str()).collect(),
        graph,
    };
    write_json(&report, output)
}

fn cmd_matrix(cfg: &DashboardConfig, pair: &PairArgs, csv: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let (a, b) = cfg.pair(pair.from.as_deref(), pair.to.as_deref())?;
    let from = load_slice(a, &cfg.registry)?;
    let to = load_slice(b, &cfg.registry)?;
    let set = compute_transitions(&from, &to, cfg.registry.nodata())?;
    let matrix = TransitionMatrix::from_transitions(&set, &cfg.registry);
    if let Some(path) = csv {
        matrix.write_csv(create_csv(path)?)?;
        info!("wrote {}", path.display());
    }
    write_json(&matrix, output)
}

fn cmd_compare(cfg: &DashboardConfig, pair: &PairArgs, csv: &Path) -> Result<()> {
    let (a, b) = cfg.pair(pair.from.as_deref(), pair.to.as_deref())?;
    let t0 = count_classes(&load_slice(a, &cfg.registry)?, &cfg.registry);
    let t1 = count_classes(&load_slice(b, &cfg.registry)?, &cfg.registry);
    let rows = compare_counts(&t0, &t1, &cfg.registry);
    write_comparison_csv(&rows, create_csv(csv)?)?;
    info!(from = %a.label, to = %b.label, rows = rows.len(), "wrote {}", csv.display());
    Ok(())
}

fn cmd_map(cfg: &DashboardConfig, label: &str, output: &Path) -> Result<()> {
    let slice = cfg.slice(label)?;
    let grid = load_slice(slice, &cfg.registry)?;
    render::render_map(&grid, &cfg.registry)
        .save(output)
        .with_context(|| format!("failed to save {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(())
}

/// Write every output whose inputs load. Slices that fail to load are
/// skipped with a warning; a shape mismatch between the pair is an error.
fn cmd_report(cfg: &DashboardConfig, pair: &PairArgs, out_dir: &Path) -> Result<()> {
    let (a, b) = cfg.pair(pair.from.as_deref(), pair.to.as_deref())?;
    fs::create_dir_all(out_dir).with_context(|| format!("cannot create {}", out_dir.display()))?;

    let mut loaded: Vec<(&TimeSlice, LabelGrid, ClassCount)> = Vec::new();
    for slice in &cfg.slices {
        let grid = match load_slice(slice, &cfg.registry) {
            Ok(g) => g,
            Err(e) => {
                warn!(slice = %slice.label, "skipping slice: {e:#}");
                continue;
            }
        };
        let counts = count_classes(&grid, &cfg.registry);
        write_json(
            &SliceStats::new(&slice.label, &counts, &cfg.registry),
            Some(&out_dir.join(format!("stats_{}.json", slice.label))),
        )?;
        let png = out_dir.join(format!("map_{}.png", slice.label));
        render::render_map(&grid, &cfg.registry)
            .save(&png)
            .with_context(|| format!("failed to save {}", png.display()))?;
        info!("wrote {}", png.display());
        loaded.push((slice, grid, counts));
    }

    let find = |label: &str| loaded.iter().find(|(s, _, _)| s.label == label);
    let (Some((_, from, t0)), Some((_, to, t1))) = (find(&a.label), find(&b.label)) else {
        warn!(from = %a.label, to = %b.label, "pair not available, skipping comparison and transition outputs");
        return Ok(());
    };

    let rows = compare_counts(t0, t1, &cfg.registry);
    write_comparison_csv(&rows, create_csv(&out_dir.join("comparison.csv"))?)?;

    let set = compute_transitions(from, to, cfg.registry.nodata())
        .with_context(|| format!("cannot pair slices {:?} and {:?}", a.label, b.label))?;
    let matrix = TransitionMatrix::from_transitions(&set, &cfg.registry);
    matrix.write_csv(create_csv(&out_dir.join("matrix.csv"))?)?;
    write_json(&matrix, Some(&out_dir.join("matrix.json")))?;

    let graph = to_flow_graph(&set, &cfg.registry)?;
    warn_if_empty(&graph);
    let report = FlowReport {
        title: cfg.title(),
        slices: vec![a.label.as_str(), b.label.as_str()],
        graph,
    };
    write_json(&report, Some(&out_dir.join("flows.json")))?;

    info!(
        from = %a.label,
        to = %b.label,
        transitions = set.len(),
        cells = set.total(),
        "report complete"
    );
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = DashboardConfig::load(&cli.config)?;
    info!(title = cfg.title(), slices = cfg.slices.len(), classes = cfg.registry.len(), "loaded config");

    match &cli.command {
        Command::Stats { slice, output } => cmd_stats(&cfg, slice, output.as_deref()),
        Command::Flows { pair, chain, output } => cmd_flows(&cfg, pair, *chain, output.as_deref()),
        Command::Matrix { pair, csv, output } => cmd_matrix(&cfg, pair, csv.as_deref(), output.as_deref()),
        Command::Compare { pair, csv } => cmd_compare(&cfg, pair, csv),
        Command::Map { slice, output } => cmd_map(&cfg, slice, output),
        Command::Report { pair, output } => cmd_report(&cfg, pair, output),
    }
}
