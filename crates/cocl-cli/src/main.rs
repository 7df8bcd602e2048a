// crates/cocl-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cocl_core::io::{read_label_file, read_matrix_npy, write_final_labels};
use cocl_engine::{cluster, opts::default_workers, ClusterOpts};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "cocl",
    about = "Co-cluster a dense matrix into R x C blocks",
    long_about = "Co-cluster a dense matrix into R x C blocks.\n\nReads a 2-D f32 NPY matrix and an initial-labels file, runs the iterative\nblock-average refinement to convergence or the iteration cap, and writes the\nfinal row and column labels one per line.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    /// Input matrix (NPY, 2-D little-endian f32, C order)
    matrix: PathBuf,

    /// Initial labels: `numRows numCols`, `R C`, then row and column labels
    labels: PathBuf,

    /// Iteration cap
    #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(usize))]
    max_iterations: usize,

    /// Output path for the final labels (rows then columns, one per line)
    #[arg(long, default_value = "labels.out")]
    output: PathBuf,

    /// Worker ranks (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Optional JSON dump of per-iteration statistics
    #[arg(long)]
    stats: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse())
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Ensure the parent directory for a file exists.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", dir.display()))?;
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let matrix = read_matrix_npy(&cli.matrix)
        .with_context(|| format!("reading matrix {}", cli.matrix.display()))?;
    let spec = read_label_file(&cli.labels)
        .with_context(|| format!("reading labels {}", cli.labels.display()))?;

    if spec.num_rows != matrix.num_rows() || spec.num_cols != matrix.num_cols() {
        bail!(
            "label file declares a {}x{} matrix but {} is {}x{}",
            spec.num_rows,
            spec.num_cols,
            cli.matrix.display(),
            matrix.num_rows(),
            matrix.num_cols()
        );
    }

    let workers = cli.workers.unwrap_or_else(default_workers);
    let opts = ClusterOpts::new(spec.row_clusters, spec.col_clusters)
        .with_max_iterations(cli.max_iterations)
        .with_workers(workers);

    info!(
        rows = matrix.num_rows(),
        cols = matrix.num_cols(),
        row_clusters = spec.row_clusters,
        col_clusters = spec.col_clusters,
        workers,
        max_iterations = cli.max_iterations,
        "clustering"
    );

    let mut row_labels = spec.row_labels;
    let mut col_labels = spec.col_labels;
    let started = Instant::now();
    let stats = cluster(&matrix, &mut row_labels, &mut col_labels, &opts)
        .context("clustering failed")?;
    let elapsed = started.elapsed();

    ensure_parent_dir(&cli.output)?;
    write_final_labels(&cli.output, &row_labels, &col_labels)
        .with_context(|| format!("writing labels to {}", cli.output.display()))?;

    if let Some(path) = &cli.stats {
        ensure_parent_dir(path)?;
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(f), &stats)
            .context("serialize iteration statistics")?;
    }

    println!(
        "Clustered {}x{} into {}x{} blocks: {} iteration(s), {} in {:.3?} → {}",
        matrix.num_rows(),
        matrix.num_cols(),
        spec.row_clusters,
        spec.col_clusters,
        stats.rounds(),
        if stats.converged {
            "converged"
        } else {
            "iteration cap reached"
        },
        elapsed,
        cli.output.display()
    );
    if let Some(mean_error) = stats.final_error() {
        println!("Mean squared per-cell error: {mean_error:.6e}");
    }
    Ok(())
}
