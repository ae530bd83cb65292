//! Blueprint Tester
//!
//! Command-line harness around `probe_blueprint`. Every command reads a
//! blueprint snapshot (JSON), optionally edits it, and prints the result.
//!
//! # Usage
//!
//! ```bash
//! blueprint_tester show probe.json
//! blueprint_tester edges probe.json --category 1 --workers 4
//! blueprint_tester fill probe.json --out filled.json --upper 2000
//! blueprint_tester move probe.json --out moved.json --y -2
//! blueprint_tester extend probe.json --out grown.json --category 1 --up 2 --down 2
//! blueprint_tester png probe.json --out probe.png --scale 6
//! ```

mod image_helper;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use probe_blueprint::{
    AreaChange, AreaThreshold, Blueprint, BlueprintEditor, Category, CategoryFilter, EdgeWorkerPool,
    EditorConfig, ElectrodeSelector, Movement, Snapshot, UNSET,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "blueprint_tester")]
#[command(author, version, about = "Inspect and edit probe blueprint snapshots", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Editor configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the category layout and counts
    Show { snapshot: PathBuf },

    /// Print the outline of every zone as JSON
    Edges {
        snapshot: PathBuf,
        /// Only zones of this category
        #[arg(long)]
        category: Option<Category>,
        /// Print bounding rectangles instead of traced outlines
        #[arg(long)]
        bounds: bool,
        /// Trace on a worker pool of this size
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Fill the bounding rectangle of every zone within the area range
    Fill {
        snapshot: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        lower: Option<f64>,
        #[arg(long)]
        upper: Option<f64>,
    },

    /// Translate set electrodes by whole grid steps
    Move {
        snapshot: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        x: i32,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        y: i32,
        /// Only move electrodes of this category
        #[arg(long)]
        category: Option<Category>,
    },

    /// Grow zones of a category into unset electrodes
    Extend(ZoneEdit),

    /// Erode zones of a category
    Reduce(ZoneEdit),

    /// Unset whole zones of a category within the area range
    Remove {
        snapshot: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        category: Category,
        #[arg(long)]
        lower: Option<f64>,
        #[arg(long)]
        upper: Option<f64>,
    },

    /// Render the blueprint as a PNG image
    Png {
        snapshot: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        /// Pixels per electrode
        #[arg(long, default_value = "4")]
        scale: u32,
    },
}

#[derive(Args, Debug)]
struct ZoneEdit {
    snapshot: PathBuf,
    #[arg(short, long)]
    out: PathBuf,
    #[arg(long)]
    category: Category,
    /// Category written by the edit; defaults to the zone category for
    /// extend and unset for reduce
    #[arg(long)]
    value: Option<Category>,
    #[arg(long, default_value = "0")]
    up: u32,
    #[arg(long, default_value = "0")]
    down: u32,
    #[arg(long, default_value = "0")]
    left: u32,
    #[arg(long, default_value = "0")]
    right: u32,
    #[arg(long)]
    lower: Option<f64>,
    #[arg(long)]
    upper: Option<f64>,
}

impl ZoneEdit {
    fn change(&self) -> AreaChange {
        AreaChange::new(self.up, self.down, self.left, self.right)
    }

    fn threshold(&self) -> AreaThreshold {
        threshold(self.lower, self.upper, AreaThreshold::ALL)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Commands::Show { snapshot } => {
            let blueprint = load(&snapshot)?;
            show(&blueprint);
        }
        Commands::Edges {
            snapshot,
            category,
            bounds,
            workers,
        } => {
            let mut blueprint = load(&snapshot)?;
            let filter = filter_of(category);
            let mut edges = match workers {
                Some(n) => {
                    let pool = EdgeWorkerPool::with_workers(n, config.small_corner_tolerance);
                    let edges = pool.clustering_edges(Arc::new(blueprint), filter).await?;
                    pool.shutdown().await;
                    edges
                }
                None => BlueprintEditor::with_config(&mut blueprint, config).clustering_edges(filter)?,
            };
            if bounds {
                edges = edges.iter().map(|e| e.convex()).collect();
            }
            println!("{}", serde_json::to_string_pretty(&edges)?);
        }
        Commands::Fill {
            snapshot,
            out,
            category,
            lower,
            upper,
        } => {
            let mut blueprint = load(&snapshot)?;
            let threshold = threshold(lower, upper, config.fill_threshold);
            let painted = BlueprintEditor::with_config(&mut blueprint, config).fill(filter_of(category), &threshold)?;
            info!(painted, "fill complete");
            store(&blueprint, &out)?;
        }
        Commands::Move {
            snapshot,
            out,
            x,
            y,
            category,
        } => {
            let mut blueprint = load(&snapshot)?;
            let selector = match category {
                Some(c) => ElectrodeSelector::Category(c),
                None => ElectrodeSelector::All,
            };
            let moved = BlueprintEditor::with_config(&mut blueprint, config).move_by(Movement::new(x, y), &selector)?;
            info!(moved, "move complete");
            store(&blueprint, &out)?;
        }
        Commands::Extend(edit) => {
            let mut blueprint = load(&edit.snapshot)?;
            let value = edit.value.unwrap_or(edit.category);
            let written = BlueprintEditor::with_config(&mut blueprint, config).extend(
                edit.category,
                &edit.change(),
                value,
                &edit.threshold(),
            )?;
            info!(written, "extend complete");
            store(&blueprint, &edit.out)?;
        }
        Commands::Reduce(edit) => {
            let mut blueprint = load(&edit.snapshot)?;
            let value = edit.value.unwrap_or(UNSET);
            let removed = BlueprintEditor::with_config(&mut blueprint, config).reduce(
                edit.category,
                &edit.change(),
                value,
                &edit.threshold(),
            )?;
            info!(removed, "reduce complete");
            store(&blueprint, &edit.out)?;
        }
        Commands::Remove {
            snapshot,
            out,
            category,
            lower,
            upper,
        } => {
            let mut blueprint = load(&snapshot)?;
            let threshold = threshold(lower, upper, AreaThreshold::ALL);
            let removed = BlueprintEditor::with_config(&mut blueprint, config).remove_zones(category, &threshold)?;
            info!(removed, "remove complete");
            store(&blueprint, &out)?;
        }
        Commands::Png { snapshot, out, scale } => {
            let blueprint = load(&snapshot)?;
            let (width, height, buffer) = image_helper::render(&blueprint, scale);
            image_helper::save(&out, width, height, &buffer)
                .with_context(|| format!("failed to write '{}'", out.display()))?;
            info!(width, height, path = %out.display(), "png written");
        }
    }

    Ok(())
}

fn load(path: &Path) -> anyhow::Result<Blueprint> {
    let blueprint = Snapshot::read(path)?.to_blueprint()?;
    info!(electrodes = blueprint.len(), path = %path.display(), "snapshot loaded");
    Ok(blueprint)
}

fn store(blueprint: &Blueprint, path: &Path) -> anyhow::Result<()> {
    Snapshot::capture(blueprint).write(path)?;
    show(blueprint);
    Ok(())
}

fn show(blueprint: &Blueprint) {
    print!("{}", blueprint.render_text());
    let mut categories: Vec<Category> = blueprint.categories().to_vec();
    categories.sort_unstable();
    categories.dedup();
    for c in categories.into_iter().filter(|&c| c != UNSET) {
        println!("category {c}: {} electrodes", blueprint.count(c));
    }
}

fn filter_of(category: Option<Category>) -> CategoryFilter {
    category.map_or(CategoryFilter::AnySet, CategoryFilter::Exactly)
}

fn threshold(lower: Option<f64>, upper: Option<f64>, fallback: AreaThreshold) -> AreaThreshold {
    AreaThreshold::new(lower.unwrap_or(fallback.lower), upper.unwrap_or(fallback.upper))
}
