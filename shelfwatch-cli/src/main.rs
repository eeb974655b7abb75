//! Shelfwatch CLI — run the aggregation pipeline and manage the goods catalog.
//!
//! Commands:
//! - `run` — fetch every region from the BLS API and write the projection
//!   set to an output directory
//! - `catalog validate` — check catalog invariants (duplicate series ids,
//!   duplicate data keys)
//! - `catalog show` — summarize categories, items, and per-region request
//!   lists
//! - `catalog init` — write the built-in sample catalog as a starting point

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shelfwatch_core::{Catalog, CatalogIndex, Region};
use shelfwatch_pipeline::{
    run_pipeline, BlsSource, FsStore, PipelineConfig, StdoutProgress,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "shelfwatch",
    about = "shelfwatch — regional price-index aggregation pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all regions and write the projection set.
    Run {
        /// Path to the goods catalog TOML.
        #[arg(long, default_value = "catalog.toml")]
        catalog: PathBuf,

        /// Output directory the projections are written under.
        #[arg(long, default_value = "public")]
        out: PathBuf,

        /// Path to a pipeline config TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured year window length.
        #[arg(long)]
        years: Option<i32>,

        /// Also write one object per (region, item) pair.
        #[arg(long, default_value_t = false)]
        per_item: bool,
    },
    /// Catalog management commands.
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Check catalog invariants.
    Validate {
        #[arg(long, default_value = "catalog.toml")]
        catalog: PathBuf,
    },
    /// Summarize categories, items, and per-region request lists.
    Show {
        #[arg(long, default_value = "catalog.toml")]
        catalog: PathBuf,
    },
    /// Write the built-in sample catalog.
    Init {
        #[arg(long, default_value = "catalog.toml")]
        catalog: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            catalog,
            out,
            config,
            years,
            per_item,
        } => run_cmd(&catalog, &out, config.as_deref(), years, per_item),
        Commands::Catalog { action } => match action {
            CatalogAction::Validate { catalog } => validate_cmd(&catalog),
            CatalogAction::Show { catalog } => show_cmd(&catalog),
            CatalogAction::Init { catalog } => init_cmd(&catalog),
        },
    }
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    Catalog::from_file(path).with_context(|| format!("load catalog from {}", path.display()))
}

fn run_cmd(
    catalog_path: &Path,
    out: &Path,
    config_path: Option<&Path>,
    years: Option<i32>,
    per_item: bool,
) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;

    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(years) = years {
        config.years_back = years;
    }
    if per_item {
        config.per_item_projections = true;
    }

    let source = BlsSource::from_env(&config)?;
    let store = FsStore::new(out);

    let report = run_pipeline(&source, &store, &catalog, &config, &StdoutProgress)?;

    println!(
        "\nRun complete: {} region(s) aggregated, {} object(s) written to {}",
        report.regions_fetched.len(),
        report.objects_written.len(),
        store.root().display()
    );
    for (region, error) in &report.regions_failed {
        println!("  skipped {region}: {error}");
    }
    Ok(())
}

fn validate_cmd(catalog_path: &Path) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    CatalogIndex::build(&catalog)?;
    println!(
        "OK: {} categories, {} items",
        catalog.categories.len(),
        catalog.item_count()
    );
    Ok(())
}

fn show_cmd(catalog_path: &Path) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let index = CatalogIndex::build(&catalog)?;

    for category in &catalog.categories {
        println!("{} ({})", category.name, category.id);
        for item in &category.items {
            let regions: Vec<&str> = item.series.keys().map(Region::as_str).collect();
            println!(
                "  {} — {} per {} [{}]",
                item.data_key,
                item.name,
                item.unit,
                regions.join(", ")
            );
        }
    }

    println!();
    for region in Region::ALL {
        println!("{region}: {} series", index.series_ids(region).len());
    }
    Ok(())
}

fn init_cmd(catalog_path: &Path) -> Result<()> {
    if catalog_path.exists() {
        bail!("{} already exists", catalog_path.display());
    }
    let catalog = Catalog::sample();
    std::fs::write(catalog_path, catalog.to_toml()?)
        .with_context(|| format!("write {}", catalog_path.display()))?;
    println!(
        "Wrote sample catalog ({} items) to {}",
        catalog.item_count(),
        catalog_path.display()
    );
    Ok(())
}
