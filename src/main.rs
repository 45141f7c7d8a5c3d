use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lumen::catalog::{Catalog, CatalogStats};
use lumen::config::Config;
use lumen::db::SqliteCatalog;
use lumen::export::PreviewExporter;
use lumen::preview::PreviewCache;

/// Statistics and cached previews from photo catalogs
#[derive(Parser, Debug)]
#[command(name = "lumen", version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute every distribution for one or more catalogs, merged into one report
    Stats {
        /// Catalog files (.lrcat)
        #[arg(required = true)]
        catalogs: Vec<PathBuf>,

        /// Indent the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the camera x lens x aperture x focal length x exposure table
    Sunburst {
        /// Catalog file (.lrcat)
        catalog: PathBuf,

        /// Indent the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Extract cached previews from a catalog
    Extract {
        /// Catalog file (.lrcat)
        catalog: PathBuf,

        /// Directory to write extracted previews to
        #[arg(short = 'o', long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    init_tracing(&config, cli.verbose);

    match cli.command {
        Command::Stats { catalogs, pretty } => stats(&catalogs, pretty).await,
        Command::Sunburst { catalog, pretty } => sunburst(&catalog, pretty).await,
        Command::Extract {
            catalog,
            output_dir,
        } => extract(&config, &catalog, output_dir).await,
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    // RUST_LOG wins; otherwise --verbose, then the configured level
    let fallback = if verbose { "debug" } else { config.log_filter.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // stdout carries JSON output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_catalog(path: &Path) -> anyhow::Result<SqliteCatalog> {
    SqliteCatalog::open(path)
        .await
        .with_context(|| format!("Error opening catalog {}", path.display()))
}

async fn stats(paths: &[PathBuf], pretty: bool) -> anyhow::Result<()> {
    let mut snapshots = Vec::with_capacity(paths.len());

    for path in paths {
        let store = open_catalog(path).await?;
        let catalog = Catalog::from_store(store.clone());
        let snapshot = catalog.stats().await;
        store.close().await;

        let snapshot =
            snapshot.with_context(|| format!("Error reading catalog {}", path.display()))?;
        info!(
            catalog = %path.display(),
            photos = snapshot.photo_count(),
            "Collected catalog stats"
        );
        snapshots.push(snapshot);
    }

    print_json(&CatalogStats::merge(&snapshots), pretty)
}

async fn sunburst(path: &Path, pretty: bool) -> anyhow::Result<()> {
    let store = open_catalog(path).await?;
    let catalog = Catalog::from_store(store.clone());
    let records = catalog.sunburst_stats().await;
    store.close().await;

    print_json(&records?, pretty)
}

async fn extract(config: &Config, path: &Path, output_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let store = open_catalog(path).await?;
    let catalog = Catalog::from_store(store.clone());

    let previews = PreviewCache::open_for_catalog(path)
        .await
        .context("Error opening previews catalog")?;

    let exporter = PreviewExporter::new(output_dir.unwrap_or_else(|| config.output_dir.clone()))
        .with_extension(config.preview_extension.clone());

    let result = exporter.extract(&catalog, &previews).await;
    store.close().await;

    let summary = result?;
    info!(
        catalog = %path.display(),
        success_count = summary.success_count,
        error_count = summary.error_count,
        "Extraction finished"
    );
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
