//! Définition et implémentation des commandes CLI
//!
//! - `prepare` (défaut) : JSONL Esri → CSV typés, DDL, script de chargement, manifeste
//! - `geojson` : JSONL Esri → GeoJSON (sans base de données)
//! - `layers` : manifeste → descripteurs de couches

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use layer_prep::config::Config;
use layer_prep::layers::{build_layers, save_layers, FallbackResolver};
use layer_prep::manifest::load_manifest;
use layer_prep::pipeline::{self, PrepareOptions};
use layer_prep::report::RunReport;

/// Arguments de la préparation (commande par défaut)
#[derive(Args, Debug, Clone)]
pub struct PrepareArgs {
    /// Directory containing the .jsonl exports
    #[arg(short, long, default_value = "data/raw")]
    pub input: PathBuf,

    /// Output directory for CSV files, SQL scripts and manifest
    #[arg(short, long, default_value = "data/prepared")]
    pub output: PathBuf,

    /// Path to a JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target PostgreSQL schema (défaut : config / env LAYER_PREP_SCHEMA / public)
    #[arg(long)]
    pub schema: Option<String>,

    /// SRID of the geometry column (défaut : config / env LAYER_PREP_SRID / 4326)
    #[arg(long)]
    pub srid: Option<u32>,

    /// Drop and recreate tables in schema.sql
    #[arg(long)]
    pub drop_tables: bool,

    /// Maximum number of files processed concurrently (0 = all cores)
    #[arg(long, alias = "threads")]
    pub jobs: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prepare .jsonl exports for PostGIS (CSV + schema.sql + load.sql + manifest.json)
    Prepare(PrepareArgs),

    /// Export .jsonl files to GeoJSON (no database required)
    Geojson {
        /// Directory containing the .jsonl exports
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for GeoJSON files
        #[arg(short, long)]
        output: PathBuf,

        /// Path to a JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of files processed concurrently
        #[arg(long, alias = "threads")]
        jobs: Option<usize>,
    },

    /// Build layers.json from a manifest
    Layers {
        /// Path to manifest.json
        #[arg(short, long, default_value = "data/prepared/manifest.json")]
        manifest: PathBuf,

        /// Output path for layers.json
        #[arg(short, long, default_value = "data/prepared/layers.json")]
        output: PathBuf,

        /// Path to a JSON config file (declared layers)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Séquentiel par défaut ; `--jobs 0` prend le nombre de cœurs disponibles
fn default_jobs(jobs: Option<usize>) -> usize {
    match jobs {
        None => 1,
        Some(0) => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4),
        Some(n) => n,
    }
}

/// Exécute la commande prepare
pub fn cmd_prepare(args: &PrepareArgs) -> Result<RunReport> {
    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(schema) = &args.schema {
        config.schema = schema.clone();
    }
    if let Some(srid) = args.srid {
        config.srid = srid;
    }
    if args.drop_tables {
        config.drop_tables = true;
    }

    let jobs = default_jobs(args.jobs);

    println!("=== Prepare ===");
    println!("Input: {}", args.input.display());
    println!("Output: {}", args.output.display());
    println!("Schema: {}", config.schema);
    println!("SRID: {}", config.srid);
    println!("Drop tables: {}", config.drop_tables);
    println!("Jobs: {}", jobs);

    let report = pipeline::prepare(&PrepareOptions {
        input: args.input.clone(),
        output: args.output.clone(),
        config,
        jobs,
    })?;

    report.display();
    Ok(report)
}

/// Exécute la commande geojson ; retourne le nombre de fichiers en échec
pub fn cmd_geojson(input: &Path, output: &Path, config: Option<&Path>, jobs: Option<usize>) -> Result<usize> {
    let config = Config::resolve(config)?;
    let summary = pipeline::export_geojson(input, output, &config, default_jobs(jobs))?;

    println!("\n=== Export Complete ===");
    println!("Files: {}", summary.files);
    println!("Features: {}", summary.features);
    if summary.failed > 0 {
        println!("Failed: {}", summary.failed);
    }
    println!("Output: {}", output.display());
    Ok(summary.failed)
}

/// Exécute la commande layers
pub fn cmd_layers(manifest: &Path, output: &Path, config: Option<&Path>) -> Result<()> {
    let config = Config::resolve(config)?;
    let entries = load_manifest(manifest)?;
    let resolver = FallbackResolver::standard().context("Invalid column patterns")?;

    let layers = build_layers(&entries, &config.layers, &resolver);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    save_layers(&layers, output)?;

    info!(layers = layers.len(), output = %output.display(), "Layers written");
    println!("Wrote {} layers to {}", layers.len(), output.display());
    Ok(())
}
