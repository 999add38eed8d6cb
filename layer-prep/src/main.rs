//! Point d'entrée CLI pour layer-prep

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{Commands, PrepareArgs};

/// Préparer des exports JSONL Esri pour PostGIS
#[derive(Parser)]
#[command(name = "layer-prep")]
#[command(author, version)]
#[command(about = "Préparer des exports JSONL Esri pour PostGIS (défaut) ou GeoJSON")]
#[command(long_about = "Transforme des exports JSON Esri ligne par ligne en CSV typés, DDL PostGIS, script de chargement et manifeste.\n\nPar défaut, lance 'prepare'. Utilisez 'geojson' pour exporter en GeoJSON et 'layers' pour générer layers.json.")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Sous-commande (défaut: prepare)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Arguments de la préparation (commande par défaut)
    #[command(flatten)]
    prepare: PrepareArgs,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    let failed = match cli.command {
        Some(Commands::Geojson {
            input,
            output,
            config,
            jobs,
        }) => {
            info!(input = %input.display(), output = %output.display(), "Export vers GeoJSON");
            cli::cmd_geojson(&input, &output, config.as_deref(), jobs)? > 0
        }
        Some(Commands::Layers {
            manifest,
            output,
            config,
        }) => {
            info!(manifest = %manifest.display(), "Génération des couches");
            cli::cmd_layers(&manifest, &output, config.as_deref())?;
            false
        }
        Some(Commands::Prepare(args)) => cli::cmd_prepare(&args)?.has_failures(),
        None => {
            info!(input = %cli.prepare.input.display(), "Préparation");
            cli::cmd_prepare(&cli.prepare)?.has_failures()
        }
    };

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
