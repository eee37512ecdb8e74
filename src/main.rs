use anyhow::Context;
use clap::{Parser, Subcommand};
use fhir_migrations::{
    create_catalog, read_config, FhirClient, FhirMarkerStore, FileMarkerStore, MarkerBackend,
    MarkerStore, MigrationConfig, MigrationEngine,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG_FILE: &str = "migrations.json";

/// FHIR Migrations - revision-chained data migrations for FHIR stores
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON configuration file (optional)
    #[arg(short, long, env = "FHIR_MIGRATIONS_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory new migration stubs are written to
    #[arg(long, env = "MIGRATION_SCRIPTS_DIR")]
    migrations_dir: Option<PathBuf>,

    /// FHIR server base URL
    #[arg(long, env = "FHIR_URL")]
    fhir_url: Option<String>,

    /// Identifier value of the marker resource
    #[arg(long, env = "MIGRATION_RESOURCE_ID")]
    resource_id: Option<String>,

    /// Where the applied-migration marker is stored
    #[arg(long, value_enum, env = "MIGRATION_MARKER_STORE")]
    marker_store: Option<MarkerBackend>,

    /// Marker file used by the file backend
    #[arg(long, env = "MIGRATION_MARKER_FILE")]
    marker_file: Option<PathBuf>,

    /// Print command results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new migration stub
    Create {
        /// Name of the migration module to create
        name: String,
    },
    /// Run all unapplied migrations
    Upgrade,
    /// Revert the most recently applied migration
    Downgrade,
    /// Clear the applied-migration marker
    Reset,
    /// Show applied, latest and pending migrations
    Status,
}

/// Defaults, then the config file, then flags and environment.
async fn load_config(args: &Args) -> anyhow::Result<MigrationConfig> {
    let mut config = read_config(&args.config)
        .await
        .with_context(|| format!("Reading config {}", args.config.display()))?
        .unwrap_or_default();

    if let Some(dir) = &args.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    if let Some(url) = &args.fhir_url {
        config.fhir_url = url.clone();
    }
    if let Some(id) = &args.resource_id {
        config.migration_resource_id = id.clone();
    }
    if let Some(backend) = args.marker_store {
        config.marker_store = backend;
    }
    if let Some(file) = &args.marker_file {
        config.marker_file = file.clone();
    }

    Ok(config)
}

fn build_store(config: &MigrationConfig, client: &FhirClient) -> Arc<dyn MarkerStore> {
    match config.marker_store {
        MarkerBackend::Fhir => Arc::new(FhirMarkerStore::new(
            client.clone(),
            config.migration_system.clone(),
            config.migration_resource_id.clone(),
        )),
        MarkerBackend::File => Arc::new(FileMarkerStore::new(config.marker_file.clone())),
    }
}

fn display(revision: Option<&str>) -> &str {
    revision.unwrap_or("None")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_config(&args).await?;

    info!(
        marker_store = ?config.marker_store,
        migrations_dir = %config.migrations_dir.display(),
        "Loaded migration configuration"
    );

    let client = FhirClient::new(&config.fhir_url)?;
    let store = build_store(&config, &client);
    let engine = MigrationEngine::new(create_catalog(client), store, config.migrations_dir.clone());

    match args.command {
        Command::Create { name } => {
            let created = engine.create(&name).await?;
            if args.json {
                return print_json(&created);
            }
            println!(
                "Created migration {} ({}) at {}",
                created.name,
                created.revision,
                created.path.display()
            );
            println!("Register it in the migration catalog before running upgrade.");
        }
        Command::Upgrade => {
            let result = engine.upgrade().await?;
            if args.json {
                print_json(&result)?;
            } else if result.is_noop() {
                println!("Already up to date");
            } else {
                println!(
                    "Applied {} migration(s); now at {}",
                    result.migrations_run.len(),
                    display(result.to_revision.as_deref())
                );
            }
        }
        Command::Downgrade => {
            let result = engine.downgrade().await?;
            if args.json {
                print_json(&result)?;
            } else if result.is_noop() {
                println!("No applied migration to revert");
            } else {
                println!(
                    "Reverted {}; now at {}",
                    display(result.from_revision.as_deref()),
                    display(result.to_revision.as_deref())
                );
            }
        }
        Command::Reset => {
            engine.reset().await?;
            println!("Applied migration marker reset to None");
        }
        Command::Status => {
            let status = engine.status().await?;
            if args.json {
                return print_json(&status);
            }
            println!("Applied: {}", display(status.applied.as_deref()));
            println!("Latest:  {}", display(status.head.as_deref()));
            if status.is_up_to_date() {
                println!("Up to date");
            } else {
                println!("Pending ({}):", status.pending.len());
                for revision in &status.pending {
                    println!("  {}", revision);
                }
            }
        }
    }

    Ok(())
}
