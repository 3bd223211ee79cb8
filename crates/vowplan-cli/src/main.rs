mod config;
mod generate_cmd;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use vowplan_core::pipeline::GenerationPipeline;
use vowplan_core::store::PgDocumentStore;
use vowplan_db::config::DbConfig;
use vowplan_db::pool;

use config::VowplanConfig;

#[derive(Parser)]
#[command(name = "vowplan", about = "Preliminary wedding-plan generation service")]
struct Cli {
    /// Database URL (overrides VOWPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a vowplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/vowplan")]
        db_url: String,
        /// Plan-generation service endpoint
        #[arg(long)]
        generation_url: Option<String>,
        /// Todo-generation service endpoint
        #[arg(long)]
        todo_url: Option<String>,
        /// Places directory API key (enables vendor enrichment)
        #[arg(long)]
        places_api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the vowplan database and apply migrations
    DbInit,
    /// Serve the plan-generation HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Generate a plan for one user from a JSON profile file
    Generate {
        /// User the plan belongs to
        #[arg(long)]
        user_id: String,
        /// Path to the wedding profile JSON
        #[arg(long)]
        input: PathBuf,
        /// Keep results in memory instead of writing to the database
        #[arg(long)]
        dry_run: bool,
    },
}

/// Execute the `vowplan init` command: write config file.
fn cmd_init(
    db_url: &str,
    generation_url: Option<String>,
    todo_url: Option<String>,
    places_api_key: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut cfg = config::ConfigFile::default();
    cfg.database.url = db_url.to_string();
    cfg.services.generation_url = generation_url;
    cfg.services.todo_url = todo_url;
    cfg.places.api_key = places_api_key;

    config::save_config(&cfg)?;

    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "(unset)".to_string());
    println!("Config written to {}", path.display());
    println!("  database.url = {}", DbConfig::new(db_url).redacted_url());
    println!("  services.generation_url = {}", show(&cfg.services.generation_url));
    println!("  services.todo_url = {}", show(&cfg.services.todo_url));
    println!(
        "  places.api_key = {}",
        if cfg.places.api_key.is_some() { "(set)" } else { "(unset)" }
    );
    println!();
    println!("Next: run `vowplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `vowplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = VowplanConfig::resolve(cli_db_url)?;

    println!("Initializing vowplan database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::collection_counts(&db_pool).await?;
    println!("Database ready. Collections:");
    for (collection, count) in &counts {
        println!("  {collection}: {count} documents");
    }

    db_pool.close().await;

    println!("vowplan db-init complete.");
    Ok(())
}

/// Execute the `vowplan serve` command.
async fn cmd_serve(cli_db_url: Option<&str>, bind: &str, port: u16) -> anyhow::Result<()> {
    let resolved = VowplanConfig::resolve(cli_db_url)?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let store = Arc::new(PgDocumentStore::new(db_pool.clone()));
    let pipeline = Arc::new(GenerationPipeline::from_settings(resolved.pipeline, store)?);

    let result = serve_cmd::run_serve(pipeline, bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            generation_url,
            todo_url,
            places_api_key,
            force,
        } => {
            cmd_init(&db_url, generation_url, todo_url, places_api_key, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(cli.database_url.as_deref(), &bind, port).await?;
        }
        Commands::Generate {
            user_id,
            input,
            dry_run,
        } => {
            let resolved = VowplanConfig::resolve(cli.database_url.as_deref())?;
            generate_cmd::run_generate(resolved, &user_id, &input, dry_run).await?;
        }
    }

    Ok(())
}
