//! # Lookbook CLI
//!
//! Operator interface for the Lookbook backend.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lookbook init` | Create the SQLite database and schema |
//! | `lookbook serve` | Start the HTTP API server |
//! | `lookbook index` | Re-index people and projects from the content store |
//! | `lookbook search "<query>"` | Query the local index from the terminal |
//!
//! ## Examples
//!
//! ```bash
//! lookbook --config ./config/lookbook.toml init
//! lookbook --config ./config/lookbook.toml index
//! lookbook --config ./config/lookbook.toml search "machine learning" --skills Python
//! lookbook --config ./config/lookbook.toml serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lookbook::{config, content, db, index_job, migrate, search, server, taxonomy};

/// Lookbook — directory backend with an embedding-backed search index.
#[derive(Parser)]
#[command(
    name = "lookbook",
    about = "Directory backend for browsing people and projects",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lookbook.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the two index tables, and the
    /// event log. Idempotent — running it multiple times is safe.
    Init,

    /// Start the HTTP API server.
    Serve,

    /// Re-index all people and projects.
    ///
    /// Fetches every record from the content store, embeds the changed
    /// ones, upserts rows by slug, and removes rows for records that no
    /// longer exist. Requires an enabled embedding provider.
    Index,

    /// Search the local index from the terminal.
    ///
    /// Only the first word of the query is matched (token prefix), same
    /// as the HTTP endpoint.
    Search {
        /// The search query string.
        query: String,

        /// Comma-separated skills; every one must be present.
        #[arg(long)]
        skills: Option<String>,

        /// Comma-separated sectors (projects only).
        #[arg(long)]
        sectors: Option<String>,

        /// Restrict to people or projects.
        #[arg(long, default_value = "both")]
        kind: String,

        /// Maximum results per side.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lookbook=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::ensure_schema(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Index => {
            let pool = db::connect(&cfg).await?;
            let client = content::ContentClient::new(&cfg.content)?;
            let report = index_job::run_index(&cfg, &pool, &client).await?;
            pool.close().await;
            println!("index");
            println!("  people: {}", report.people);
            println!("  projects: {}", report.projects);
            println!("  embedded: {}", report.embedded);
            println!("  skipped (unchanged): {}", report.skipped);
            println!("  removed (stale): {}", report.removed);
            println!("ok");
        }
        Commands::Search {
            query,
            skills,
            sectors,
            kind,
            limit,
        } => {
            let pool = db::connect(&cfg).await?;
            let request = search::SearchRequest {
                query,
                skills: taxonomy::comma_list(skills.as_deref()),
                sectors: taxonomy::comma_list(sectors.as_deref()),
                open_to_work: None,
                kind: search::SearchKind::parse(Some(&kind))?,
                limit: search::clamp_limit(limit),
            };
            let results = search::run_search(&pool, &request).await?;
            pool.close().await;

            if results.people.is_empty() && results.projects.is_empty() {
                println!("No results.");
                return Ok(());
            }

            for person in &results.people {
                let title = person.title.as_deref().unwrap_or("(no title)");
                println!("person  {} — {}", person.slug, title);
                if !person.skills.is_empty() {
                    println!("        skills: {}", person.skills.join(", "));
                }
            }
            for project in &results.projects {
                println!("project {} — {}", project.slug, project.title);
                if let Some(ref summary) = project.summary {
                    println!("        {}", summary);
                }
            }
        }
    }

    Ok(())
}
