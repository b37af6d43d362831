//! # Repo Vectorizer CLI (`rvec`)
//!
//! ## Usage
//!
//! ```bash
//! rvec --config ./config/rvec.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rvec init` | Create the SQLite index and run schema migrations |
//! | `rvec ingest <dir> --repo <id>` | Chunk, embed, and index a local directory |
//! | `rvec analyze <url>` | Clone or update a git repository and index it |
//! | `rvec search <repo> "<query>"` | Nearest chunks within one repository |
//! | `rvec namespaces` | List indexed repositories |
//! | `rvec serve` | Start the HTTP server |
//!
//! Logs go to stderr and are filtered by `RUST_LOG`
//! (default `repo_vectorizer=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use repo_vectorizer::{config, ingest, migrate, search, server};

/// Repo Vectorizer: semantic search over source repositories.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rvec.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rvec",
    about = "Chunk, embed, and semantically search source repositories",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rvec.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Index every qualifying file under a local directory.
    Ingest {
        /// Directory to scan.
        dir: PathBuf,

        /// Repository identifier; sanitized into the namespace name.
        #[arg(long)]
        repo: String,
    },

    /// Clone (or update) a git repository and index it under its name.
    Analyze {
        /// Repository URL, e.g. `https://github.com/org/repo.git`.
        url: String,
    },

    /// Search one repository's index.
    Search {
        /// Repository identifier used at ingest time.
        repo: String,

        /// Natural-language or code query.
        query: String,

        /// Number of results (default: `retrieval.default_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// List namespaces and their record counts.
    Namespaces,

    /// Start the HTTP server on `server.bind`.
    Serve,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("repo_vectorizer=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { dir, repo } => {
            ingest::run_ingest(&cfg, &dir, &repo).await?;
        }
        Commands::Analyze { url } => {
            ingest::run_analyze(&cfg, &url).await?;
        }
        Commands::Search { repo, query, k } => {
            search::run_search(&cfg, &repo, &query, k).await?;
        }
        Commands::Namespaces => {
            search::run_namespaces(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
