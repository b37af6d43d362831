//! `rvec ingest` and `rvec analyze`.

use anyhow::Result;
use std::path::Path;

use repo_vectorizer_core::models::{IngestResult, IngestStatus};

use crate::config::Config;
use crate::connector_fs::scan_directory;
use crate::connector_git::{analyze_repository, AnalyzeStatus};
use crate::engine::open_engine;

/// Scan `dir` and ingest every qualifying file under `repo`.
pub async fn run_ingest(config: &Config, dir: &Path, repo: &str) -> Result<()> {
    let files = scan_directory(dir, &config.analyzer)?;
    let engine = open_engine(config).await?;
    let result = engine.ingest(repo, &files).await?;

    println!("ingest {}", dir.display());
    println!("  files: {}", files.len());
    print_result(&result);
    Ok(())
}

/// Clone or update `url`, then ingest it under its repository name.
pub async fn run_analyze(config: &Config, url: &str) -> Result<()> {
    let engine = open_engine(config).await?;
    let outcome = analyze_repository(&engine, url, &config.analyzer).await?;

    println!("analyze {}", url);
    println!("  repo: {}", outcome.repo);
    match (outcome.status, outcome.ingest) {
        (AnalyzeStatus::Ok, Some(result)) => {
            println!("  files: {}", outcome.files);
            print_result(&result);
        }
        _ => println!("  no files found"),
    }
    Ok(())
}

fn print_result(result: &IngestResult) {
    println!("  namespace: {}", result.namespace);
    match result.status {
        IngestStatus::Success => println!("  chunks added: {}", result.chunks_added),
        IngestStatus::NoChunks => println!("  no chunks"),
    }
    println!("ok");
}
