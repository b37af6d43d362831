//! `rvec search` and `rvec namespaces`.

use anyhow::Result;

use crate::config::Config;
use crate::engine::open_engine;

/// Print the `k` nearest chunks for `query` in `repo`.
///
/// Document previews are cut to the first line, 120 characters at most.
pub async fn run_search(config: &Config, repo: &str, query: &str, k: Option<usize>) -> Result<()> {
    let engine = open_engine(config).await?;
    let results = engine.search(repo, query, k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} #{}",
            i + 1,
            result.distance,
            result.metadata.path,
            result.metadata.chunk_index
        );
        println!("    {}", preview(&result.document, 120));
        println!();
    }

    Ok(())
}

pub async fn run_namespaces(config: &Config) -> Result<()> {
    let engine = open_engine(config).await?;
    let namespaces = engine.list_namespaces().await?;

    if namespaces.is_empty() {
        println!("No namespaces.");
        return Ok(());
    }

    println!("{:<40} {:>10}", "NAMESPACE", "RECORDS");
    for ns in namespaces {
        println!("{:<40} {:>10}", ns.name, ns.records);
    }
    Ok(())
}

fn preview(document: &str, max_chars: usize) -> String {
    let first_line = document
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim();
    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
