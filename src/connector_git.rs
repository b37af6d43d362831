//! Git connector: clone or update a repository, collect its files, ingest them.
//!
//! Workflow for [`analyze_repository`]:
//! 1. Derive the repository name from the URL.
//! 2. Clone into `<repos_dir>/<name>` (shallow if configured), or fetch and
//!    hard-reset an existing checkout. If updating fails, clone again into a
//!    fresh sibling directory.
//! 3. Scan the checkout with the filesystem connector.
//! 4. Ingest the files under the repository name.
//!
//! Git is driven through the `git` binary on blocking threads.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use repo_vectorizer_core::models::IngestResult;

use crate::config::AnalyzerConfig;
use crate::connector_fs::scan_directory;
use crate::engine::RetrievalEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzeStatus {
    Ok,
    NoFilesFound,
}

/// Result of analyzing one repository.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeOutcome {
    pub status: AnalyzeStatus,
    pub repo: String,
    pub files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestResult>,
}

/// Last path segment of `url` without a trailing `.git`.
///
/// Handles `https://host/org/repo.git`, `git@host:org/repo.git`, and local
/// paths.
pub fn repo_name_from_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(|c| c == '/' || c == ':' || c == '\\')
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        bail!("Cannot derive a repository name from URL: '{}'", url);
    }
    Ok(name.to_string())
}

/// Make an up-to-date checkout of `url` and return its path.
pub fn checkout(url: &str, config: &AnalyzerConfig) -> Result<PathBuf> {
    let name = repo_name_from_url(url)?;
    std::fs::create_dir_all(&config.repos_dir).with_context(|| {
        format!(
            "Failed to create repos directory: {}",
            config.repos_dir.display()
        )
    })?;
    let dest = config.repos_dir.join(&name);

    if !dest.join(".git").exists() {
        git_clone(url, config.branch.as_deref(), config.shallow, &dest)?;
        return Ok(dest);
    }

    match git_pull(&dest, config.branch.as_deref()) {
        Ok(()) => Ok(dest),
        Err(e) => {
            let fresh = config
                .repos_dir
                .join(format!("{}-{}", name, chrono::Utc::now().timestamp_millis()));
            tracing::warn!(
                repo = %name,
                error = %e,
                dest = %fresh.display(),
                "updating checkout failed, cloning again"
            );
            git_clone(url, config.branch.as_deref(), config.shallow, &fresh)?;
            Ok(fresh)
        }
    }
}

/// Clone or update `url`, collect its files, and ingest them under the
/// repository name.
pub async fn analyze_repository(
    engine: &RetrievalEngine,
    url: &str,
    config: &AnalyzerConfig,
) -> Result<AnalyzeOutcome> {
    let repo = repo_name_from_url(url)?;

    let url_owned = url.to_string();
    let config_owned = config.clone();
    let files = tokio::task::spawn_blocking(move || -> Result<_> {
        let path = checkout(&url_owned, &config_owned)?;
        scan_directory(&path, &config_owned)
    })
    .await
    .context("repository checkout task failed")??;

    if files.is_empty() {
        tracing::info!(repo = %repo, "no files found");
        return Ok(AnalyzeOutcome {
            status: AnalyzeStatus::NoFilesFound,
            repo,
            files: 0,
            ingest: None,
        });
    }

    let ingest = engine.ingest(&repo, &files).await?;
    Ok(AnalyzeOutcome {
        status: AnalyzeStatus::Ok,
        repo,
        files: files.len(),
        ingest: Some(ingest),
    })
}

fn git_clone(url: &str, branch: Option<&str>, shallow: bool, dest: &Path) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.arg("clone");
    if let Some(branch) = branch {
        cmd.args(["--branch", branch, "--single-branch"]);
    }
    if shallow {
        cmd.args(["--depth", "1"]);
    }
    cmd.arg(url);
    cmd.arg(dest);

    let output = cmd
        .output()
        .with_context(|| "Failed to execute 'git clone'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(())
}

fn git_pull(repo_dir: &Path, branch: Option<&str>) -> Result<()> {
    let output = Command::new("git")
        .args(["fetch", "origin", branch.unwrap_or("HEAD")])
        .current_dir(repo_dir)
        .output()
        .with_context(|| "Failed to execute 'git fetch'")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git fetch failed: {}", stderr.trim());
    }

    let output = Command::new("git")
        .args(["reset", "--hard", "FETCH_HEAD"])
        .current_dir(repo_dir)
        .output()
        .with_context(|| "Failed to execute 'git reset'")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git reset failed: {}", stderr.trim());
    }

    Ok(())
}
