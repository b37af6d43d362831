//! Filesystem connector: turns a directory tree into [`FileRecord`]s.
//!
//! Walks `root`, keeps files whose extension is in
//! `analyzer.extensions`, skips `.git`, `target`, `node_modules` and any
//! `analyzer.exclude_globs`, and drops trivially short files. Paths are
//! relative to `root` and the output is sorted by path.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use repo_vectorizer_core::models::FileRecord;

use crate::config::AnalyzerConfig;

pub fn scan_directory(root: &Path, config: &AnalyzerConfig) -> Result<Vec<FileRecord>> {
    if !root.is_dir() {
        bail!("Directory does not exist: {}", root.display());
    }

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        ".git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let suffixes: Vec<String> = config
        .extensions
        .iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('.').to_lowercase()))
        .collect();

    let mut records = Vec::new();
    let mut skipped_short = 0usize;

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_lowercase();
        if !suffixes.iter().any(|s| file_name.ends_with(s.as_str())) {
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes).into_owned();

        if content.trim().chars().count() <= config.min_content_chars {
            skipped_short += 1;
            continue;
        }

        records.push(FileRecord::new(rel_str, content));
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::debug!(
        root = %root.display(),
        files = records.len(),
        skipped_short,
        "scanned directory"
    );
    Ok(records)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
