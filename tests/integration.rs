use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rvec_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rvec");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(files_dir.join("src")).unwrap();
    fs::write(
        files_dir.join("alpha.md"),
        "# Alpha\n\nThis crate is written in Rust.\n\nBuild it with cargo and publish crates to the registry.",
    )
    .unwrap();
    fs::write(
        files_dir.join("src").join("beta.py"),
        "def train(model, dataset):\n    for batch in dataset:\n        model.step(batch)\n",
    )
    .unwrap();
    fs::write(
        files_dir.join("src").join("gamma.js"),
        "function computeTotal(items) { return items.reduce(sum) }\n",
    )
    .unwrap();
    fs::write(files_dir.join("tiny.md"), "short").unwrap();
    fs::write(
        files_dir.join("notes.txt"),
        "Plain text notes are not collected by default.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/rvec.sqlite"

[chunking]
chunk_size = 200
chunk_overlap = 20

[retrieval]
default_k = 3

[embedding]
provider = "hashing"
dims = 256

[server]
bind = "127.0.0.1:18001"

[analyzer]
repos_dir = "{}/repos"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("rvec.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

fn run_rvec(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rvec_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RVEC_DB_PATH")
        .env_remove("RVEC_CHUNK_SIZE")
        .env_remove("RVEC_CHUNK_OVERLAP")
        .env_remove("RVEC_BIND")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rvec binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn ingest_fixture(config_path: &Path) -> String {
    let dir = files_dir(config_path);
    let (stdout, stderr, success) = run_rvec(
        config_path,
        &["ingest", dir.to_str().unwrap(), "--repo", "org/demo"],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rvec(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("rvec.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_rvec(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_rvec(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_directory() {
    let (_tmp, config_path) = setup_test_env();

    let stdout = ingest_fixture(&config_path);
    assert!(stdout.contains("files: 3"), "stdout={}", stdout);
    assert!(stdout.contains("namespace: org_demo"));
    assert!(stdout.contains("chunks added: 3"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_search_returns_relevant_file_first() {
    let (_tmp, config_path) = setup_test_env();
    ingest_fixture(&config_path);

    let (stdout, stderr, success) = run_rvec(
        &config_path,
        &["search", "org/demo", "compute a total by summing items", "--k", "2"],
    );
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);

    let first = stdout.lines().find(|l| l.starts_with("1.")).unwrap();
    assert!(first.contains("src/gamma.js"), "stdout={}", stdout);
    let ranks = stdout
        .lines()
        .filter(|l| l.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .count();
    assert_eq!(ranks, 2, "stdout={}", stdout);
}

#[test]
fn test_search_unknown_repo_is_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_rvec(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_rvec(&config_path, &["search", "unseen-repo", "anything"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_empty_query_fails() {
    let (_tmp, config_path) = setup_test_env();
    ingest_fixture(&config_path);

    let (_, stderr, success) = run_rvec(&config_path, &["search", "org/demo", "   "]);
    assert!(!success);
    assert!(stderr.contains("query must not be empty"), "stderr={}", stderr);
}

#[test]
fn test_reingest_appends_records() {
    let (_tmp, config_path) = setup_test_env();
    ingest_fixture(&config_path);
    ingest_fixture(&config_path);

    let (stdout, _, success) = run_rvec(&config_path, &["namespaces"]);
    assert!(success);
    let line = stdout.lines().find(|l| l.starts_with("org_demo")).unwrap();
    assert!(line.trim_end().ends_with(" 6"), "line={}", line);
}

#[test]
fn test_namespaces_are_isolated() {
    let (tmp, config_path) = setup_test_env();
    ingest_fixture(&config_path);

    let other = tmp.path().join("other");
    fs::create_dir_all(&other).unwrap();
    fs::write(
        other.join("README.md"),
        "Completely unrelated deployment notes for another team.",
    )
    .unwrap();
    let (_, stderr, success) = run_rvec(
        &config_path,
        &["ingest", other.to_str().unwrap(), "--repo", "other-team"],
    );
    assert!(success, "stderr={}", stderr);

    let (stdout, _, success) = run_rvec(
        &config_path,
        &["search", "other-team", "computeTotal items reduce", "--k", "10"],
    );
    assert!(success);
    assert!(stdout.contains("README.md"));
    assert!(!stdout.contains("gamma.js"));

    let (stdout, _, _) = run_rvec(&config_path, &["namespaces"]);
    assert!(stdout.contains("org_demo"));
    assert!(stdout.contains("other-team"));
}

#[test]
fn test_ingest_empty_directory_reports_no_chunks() {
    let (tmp, config_path) = setup_test_env();
    let empty = tmp.path().join("empty");
    fs::create_dir_all(&empty).unwrap();

    let (stdout, stderr, success) = run_rvec(
        &config_path,
        &["ingest", empty.to_str().unwrap(), "--repo", "ghost"],
    );
    assert!(success, "stderr={}", stderr);
    assert!(stdout.contains("no chunks"));

    let (stdout, _, _) = run_rvec(&config_path, &["namespaces"]);
    assert!(stdout.contains("No namespaces."));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(
        &config_path,
        content.replace("chunk_overlap = 20", "chunk_overlap = 500"),
    )
    .unwrap();

    let (_, stderr, success) = run_rvec(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("chunk_overlap"), "stderr={}", stderr);
}
