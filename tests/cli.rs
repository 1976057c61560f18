use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn recall_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("recall");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let notes_dir = root.join("notes");
    fs::create_dir_all(notes_dir.join("tools")).unwrap();
    fs::write(
        notes_dir.join("tools/emacs.md"),
        "# Emacs\n\nEmacs is an extensible editor configured in Lisp.",
    )
    .unwrap();
    fs::write(
        notes_dir.join("shell.md"),
        "# Shell\n\nMy login shell is zsh.",
    )
    .unwrap();
    fs::write(
        notes_dir.join("deploy.markdown"),
        "Deployments run through Kubernetes and Docker.",
    )
    .unwrap();
    fs::write(notes_dir.join("creds.md"), "secret").unwrap();

    let config_content = format!(
        r#"[notes]
root = "{root}/notes"

[index]
path = "{root}/data/notes_index"

[memory]
history_path = "{root}/data/history.json"
index_path = "{root}/data/memory_index"

[retrieval]
notes_k = 1
memory_k = 2
"#,
        root = root.display()
    );

    let config_path = config_dir.join("recall.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_recall(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = recall_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("MD_FILES")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run recall binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_index_builds_then_loads() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_recall(&config_path, &["index"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("(built)"));
    assert!(stdout.contains("documents: 3"));
    assert!(tmp.path().join("data/notes_index/meta.json").exists());

    let (stdout, _, success) = run_recall(&config_path, &["index"]);
    assert!(success);
    assert!(stdout.contains("(loaded)"));
}

#[test]
fn test_index_refresh_sees_new_notes() {
    let (tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["index"]);

    fs::write(tmp.path().join("notes/vim.md"), "Vim is modal.").unwrap();
    let (stdout, _, success) = run_recall(&config_path, &["index", "--refresh"]);
    assert!(success);
    assert!(stdout.contains("documents: 4"));
}

#[test]
fn test_search_ranks_relevant_note() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_recall(&config_path, &["search", "login shell"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.starts_with("1. ["));
    assert!(stdout.contains("shell.md"));
    assert!(!stdout.contains("2. ["));
}

#[test]
fn test_search_k_flag() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_recall(&config_path, &["search", "editor", "--k", "10"]);
    assert!(success);
    assert!(stdout.contains("3. ["));
    assert!(!stdout.contains("4. ["));
}

#[test]
fn test_missing_notes_dir_fails() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_dir_all(tmp.path().join("notes")).unwrap();

    let (_, stderr, success) = run_recall(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"), "stderr={}", stderr);
}

#[test]
fn test_memory_add_search_recent_clear() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) =
        run_recall(&config_path, &["memory", "add", "What is X?", "X is Y."]);
    assert!(success);
    assert!(stdout.contains("recorded exchange #1"));
    run_recall(&config_path, &["memory", "add", "Which shell?", "zsh"]);

    let (stdout, _, success) = run_recall(&config_path, &["memory", "search", "X", "--k", "1"]);
    assert!(success);
    assert!(stdout.contains("Q: What is X?\nA: X is Y."));

    let (stdout, _, _) = run_recall(&config_path, &["memory", "recent", "--n", "1"]);
    assert!(stdout.contains("Q: Which shell?\nA: zsh"));
    assert!(!stdout.contains("What is X?"));

    let (stdout, _, success) = run_recall(&config_path, &["memory", "clear"]);
    assert!(success);
    assert!(stdout.contains("memory cleared"));
    assert!(!tmp.path().join("data/memory_index").exists());

    let (stdout, _, _) = run_recall(&config_path, &["memory", "search", "X"]);
    assert!(stdout.contains("No memory."));
}

#[test]
fn test_context_combines_notes_and_memory() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(
        &config_path,
        &["memory", "add", "How do I configure emacs?", "Edit init.el."],
    );

    let (stdout, stderr, success) = run_recall(&config_path, &["context", "emacs configuration"]);
    assert!(success, "context failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("## Notes"));
    assert!(stdout.contains("Emacs is an extensible editor"));
    assert!(stdout.contains("## Conversation memory"));
    assert!(stdout.contains("Edit init.el."));
}

#[test]
fn test_stats_reports_counts() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["index"]);
    run_recall(&config_path, &["memory", "add", "q", "a"]);

    let (stdout, _, success) = run_recall(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("3 documents"));
    assert!(stdout.contains("1 exchanges"));
}
