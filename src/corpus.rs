//! Notes corpus loader.
//!
//! Walks the configured notes directory and collects every eligible text
//! note into a map keyed by its POSIX-style path relative to the root.
//! Files that cannot be read or decoded as UTF-8 are logged and skipped;
//! only a missing or non-directory root stops the scan.
//!
//! A symlink to a file is read like a regular note. Symlinked directories
//! are only descended into when `follow_symlinks` is set.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Component, Path};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::NotesConfig;
use crate::error::LoaderError;
use crate::models::Document;

/// Relative path → note content, ordered by path.
pub type Corpus = BTreeMap<String, String>;

/// Scan `root` using the include/exclude rules from `notes`.
pub fn read_notes(root: &Path, notes: &NotesConfig) -> Result<Corpus, LoaderError> {
    if !root.exists() {
        return Err(LoaderError::RootMissing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(LoaderError::NotADirectory(root.to_path_buf()));
    }

    let include_set = build_globset(&notes.include_globs)?;
    let excluded: Vec<String> = notes
        .exclude_name_substrings
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let mut corpus = Corpus::new();

    let walker = WalkDir::new(root).follow_links(notes.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let is_file =
            entry.file_type().is_file() || (entry.path_is_symlink() && path.is_file());
        if !is_file {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = to_posix(relative);

        if !include_set.is_match(&rel_str) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_lowercase();
        if excluded.iter().any(|needle| name.contains(needle.as_str())) {
            debug!("excluded by name: {}", rel_str);
            continue;
        }

        let content = match std::fs::read(path).map(String::from_utf8) {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                warn!("Error reading {}: {}", path.display(), e);
                continue;
            }
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                continue;
            }
        };

        if content.is_empty() {
            continue;
        }

        corpus.insert(rel_str, content);
    }

    debug!("loaded {} notes from {}", corpus.len(), root.display());
    Ok(corpus)
}

/// Flatten a corpus into build order (sorted by path).
pub fn into_documents(corpus: Corpus) -> Vec<Document> {
    corpus
        .into_iter()
        .map(|(path, text)| Document::new(path, text))
        .collect()
}

fn to_posix(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, LoaderError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn notes_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.md"), "Emacs is an editor.").unwrap();
        tmp
    }

    #[test]
    fn test_exclusion_filters() {
        let tmp = notes_dir();
        fs::write(tmp.path().join("creds.md"), "password=hunter2").unwrap();
        fs::write(tmp.path().join("Untitled 1.md"), "scratch").unwrap();

        let corpus = read_notes(tmp.path(), &NotesConfig::default()).unwrap();
        assert_eq!(corpus.keys().collect::<Vec<_>>(), vec!["notes.md"]);
    }

    #[test]
    fn test_exclusion_is_case_insensitive() {
        let tmp = notes_dir();
        fs::write(tmp.path().join("AWS-CREDS.md"), "key").unwrap();
        let corpus = read_notes(tmp.path(), &NotesConfig::default()).unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_empty_file_skipped() {
        let tmp = notes_dir();
        fs::write(tmp.path().join("empty.md"), "").unwrap();
        let corpus = read_notes(tmp.path(), &NotesConfig::default()).unwrap();
        assert!(!corpus.contains_key("empty.md"));
        assert!(corpus.contains_key("notes.md"));
    }

    #[test]
    fn test_nested_and_alias_extension() {
        let tmp = notes_dir();
        fs::create_dir_all(tmp.path().join("deep/er")).unwrap();
        fs::write(tmp.path().join("deep/er/vim.markdown"), "Vim is modal.").unwrap();
        fs::write(tmp.path().join("deep/todo.txt"), "not a note").unwrap();

        let corpus = read_notes(tmp.path(), &NotesConfig::default()).unwrap();
        assert_eq!(
            corpus.keys().collect::<Vec<_>>(),
            vec!["deep/er/vim.markdown", "notes.md"]
        );
        assert_eq!(corpus["deep/er/vim.markdown"], "Vim is modal.");
    }

    #[test]
    fn test_invalid_utf8_skipped() {
        let tmp = notes_dir();
        fs::write(tmp.path().join("binary.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let corpus = read_notes(tmp.path(), &NotesConfig::default()).unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_directory_named_like_note_ignored() {
        let tmp = notes_dir();
        fs::create_dir_all(tmp.path().join("folder.md")).unwrap();
        let corpus = read_notes(tmp.path(), &NotesConfig::default()).unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_note_is_read() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let notes = tmp.path().join("notes");
        let elsewhere = tmp.path().join("elsewhere");
        fs::create_dir_all(&notes).unwrap();
        fs::create_dir_all(&elsewhere).unwrap();
        fs::write(tmp.path().join("real.md"), "Linked from outside.").unwrap();
        fs::write(notes.join("plain.md"), "A plain note.").unwrap();
        fs::write(elsewhere.join("hidden.md"), "Behind a directory link.").unwrap();
        symlink(tmp.path().join("real.md"), notes.join("link.md")).unwrap();
        symlink(&elsewhere, notes.join("linked_dir")).unwrap();
        symlink(tmp.path().join("gone.md"), notes.join("dangling.md")).unwrap();

        let corpus = read_notes(&notes, &NotesConfig::default()).unwrap();
        assert_eq!(corpus.keys().collect::<Vec<_>>(), vec!["link.md", "plain.md"]);
        assert_eq!(corpus["link.md"], "Linked from outside.");

        let following = NotesConfig {
            follow_symlinks: true,
            ..NotesConfig::default()
        };
        let corpus = read_notes(&notes, &following).unwrap();
        assert_eq!(
            corpus.keys().collect::<Vec<_>>(),
            vec!["link.md", "linked_dir/hidden.md", "plain.md"]
        );
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        let err = read_notes(&tmp.path().join("nope"), &NotesConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::RootMissing(_)));
    }

    #[test]
    fn test_root_is_file() {
        let tmp = notes_dir();
        let err = read_notes(&tmp.path().join("notes.md"), &NotesConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::NotADirectory(_)));
    }

    #[test]
    fn test_into_documents_is_path_ordered() {
        let mut corpus = Corpus::new();
        corpus.insert("b.md".into(), "two".into());
        corpus.insert("a.md".into(), "one".into());
        let docs = into_documents(corpus);
        assert_eq!(docs[0], Document::new("a.md", "one"));
        assert_eq!(docs[1], Document::new("b.md", "two"));
    }
}
