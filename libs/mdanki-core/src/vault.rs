//! Vault layout: locating the vault root and collecting notes.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directories never searched for notes.
pub const SKIPPED_DIRS: &[&str] = &[".obsidian", ".trash", ".git", "Scripts", "Templates"];

/// Nearest ancestor of `note_path` holding a `.obsidian` directory, or the
/// note's own directory when there is none.
pub fn find_vault_root(note_path: &Path) -> PathBuf {
    let note_dir = note_path.parent().unwrap_or(Path::new(".")).to_path_buf();

    for dir in note_dir.ancestors() {
        if dir.join(".obsidian").is_dir() {
            tracing::debug!("vault root: {}", dir.display());
            return dir.to_path_buf();
        }
    }

    tracing::debug!("no .obsidian folder found, using {}", note_dir.display());
    note_dir
}

fn is_skipped(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |name| name.starts_with('.') || SKIPPED_DIRS.contains(&name))
}

/// Markdown files under `folder`, sorted by path.
pub fn discover_md_files(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_md_files(folder, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_md_files(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();

        if path.is_dir() {
            if recursive && !is_skipped(&path) {
                collect_md_files(&path, recursive, files)?;
            }
        } else if path.extension().map_or(false, |ext| ext == "md") {
            files.push(path);
        }
    }
    Ok(())
}
