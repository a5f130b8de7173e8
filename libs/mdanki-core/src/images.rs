//! Image references in card text.
//!
//! Handles wiki embeds (`![[diagram.png]]`) and markdown images
//! (`![alt](img/diagram.png)`): finding them, rewriting them to
//! `<img src="diagram.png">`, and copying the files into the remote's
//! media directory.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &str = "(?:png|jpg|jpeg|gif|bmp|svg|webp)";

static WIKI_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)!\[\[([^\]]+\.{})\]\]", IMAGE_EXTENSIONS)).expect("valid wiki image regex")
});

static MARKDOWN_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)!\[[^\]]*\]\(([^)]+\.{})\)", IMAGE_EXTENSIONS))
        .expect("valid markdown image regex")
});

/// All image references in `text`, wiki embeds first.
pub fn extract_from_text(text: &str) -> Vec<String> {
    WIKI_IMAGE_RE
        .captures_iter(text)
        .chain(MARKDOWN_IMAGE_RE.captures_iter(text))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replace image syntax with `<img src="basename">`.
pub fn to_anki_syntax(text: &str) -> String {
    let text = WIKI_IMAGE_RE.replace_all(text, img_tag);
    MARKDOWN_IMAGE_RE.replace_all(&text, img_tag).into_owned()
}

fn img_tag(caps: &Captures) -> String {
    format!("<img src=\"{}\">", base_name(&caps[1]))
}

fn base_name(reference: &str) -> &str {
    reference.rsplit(['/', '\\']).next().unwrap_or(reference)
}

/// Resolve an image reference to a file on disk.
///
/// Looks next to the note, then under the vault root, then searches the
/// whole vault by file name (skipping hidden directories).
pub fn resolve_path(reference: &str, note_path: &Path, vault_root: &Path) -> Option<PathBuf> {
    if let Some(note_dir) = note_path.parent() {
        let candidate = note_dir.join(reference);
        if candidate.is_file() {
            tracing::debug!("resolved '{}' relative to note: {}", reference, candidate.display());
            return Some(candidate);
        }
    }

    let candidate = vault_root.join(reference);
    if candidate.is_file() {
        tracing::debug!("resolved '{}' relative to vault: {}", reference, candidate.display());
        return Some(candidate);
    }

    let found = find_by_name(vault_root, base_name(reference));
    match &found {
        Some(path) => tracing::debug!("resolved '{}' by vault search: {}", reference, path.display()),
        None => tracing::warn!("could not resolve image '{}' in vault", reference),
    }
    found
}

fn find_by_name(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut subdirs = Vec::new();
    for path in entries {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if path.is_dir() {
            if !name.starts_with('.') {
                subdirs.push(path);
            }
        } else if name == file_name {
            return Some(path);
        }
    }

    subdirs.iter().find_map(|sub| find_by_name(sub, file_name))
}

/// Outcome of copying images into the media directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CopyReport {
    pub copied: Vec<String>,
    /// Images that would have been copied in preview mode.
    pub previewed: Vec<String>,
    pub missing: Vec<String>,
}

/// Copy referenced images into `media_dir`.
pub fn copy_to_media(
    references: &BTreeSet<String>,
    note_path: &Path,
    vault_root: &Path,
    media_dir: &Path,
    preview: bool,
) -> Result<CopyReport> {
    let mut report = CopyReport::default();

    for reference in references {
        let Some(source) = resolve_path(reference, note_path, vault_root) else {
            report.missing.push(reference.clone());
            continue;
        };
        let name = base_name(reference).to_string();

        if preview {
            tracing::info!("[preview] would copy {} -> {}", source.display(), media_dir.display());
            report.previewed.push(name);
            continue;
        }

        let dest = media_dir.join(&name);
        fs::copy(&source, &dest).map_err(|e| Error::io(&dest, e))?;
        tracing::info!("copied {} -> {}", source.display(), dest.display());
        report.copied.push(name);
    }

    Ok(report)
}
