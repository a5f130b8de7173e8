//! Tab-separated export files for the remote's manual import.

use crate::error::{Error, Result};
use crate::fields::normalize;
use crate::images::{self, CopyReport};
use crate::types::{Card, ParsedNote};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// What an export produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Files written (empty in preview mode).
    pub files: Vec<PathBuf>,
    pub basic_count: usize,
    pub cloze_count: usize,
    pub images: CopyReport,
}

/// One import line for `card`, with the tags column appended when non-empty.
pub fn card_line(card: &Card, tags: &str) -> String {
    let mut line = match card {
        Card::Basic { front, back } => format!("{}\t{}", normalize(front), normalize(back)),
        Card::Cloze { text } => normalize(text),
    };
    if !tags.is_empty() {
        line.push('\t');
        line.push_str(tags);
    }
    line
}

fn render(cards: &[Card], tags: &str) -> String {
    cards
        .iter()
        .map(|card| card_line(card, tags) + "\n")
        .collect()
}

/// Copy the note's images into `media_path` and write
/// `<stem> - Basic.txt` / `<stem> - Cloze.txt` next to the note.
pub fn export_note(note: &ParsedNote, media_path: &Path, preview: bool) -> Result<ExportReport> {
    let mut report = ExportReport {
        basic_count: note.basic_cards.len(),
        cloze_count: note.cloze_cards.len(),
        ..ExportReport::default()
    };

    if note.card_count() == 0 {
        tracing::info!("no flashcards in {}, nothing to export", note.file_path.display());
        return Ok(report);
    }

    let references: BTreeSet<String> = note
        .basic_cards
        .iter()
        .chain(&note.cloze_cards)
        .flat_map(Card::texts)
        .flat_map(images::extract_from_text)
        .collect();
    tracing::debug!("{} unique image reference(s)", references.len());
    report.images = images::copy_to_media(
        &references,
        &note.file_path,
        &note.vault_root,
        media_path,
        preview,
    )?;

    let stem = note
        .file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_dir = note.file_path.parent().unwrap_or(Path::new("."));

    for (cards, suffix) in [(&note.basic_cards, "Basic"), (&note.cloze_cards, "Cloze")] {
        if cards.is_empty() {
            continue;
        }
        let path = output_dir.join(format!("{} - {}.txt", stem, suffix));

        if preview {
            tracing::info!("[preview] would write {} ({} cards)", path.display(), cards.len());
            continue;
        }

        fs::write(&path, render(cards, &note.tags)).map_err(|e| Error::io(&path, e))?;
        tracing::info!("wrote {} ({} cards)", path.display(), cards.len());
        report.files.push(path);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn note_in(dir: &Path, basic: Vec<Card>, cloze: Vec<Card>, tags: &str) -> ParsedNote {
        ParsedNote {
            file_path: dir.join("Cell Biology.md"),
            vault_root: dir.to_path_buf(),
            basic_cards: basic,
            cloze_cards: cloze,
            tags: tags.to_string(),
            deck_name: "Default".to_string(),
        }
    }

    fn basic(front: &str, back: &str) -> Card {
        Card::Basic {
            front: front.to_string(),
            back: back.to_string(),
        }
    }

    #[test]
    fn lines_with_and_without_tags() {
        assert_eq!(card_line(&basic("Q1", "A1"), ""), "Q1\tA1");
        assert_eq!(card_line(&basic("Q1", "A\nB"), "bio"), "Q1\tA<br>B\tbio");
        let cloze = Card::Cloze {
            text: "{{c1::x}} ![[a.png]]".to_string(),
        };
        assert_eq!(card_line(&cloze, "bio sci"), "{{c1::x}} <img src=\"a.png\">\tbio sci");
    }

    #[test]
    fn writes_one_file_per_kind() {
        let dir = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        let note = note_in(
            dir.path(),
            vec![basic("Q1", "A1"), basic("Q2", "A2")],
            vec![Card::Cloze {
                text: "{{c1::Water}} is wet".to_string(),
            }],
            "biology",
        );

        let report = export_note(&note, media.path(), false).unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("Cell Biology - Basic.txt")).unwrap(),
            "Q1\tA1\tbiology\nQ2\tA2\tbiology\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("Cell Biology - Cloze.txt")).unwrap(),
            "{{c1::Water}} is wet\tbiology\n"
        );
    }

    #[test]
    fn skips_missing_kind() {
        let dir = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        let note = note_in(dir.path(), vec![basic("Q", "A")], vec![], "");

        let report = export_note(&note, media.path(), false).unwrap();
        assert_eq!(report.files, vec![dir.path().join("Cell Biology - Basic.txt")]);
        assert!(!dir.path().join("Cell Biology - Cloze.txt").exists());
    }

    #[test]
    fn preview_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"png").unwrap();
        let note = note_in(dir.path(), vec![basic("Q ![[a.png]]", "A")], vec![], "");

        let report = export_note(&note, media.path(), true).unwrap();
        assert!(report.files.is_empty());
        assert_eq!(report.images.previewed, vec!["a.png"]);
        assert!(!dir.path().join("Cell Biology - Basic.txt").exists());
        assert!(!media.path().join("a.png").exists());
    }

    #[test]
    fn copies_images_into_media() {
        let dir = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"png").unwrap();
        let note = note_in(dir.path(), vec![basic("Q ![[a.png]]", "A ![[gone.png]]")], vec![], "");

        let report = export_note(&note, media.path(), false).unwrap();
        assert_eq!(report.images.copied, vec!["a.png"]);
        assert_eq!(report.images.missing, vec!["gone.png"]);
        assert!(media.path().join("a.png").is_file());
    }

    #[test]
    fn empty_note_does_nothing() {
        let dir = TempDir::new().unwrap();
        let note = note_in(dir.path(), vec![], vec![], "tag");

        let report = export_note(&note, Path::new("/nonexistent/media"), false).unwrap();
        assert!(report.files.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
