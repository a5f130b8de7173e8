//! Markdown samples and note factories.

use std::fs;
use std::path::{Path, PathBuf};

use mdanki_core::ParsedNote;

/// Scope tag of notes built by [`note`].
pub const SCOPE: &str = "obsidian-src::biology";

/// A note named `Biology.md` tagged `biology`, in the `Science` deck.
///
/// `sync_content` never touches the file, so the path need not exist.
pub fn note() -> ParsedNote {
    note_at(Path::new("/vault/Biology.md"))
}

pub fn note_at(path: &Path) -> ParsedNote {
    ParsedNote {
        file_path: path.to_path_buf(),
        vault_root: path.parent().unwrap_or(Path::new("/")).to_path_buf(),
        basic_cards: Vec::new(),
        cloze_cards: Vec::new(),
        tags: "biology".to_string(),
        deck_name: "Science".to_string(),
    }
}

/// Frontmatter, prose, and a flashcards section with two Q/A cards and
/// one cloze, all unmarked.
pub fn three_cards() -> String {
    "---\nsubject: Biology\ndeck: Science\n---\n\n# Biology\n\nSome prose.\n\n## Flashcards\n\nQ: What is DNA?\nA: Deoxyribonucleic acid\n\n{{c1::Mitochondria}} are the powerhouse of the cell.\n\nQ: What is RNA?\nA: Ribonucleic acid\n\n## See also\n\nMore prose.\n".to_string()
}

/// Flashcards section holding `cards` blocks separated by blank lines.
pub fn section(cards: &[&str]) -> String {
    format!("# Note\n\n## Flashcards\n\n{}\n", cards.join("\n\n"))
}

/// Write `content` to `dir/name` and return the path.
pub fn write_note(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write note fixture");
    path
}
