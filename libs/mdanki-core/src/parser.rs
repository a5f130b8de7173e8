//! Note front end: reads a markdown note and extracts its metadata and cards.
//!
//! # Format
//! ```markdown
//! ---
//! subject: Biology
//! deck: Science
//! ---
//!
//! # Biology Notes
//!
//! ## Flashcards
//!
//! Q: What is DNA?
//! A: Deoxyribonucleic acid
//!
//! {{c1::Mitochondria}} are the powerhouse of the cell.
//! ```

use crate::blocks;
use crate::error::{Error, Result};
use crate::types::{Card, ParsedNote};
use crate::vault::find_vault_root;
use std::fs;
use std::path::Path;

/// Deck used when the frontmatter names none.
pub const DEFAULT_DECK: &str = "Default";

/// Read and parse a note.
pub fn parse_note(path: impl AsRef<Path>) -> Result<ParsedNote> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::NoteNotFound(path.to_path_buf()));
    }

    let file_path = dunce::canonicalize(path).map_err(|e| Error::io(path, e))?;
    let vault_root = find_vault_root(&file_path);
    let content = fs::read_to_string(&file_path).map_err(|e| Error::io(&file_path, e))?;
    tracing::debug!("read {} ({} bytes)", file_path.display(), content.len());

    let tags = extract_tags(&content);
    let deck_name = extract_deck_name(&content);
    let (basic_cards, cloze_cards) = parse_flashcards(&content);

    Ok(ParsedNote {
        file_path,
        vault_root,
        basic_cards,
        cloze_cards,
        tags,
        deck_name,
    })
}

/// Lines between an opening `---` line and the closing `---` line.
fn frontmatter(content: &str) -> Option<Vec<&str>> {
    let mut lines = content.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let mut body = Vec::new();
    for line in lines {
        if line.trim_end() == "---" {
            return Some(body);
        }
        body.push(line);
    }
    None
}

fn frontmatter_value<'a>(lines: &[&'a str], key: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let rest = line.strip_prefix(key)?.strip_prefix(':')?;
        Some(rest.trim())
    })
}

fn to_tag(value: &str) -> String {
    value.trim().to_lowercase().replace(' ', "-")
}

/// Note-level tags from the `subject` and `deck` frontmatter fields.
///
/// Lowercased, spaces turned into hyphens, `default` and duplicates
/// dropped, joined with single spaces.
pub fn extract_tags(content: &str) -> String {
    let Some(lines) = frontmatter(content) else {
        return String::new();
    };

    let mut tags: Vec<String> = Vec::new();
    for key in ["subject", "deck"] {
        let Some(value) = frontmatter_value(&lines, key) else {
            continue;
        };
        let tag = to_tag(value);
        if !tag.is_empty() && tag != "default" && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags.join(" ")
}

/// Deck name from the `deck` frontmatter field, case preserved.
pub fn extract_deck_name(content: &str) -> String {
    frontmatter(content)
        .and_then(|lines| frontmatter_value(&lines, "deck").map(str::to_string))
        .filter(|deck| !deck.is_empty())
        .unwrap_or_else(|| DEFAULT_DECK.to_string())
}

/// Basic and cloze cards of the flashcards section, each in source order.
pub fn parse_flashcards(content: &str) -> (Vec<Card>, Vec<Card>) {
    let Some(walk) = blocks::walk(content) else {
        tracing::debug!("no {} section", blocks::SECTION_HEADING);
        return (Vec::new(), Vec::new());
    };

    let (basic, cloze): (Vec<Card>, Vec<Card>) = walk
        .cards()
        .map(|(card, _, _)| card.clone())
        .partition(|card| matches!(card, Card::Basic { .. }));

    tracing::debug!("parsed {} basic, {} cloze", basic.len(), cloze.len());
    (basic, cloze)
}
