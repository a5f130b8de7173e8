//! Core types shared by the parser, the exporter and the sync engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Identity of a note in the remote collection.
pub type NoteId = i64;

/// Flat field mapping of a remote note (field name -> value).
pub type Fields = BTreeMap<String, String>;

/// Card variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Basic,
    Cloze,
}

impl CardKind {
    /// Name of the remote note type used for this kind.
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Cloze => "Cloze",
        }
    }
}

/// A flashcard extracted from a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Card {
    /// Question on the front, answer on the back.
    Basic { front: String, back: String },
    /// Fill-in-the-blank text with one or more `{{cN::...}}` spans.
    Cloze { text: String },
}

impl Card {
    pub fn kind(&self) -> CardKind {
        match self {
            Self::Basic { .. } => CardKind::Basic,
            Self::Cloze { .. } => CardKind::Cloze,
        }
    }

    /// All text bodies of the card, in field order.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::Basic { front, back } => vec![front.as_str(), back.as_str()],
            Self::Cloze { text } => vec![text.as_str()],
        }
    }

    /// Short display text: the front (or cloze text), cut at 60 chars.
    pub fn summary(&self) -> String {
        let text = match self {
            Self::Basic { front, .. } => front,
            Self::Cloze { text } => text,
        };
        match text.char_indices().nth(60) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.clone(),
        }
    }
}

/// A card paired with the identity marker found before it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardWithIdentity {
    pub card: Card,
    pub marker: Option<NoteId>,
}

/// Snapshot of a note as stored in the remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: NoteId,
    pub model_name: String,
    pub tags: Vec<String>,
    pub fields: Fields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// A markdown note after front-end parsing.
#[derive(Debug, Clone)]
pub struct ParsedNote {
    pub file_path: PathBuf,
    pub vault_root: PathBuf,
    pub basic_cards: Vec<Card>,
    pub cloze_cards: Vec<Card>,
    /// Space separated note-level tags.
    pub tags: String,
    pub deck_name: String,
}

impl ParsedNote {
    /// Note-level tags as a list.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags.split_whitespace().map(str::to_string).collect()
    }

    pub fn card_count(&self) -> usize {
        self.basic_cards.len() + self.cloze_cards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_truncates_long_front() {
        let card = Card::Basic {
            front: "x".repeat(80),
            back: "A".to_string(),
        };
        assert_eq!(card.summary(), format!("{}...", "x".repeat(60)));
    }

    #[test]
    fn summary_keeps_short_text() {
        let card = Card::Cloze {
            text: "{{c1::Water}} is wet".to_string(),
        };
        assert_eq!(card.summary(), "{{c1::Water}} is wet");
    }

    #[test]
    fn model_names() {
        assert_eq!(CardKind::Basic.model_name(), "Basic");
        assert_eq!(CardKind::Cloze.model_name(), "Cloze");
    }

    #[test]
    fn tag_list_splits_on_whitespace() {
        let note = ParsedNote {
            file_path: PathBuf::from("a.md"),
            vault_root: PathBuf::from("."),
            basic_cards: vec![],
            cloze_cards: vec![],
            tags: "biology  science".to_string(),
            deck_name: "Default".to_string(),
        };
        assert_eq!(note.tag_list(), vec!["biology", "science"]);
    }
}
