//! Mapping cards to the remote's flat field representation.

use crate::images;
use crate::types::{Card, Fields, RemoteRecord};

/// Convert card text to remote field markup: image syntax becomes
/// `<img>` tags and line breaks become `<br>`.
///
/// Idempotent: the output holds no image syntax and no newlines.
pub fn normalize(text: &str) -> String {
    images::to_anki_syntax(text)
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// Field mapping used both to create notes and to compare against them.
pub fn card_to_fields(card: &Card) -> Fields {
    let mut fields = Fields::new();
    match card {
        Card::Basic { front, back } => {
            fields.insert("Front".to_string(), normalize(front));
            fields.insert("Back".to_string(), normalize(back));
        }
        Card::Cloze { text } => {
            fields.insert("Text".to_string(), normalize(text));
        }
    }
    fields
}

/// Whether every mapped field equals the remote value for the same key.
/// A key missing on the remote side is a mismatch.
pub fn fields_match(expected: &Fields, record: &RemoteRecord) -> bool {
    expected
        .iter()
        .all(|(key, value)| record.fields.get(key) == Some(value))
}
