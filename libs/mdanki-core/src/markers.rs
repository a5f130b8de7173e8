//! Identity markers: reading them out of a note and writing them back.

use crate::blocks::{self, marker_line};
use crate::types::{CardWithIdentity, NoteId};
use std::collections::HashMap;

/// Re-derive the ordered cards of a note together with their markers.
///
/// Returns an empty list when the note has no flashcards section.
pub fn parse_cards_with_ids(content: &str) -> Vec<CardWithIdentity> {
    let Some(walk) = blocks::walk(content) else {
        return Vec::new();
    };

    walk.cards()
        .map(|(card, marker, _)| CardWithIdentity {
            card: card.clone(),
            marker,
        })
        .collect()
}

/// Rewrite the markers of the flashcards section.
///
/// `ids` maps a card's sequence index (as returned by
/// [`parse_cards_with_ids`]) to its identity. Every existing marker line in
/// the section is dropped and a fresh one is emitted before each card that
/// has an entry in `ids`. Text outside the section is never touched; a note
/// without a section comes back unchanged.
pub fn rewrite_markers(content: &str, ids: &HashMap<usize, NoteId>) -> String {
    let Some(walk) = blocks::walk(content) else {
        return content.to_string();
    };

    // First line of each block -> (card sequence index, split flag).
    let mut block_starts: HashMap<usize, (Option<usize>, bool)> = HashMap::new();
    let mut seq = 0;
    for block in &walk.blocks {
        let card_index = match block.kind {
            blocks::BlockKind::Card(_) => {
                seq += 1;
                Some(seq - 1)
            }
            _ => None,
        };
        block_starts.insert(block.lines.start, (card_index, block.split_by_marker));
    }

    let mut out: Vec<String> = Vec::with_capacity(walk.lines.len() + ids.len());
    let mut marker_lines = walk.marker_lines.iter().copied().peekable();

    for (idx, line) in walk.lines.iter().enumerate() {
        if marker_lines.peek() == Some(&idx) {
            marker_lines.next();
            continue;
        }

        if let Some(&(card_index, split)) = block_starts.get(&idx) {
            // Inserted lines take the line ending of the block they precede.
            let eol = if line.ends_with('\r') { "\r" } else { "" };
            match card_index.and_then(|i| ids.get(&i)) {
                Some(&id) => out.push(format!("{}{}", marker_line(id), eol)),
                // Keep the block apart from its predecessor now that the
                // marker line separating them is gone.
                None if split => out.push(eol.to_string()),
                None => {}
            }
        }

        out.push((*line).to_string());
    }

    let mut result = String::with_capacity(content.len() + ids.len() * 32);
    result.push_str(&content[..walk.span.start]);
    result.push_str(&out.join("\n"));
    result.push_str(&content[walk.span.end..]);
    result
}
