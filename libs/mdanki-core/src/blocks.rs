//! Line-oriented walker over the `## Flashcards` section.
//!
//! # Format
//! ```markdown
//! ## Flashcards
//!
//! <!-- anki-id: 1700000000001 -->
//! Q: What is Rust?
//! A: A systems programming language.
//!
//! The {{c1::borrow checker}} enforces ownership rules.
//!
//! > Blockquotes and image-only blocks are ignored.
//! ```
//!
//! Blocks are separated by blank lines. An identity marker attaches to the
//! next block. The same walk feeds both the marker-aware parser and the
//! marker rewriter, so both sides always agree on block boundaries and on
//! which blocks count as cards.

use crate::types::{Card, NoteId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Heading that opens the flashcards section.
pub const SECTION_HEADING: &str = "## Flashcards";

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*anki-id:\s*(\d+)\s*-->$").expect("valid marker regex"));

static CLOZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{c\d+::").expect("valid cloze regex"));

static IMAGE_ONLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:!\[\[.*?\]\]|!\[[^\]\n]*\]\([^)\n]*\))$").expect("valid image regex")
});

/// Render the marker comment for an identity.
pub fn marker_line(id: NoteId) -> String {
    format!("<!-- anki-id: {} -->", id)
}

/// Whether `line` holds a marker comment and nothing else.
pub fn is_marker_line(line: &str) -> bool {
    MARKER_RE.is_match(line.trim())
}

/// Parse a marker comment line, if `line` is one with a usable identity.
pub fn parse_marker(line: &str) -> Option<NoteId> {
    MARKER_RE
        .captures(line.trim())
        .and_then(|caps| caps[1].parse::<NoteId>().ok())
}

/// Whether text contains at least one cloze span opener.
pub fn has_cloze(text: &str) -> bool {
    CLOZE_RE.is_match(text)
}

/// Byte range of the section body: from the line after the heading up to
/// the next `## ` heading or the end of the text.
pub fn locate_section(text: &str) -> Option<Range<usize>> {
    let mut offset = 0;
    let mut start = None;

    for line in text.split_inclusive('\n') {
        match start {
            None if line.trim_end() == SECTION_HEADING => start = Some(offset + line.len()),
            Some(body_start) if line.starts_with("## ") => return Some(body_start..offset),
            _ => {}
        }
        offset += line.len();
    }

    start.map(|body_start| body_start..text.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    /// `None` when the identity does not fit a note id.
    Marker(Option<NoteId>),
    Blank,
    Content,
}

fn classify_line(line: &str) -> LineKind {
    if is_marker_line(line) {
        let id = parse_marker(line);
        if id.is_none() {
            tracing::warn!("ignoring unusable identity in marker {:?}", line.trim());
        }
        LineKind::Marker(id)
    } else if line.trim().is_empty() {
        LineKind::Blank
    } else {
        LineKind::Content
    }
}

/// What a block turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Card(Card),
    /// Blockquote or image-only block.
    Ignored,
    /// Text that is neither a card nor an ignorable block.
    Unrecognized,
}

/// A run of consecutive content lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub marker: Option<NoteId>,
    /// Indices into [`SectionWalk::lines`].
    pub lines: Range<usize>,
    pub kind: BlockKind,
    /// The block was split off the previous one by a marker line rather
    /// than by a blank line.
    pub split_by_marker: bool,
}

/// Result of walking the flashcards section of a note.
#[derive(Debug)]
pub struct SectionWalk<'a> {
    /// Byte span of the section body within the full text.
    pub span: Range<usize>,
    /// Section body split on `\n`.
    pub lines: Vec<&'a str>,
    /// Indices of marker comment lines.
    pub marker_lines: Vec<usize>,
    pub blocks: Vec<Block>,
}

impl SectionWalk<'_> {
    /// Blocks that hold a card, in source order.
    pub fn cards(&self) -> impl Iterator<Item = (&Card, Option<NoteId>, &Block)> {
        self.blocks.iter().filter_map(|block| match &block.kind {
            BlockKind::Card(card) => Some((card, block.marker, block)),
            _ => None,
        })
    }
}

enum WalkState {
    BetweenBlocks,
    MarkerPending { id: Option<NoteId>, split: bool },
    InBlock {
        marker: Option<NoteId>,
        first: usize,
        split: bool,
    },
}

/// Walk the flashcards section of `text`. `None` when there is no section.
pub fn walk(text: &str) -> Option<SectionWalk<'_>> {
    let span = locate_section(text)?;
    let lines: Vec<&str> = text[span.clone()].split('\n').collect();

    let mut blocks = Vec::new();
    let mut marker_lines = Vec::new();
    let mut state = WalkState::BetweenBlocks;

    for (idx, line) in lines.iter().enumerate() {
        state = match (state, classify_line(line)) {
            (WalkState::InBlock { marker, first, split }, LineKind::Marker(id)) => {
                marker_lines.push(idx);
                blocks.push(close_block(&lines, marker, first..idx, split));
                WalkState::MarkerPending { id, split: true }
            }
            (WalkState::MarkerPending { split, .. }, LineKind::Marker(id)) => {
                marker_lines.push(idx);
                WalkState::MarkerPending { id, split }
            }
            (WalkState::BetweenBlocks, LineKind::Marker(id)) => {
                marker_lines.push(idx);
                WalkState::MarkerPending { id, split: false }
            }
            (WalkState::InBlock { marker, first, split }, LineKind::Blank) => {
                blocks.push(close_block(&lines, marker, first..idx, split));
                WalkState::BetweenBlocks
            }
            // A pending marker survives blank lines; only the split flag resets.
            (WalkState::MarkerPending { id, .. }, LineKind::Blank) => {
                WalkState::MarkerPending { id, split: false }
            }
            (WalkState::BetweenBlocks, LineKind::Blank) => WalkState::BetweenBlocks,
            (WalkState::MarkerPending { id, split }, LineKind::Content) => WalkState::InBlock {
                marker: id,
                first: idx,
                split,
            },
            (WalkState::BetweenBlocks, LineKind::Content) => WalkState::InBlock {
                marker: None,
                first: idx,
                split: false,
            },
            (in_block @ WalkState::InBlock { .. }, LineKind::Content) => in_block,
        };
    }

    // A trailing marker with no block after it is dropped.
    if let WalkState::InBlock { marker, first, split } = state {
        blocks.push(close_block(&lines, marker, first..lines.len(), split));
    }

    Some(SectionWalk {
        span,
        lines,
        marker_lines,
        blocks,
    })
}

fn close_block(lines: &[&str], marker: Option<NoteId>, range: Range<usize>, split: bool) -> Block {
    let text = lines[range.clone()]
        .iter()
        .map(|line| line.trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join("\n");
    Block {
        marker,
        lines: range,
        kind: classify_block(text.trim()),
        split_by_marker: split,
    }
}

/// Classify the trimmed text of one block.
pub fn classify_block(block: &str) -> BlockKind {
    if block.starts_with('>') || IMAGE_ONLY_RE.is_match(block) {
        return BlockKind::Ignored;
    }

    if block.starts_with("Q:") {
        return match parse_qa_block(block) {
            Some(card) => BlockKind::Card(card),
            None => BlockKind::Unrecognized,
        };
    }

    if has_cloze(block) {
        return BlockKind::Card(Card::Cloze {
            text: block.to_string(),
        });
    }

    BlockKind::Unrecognized
}

/// Split a `Q:`/`A:` block at the first line starting with `A:`.
fn parse_qa_block(block: &str) -> Option<Card> {
    let lines: Vec<&str> = block.lines().collect();
    let answer_at = lines.iter().position(|line| line.starts_with("A:"))?;

    let front = lines[..answer_at].join("\n");
    let front = front.trim();
    let front = front.strip_prefix("Q:").unwrap_or(front).trim();

    let mut back = lines[answer_at]["A:".len()..].to_string();
    for line in &lines[answer_at + 1..] {
        back.push('\n');
        back.push_str(line);
    }
    let back = back.trim();

    if front.is_empty() || back.is_empty() {
        return None;
    }

    Some(Card::Basic {
        front: front.to_string(),
        back: back.to_string(),
    })
}
