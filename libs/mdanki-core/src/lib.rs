//! Core library for syncing Obsidian flashcards into Anki.
//!
//! Provides:
//! - Marker-aware parser for the `## Flashcards` section of a note
//! - Marker rewriter that stamps remote identities back into the note
//! - Field mapping and comparison against remote records
//! - Sync engine over the [`RemoteDirectory`] trait
//! - Tab-separated exporter, image handling and vault discovery

pub mod blocks;
pub mod error;
pub mod export;
pub mod fields;
pub mod images;
pub mod markers;
pub mod parser;
pub mod remote;
pub mod sync;
pub mod types;
pub mod vault;

pub use error::{Error, RemoteError, Result};
pub use export::{export_note, ExportReport};
pub use fields::{card_to_fields, fields_match, normalize};
pub use markers::{parse_cards_with_ids, rewrite_markers};
pub use parser::parse_note;
pub use remote::RemoteDirectory;
pub use sync::{
    source_tag, CardAction, CardSyncDetail, SyncEngine, SyncOptions, SyncOutcome, SyncResult,
    ORPHAN_TAG,
};
pub use types::{Card, CardKind, CardWithIdentity, Fields, NoteId, ParsedNote, RemoteRecord};
pub use vault::{discover_md_files, find_vault_root};
