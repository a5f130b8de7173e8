//! Sync engine: pushes the cards of one note into the remote collection.
//!
//! For every card the engine decides between create, update and leave
//! alone, then looks for orphaned remote notes scoped to the file, and
//! finally writes the identity markers back into the note.

use crate::error::{Error, Result};
use crate::fields::{card_to_fields, fields_match};
use crate::images::{self, CopyReport};
use crate::markers::{parse_cards_with_ids, rewrite_markers};
use crate::remote::RemoteDirectory;
use crate::types::{Card, CardKind, CardWithIdentity, Fields, NoteId, ParsedNote, RemoteRecord};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of the tag that scopes remote notes to their source file.
pub const SOURCE_TAG_PREFIX: &str = "obsidian-src::";

/// Tag put on orphans when they are not deleted.
pub const ORPHAN_TAG: &str = "obsidian-orphan";

/// Scope tag for a note file: lowercased stem with spaces turned into hyphens.
pub fn source_tag(file_path: &Path) -> String {
    let stem = file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    format!("{}{}", SOURCE_TAG_PREFIX, stem.replace(' ', "-"))
}

/// What happened to a card (or orphan) during a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardAction {
    New,
    Updated,
    Unchanged,
    /// Remote note no longer backed by a card in the file.
    DeletedFromSource,
    /// Card's remote note was gone; it gets recreated.
    DeletedFromRemote,
    Error,
}

/// Per-card outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSyncDetail {
    pub action: CardAction,
    /// `None` for orphans, whose content is not known locally.
    pub card_kind: Option<CardKind>,
    pub note_id: Option<NoteId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<NoteId>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Accumulated outcome of syncing one note.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub file_path: PathBuf,
    pub new_count: usize,
    pub updated_count: usize,
    pub unchanged_count: usize,
    pub deleted_from_source: usize,
    pub deleted_from_remote: usize,
    pub error_count: usize,
    pub orphans: Vec<NoteId>,
    pub details: Vec<CardSyncDetail>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<CopyReport>,
}

impl SyncResult {
    fn new(file_path: &Path) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            ..Self::default()
        }
    }

    fn push(&mut self, action: CardAction, card: &Card, note_id: Option<NoteId>) -> &mut CardSyncDetail {
        self.details.push(CardSyncDetail {
            action,
            card_kind: Some(card.kind()),
            note_id,
            previous_id: None,
            summary: card.summary(),
            error: None,
        });
        let last = self.details.len() - 1;
        &mut self.details[last]
    }
}

/// Run-time switches for a sync, injected by the caller.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Compute the outcome without touching the remote or the file.
    pub preview: bool,
    /// Delete orphans instead of tagging them.
    pub delete_orphans: bool,
    /// Media directory used when the remote cannot report one.
    pub fallback_media_path: Option<PathBuf>,
}

/// Result of [`SyncEngine::sync_content`].
#[derive(Debug)]
pub struct SyncOutcome {
    pub result: SyncResult,
    /// Rewritten note text, when it differs from the input.
    pub content: Option<String>,
}

/// Syncs notes against a [`RemoteDirectory`].
pub struct SyncEngine<'a, R: RemoteDirectory + ?Sized> {
    remote: &'a R,
    options: SyncOptions,
}

impl<'a, R: RemoteDirectory + ?Sized> SyncEngine<'a, R> {
    pub fn new(remote: &'a R, options: SyncOptions) -> Self {
        Self { remote, options }
    }

    /// Sync a note file: read it, sync its cards, write the markers back
    /// and copy referenced images.
    ///
    /// Only failing to read the note is returned as an error; everything
    /// else is recorded in the [`SyncResult`].
    pub fn sync_note(&self, note: &ParsedNote) -> Result<SyncResult> {
        let content =
            fs::read_to_string(&note.file_path).map_err(|e| Error::io(&note.file_path, e))?;

        let SyncOutcome {
            mut result,
            content: rewritten,
        } = self.sync_content(note, &content);

        if let Some(text) = rewritten {
            match fs::write(&note.file_path, text) {
                Ok(()) => tracing::info!("wrote markers to {}", note.file_path.display()),
                Err(e) => result.errors.push(format!("failed to write markers: {}", e)),
            }
        }

        if !self.options.preview {
            self.copy_images(note, &content, &mut result);
        }

        Ok(result)
    }

    /// Sync the cards found in `content`, which is the text of `note`.
    ///
    /// Performs remote calls (none in preview mode) but no file I/O.
    pub fn sync_content(&self, note: &ParsedNote, content: &str) -> SyncOutcome {
        let mut result = SyncResult::new(&note.file_path);
        let scope = source_tag(&note.file_path);
        let mut tags = note.tag_list();
        tags.push(scope.clone());

        let cards = dedup_markers(parse_cards_with_ids(content));
        tracing::info!("{}: {} card(s)", note.file_path.display(), cards.len());

        let known: Vec<NoteId> = cards.iter().filter_map(|c| c.marker).collect();
        let snapshot: HashMap<NoteId, RemoteRecord> = if known.is_empty() {
            HashMap::new()
        } else {
            match self.remote.fetch_records(&known) {
                Ok(records) => records.into_iter().map(|r| (r.id, r)).collect(),
                Err(e) => {
                    tracing::warn!("failed to fetch note info: {}", e);
                    result.errors.push(format!("failed to fetch note info: {}", e));
                    return SyncOutcome {
                        result,
                        content: None,
                    };
                }
            }
        };

        let final_ids: Vec<Option<NoteId>> = cards
            .iter()
            .map(|item| self.sync_card(item, &snapshot, &note.deck_name, &tags, &mut result))
            .collect();

        self.handle_orphans(&scope, &final_ids, &mut result);

        let content = if self.options.preview {
            None
        } else {
            let ids: HashMap<usize, NoteId> = final_ids
                .iter()
                .enumerate()
                .filter_map(|(idx, id)| id.map(|id| (idx, id)))
                .collect();
            Some(rewrite_markers(content, &ids)).filter(|text| text != content)
        };

        SyncOutcome { result, content }
    }

    fn sync_card(
        &self,
        item: &CardWithIdentity,
        snapshot: &HashMap<NoteId, RemoteRecord>,
        deck: &str,
        tags: &[String],
        result: &mut SyncResult,
    ) -> Option<NoteId> {
        let fields = card_to_fields(&item.card);

        let Some(id) = item.marker else {
            return self.create_card(&item.card, &fields, deck, tags, result);
        };

        match snapshot.get(&id) {
            Some(record) if fields_match(&fields, record) => {
                tracing::debug!("unchanged {}: {}", id, item.card.summary());
                result.unchanged_count += 1;
                result.push(CardAction::Unchanged, &item.card, Some(id));
                Some(id)
            }
            Some(_) => {
                if !self.options.preview {
                    if let Err(e) = self.remote.update(id, &fields, tags) {
                        tracing::warn!("update failed for {}: {}", id, e);
                        result.error_count += 1;
                        result.errors.push(format!("update failed for {}: {}", id, e));
                        result.push(CardAction::Error, &item.card, Some(id)).error = Some(e.to_string());
                        return Some(id);
                    }
                }
                tracing::info!("updated {}: {}", id, item.card.summary());
                result.updated_count += 1;
                result.push(CardAction::Updated, &item.card, Some(id));
                Some(id)
            }
            None => {
                tracing::info!("note {} missing from remote, recreating: {}", id, item.card.summary());
                result.deleted_from_remote += 1;
                result.push(CardAction::DeletedFromRemote, &item.card, None).previous_id = Some(id);
                self.create_card(&item.card, &fields, deck, tags, result)
            }
        }
    }

    fn create_card(
        &self,
        card: &Card,
        fields: &Fields,
        deck: &str,
        tags: &[String],
        result: &mut SyncResult,
    ) -> Option<NoteId> {
        if self.options.preview {
            tracing::info!("[preview] new: {}", card.summary());
            result.new_count += 1;
            result.push(CardAction::New, card, None);
            return None;
        }

        match self.remote.create(deck, card.kind().model_name(), fields, tags) {
            Ok(id) => {
                tracing::info!("new {}: {}", id, card.summary());
                result.new_count += 1;
                result.push(CardAction::New, card, Some(id));
                Some(id)
            }
            Err(e) => {
                tracing::warn!("add failed: {}", e);
                result.error_count += 1;
                result.errors.push(format!("add failed: {}", e));
                result.push(CardAction::Error, card, None).error = Some(e.to_string());
                None
            }
        }
    }

    fn handle_orphans(&self, scope: &str, final_ids: &[Option<NoteId>], result: &mut SyncResult) {
        let scoped = match self.remote.find_by_scope(scope) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("orphan detection failed: {}", e);
                result.errors.push(format!("orphan detection failed: {}", e));
                return;
            }
        };

        let expected: HashSet<NoteId> = final_ids.iter().flatten().copied().collect();
        let mut seen = HashSet::new();
        let orphans: Vec<NoteId> = scoped
            .into_iter()
            .filter(|id| !expected.contains(id) && seen.insert(*id))
            .collect();

        if orphans.is_empty() {
            return;
        }

        for &id in &orphans {
            result.details.push(CardSyncDetail {
                action: CardAction::DeletedFromSource,
                card_kind: None,
                note_id: Some(id),
                previous_id: None,
                summary: format!("orphan note {}", id),
                error: None,
            });
        }
        result.deleted_from_source = orphans.len();

        let applied = if self.options.preview {
            tracing::info!("[preview] {} orphan(s) left untouched", orphans.len());
            Ok(())
        } else if self.options.delete_orphans {
            tracing::info!("deleting {} orphan(s)", orphans.len());
            self.remote.delete(&orphans)
        } else {
            tracing::info!("tagging {} orphan(s) {}", orphans.len(), ORPHAN_TAG);
            self.remote.add_tag(&orphans, ORPHAN_TAG)
        };
        if let Err(e) = applied {
            result.errors.push(format!("orphan handling failed: {}", e));
        }

        result.orphans = orphans;
    }

    fn copy_images(&self, note: &ParsedNote, content: &str, result: &mut SyncResult) {
        let references = collect_image_refs(content);
        if references.is_empty() {
            return;
        }

        let Some(media_dir) = self
            .remote
            .media_dir_path()
            .or_else(|| self.options.fallback_media_path.clone())
        else {
            tracing::warn!("no media directory, skipping image copy");
            result
                .errors
                .push("could not determine media directory for images".to_string());
            return;
        };

        match images::copy_to_media(&references, &note.file_path, &note.vault_root, &media_dir, false) {
            Ok(report) => result.images = Some(report),
            Err(e) => result.errors.push(format!("image copy failed: {}", e)),
        }
    }
}

/// Clear repeated markers so two cards never claim the same remote note.
fn dedup_markers(cards: Vec<CardWithIdentity>) -> Vec<CardWithIdentity> {
    let mut seen = HashSet::new();
    cards
        .into_iter()
        .map(|mut item| {
            if let Some(id) = item.marker {
                if !seen.insert(id) {
                    tracing::warn!("marker {} repeated, treating card as new", id);
                    item.marker = None;
                }
            }
            item
        })
        .collect()
}

/// Image references across all cards of a note.
pub fn collect_image_refs(content: &str) -> BTreeSet<String> {
    parse_cards_with_ids(content)
        .iter()
        .flat_map(|item| item.card.texts())
        .flat_map(images::extract_from_text)
        .collect()
}
