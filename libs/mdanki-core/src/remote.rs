//! The remote collection the sync engine talks to.

use crate::error::RemoteError;
use crate::types::{Fields, NoteId, RemoteRecord};
use std::path::PathBuf;

/// Operations the sync engine needs from the remote collection.
///
/// Calls are blocking. Implementations carry their own transport timeouts.
pub trait RemoteDirectory {
    /// Identities of every note carrying `tag`.
    fn find_by_scope(&self, tag: &str) -> Result<Vec<NoteId>, RemoteError>;

    /// Batch fetch. Unknown or deleted identities are left out of the
    /// result rather than reported as errors.
    fn fetch_records(&self, ids: &[NoteId]) -> Result<Vec<RemoteRecord>, RemoteError>;

    /// Create a note and return its identity.
    fn create(
        &self,
        deck: &str,
        model: &str,
        fields: &Fields,
        tags: &[String],
    ) -> Result<NoteId, RemoteError>;

    /// Replace the fields and tags of an existing note.
    fn update(&self, id: NoteId, fields: &Fields, tags: &[String]) -> Result<(), RemoteError>;

    fn add_tag(&self, ids: &[NoteId], tag: &str) -> Result<(), RemoteError>;

    /// Permanently delete notes.
    fn delete(&self, ids: &[NoteId]) -> Result<(), RemoteError>;

    /// Where referenced images must be copied, if the remote knows.
    fn media_dir_path(&self) -> Option<PathBuf>;
}
