//! Shared helpers for the sync engine integration tests.
//!
//! [`MockRemote`] is an in-memory remote collection: it keeps records,
//! answers scope queries from their tags and logs every call so tests
//! can assert on side effects.

pub mod fixtures;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use mdanki_core::{Fields, NoteId, RemoteDirectory, RemoteError, RemoteRecord};

/// First identity handed out by [`MockRemote::create`].
pub const FIRST_ID: NoteId = 1000;

/// A remote call, as recorded by [`MockRemote`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FindByScope(String),
    Fetch(Vec<NoteId>),
    Create {
        deck: String,
        model: String,
        fields: Fields,
        tags: Vec<String>,
    },
    Update {
        id: NoteId,
        fields: Fields,
        tags: Vec<String>,
    },
    AddTag {
        ids: Vec<NoteId>,
        tag: String,
    },
    Delete(Vec<NoteId>),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::FindByScope(_) | Call::Fetch(_))
    }
}

#[derive(Default)]
struct State {
    records: BTreeMap<NoteId, RemoteRecord>,
    next_id: NoteId,
    calls: Vec<Call>,
}

/// Failure switches for [`MockRemote`].
#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub fetch: bool,
    pub scope: bool,
    pub update: bool,
    /// Reject creates whose fields contain this text.
    pub create_containing: Option<String>,
    pub orphan_mutation: bool,
}

pub struct MockRemote {
    state: RefCell<State>,
    pub failures: Failures,
    pub media_dir: Option<PathBuf>,
    /// Scope queries list every id twice.
    pub repeat_scope: bool,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                next_id: FIRST_ID,
                ..State::default()
            }),
            failures: Failures::default(),
            media_dir: None,
            repeat_scope: false,
        }
    }

    /// Seed a record as if an earlier sync had created it.
    pub fn with_record(self, id: NoteId, fields: &[(&str, &str)], tags: &[&str]) -> Self {
        let record = RemoteRecord {
            id,
            model_name: if fields.iter().any(|(k, _)| *k == "Text") {
                "Cloze".to_string()
            } else {
                "Basic".to_string()
            },
            tags: tags.iter().map(|t| t.to_string()).collect(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            modified: None,
        };
        self.state.borrow_mut().records.insert(id, record);
        self
    }

    pub fn with_failures(mut self, failures: Failures) -> Self {
        self.failures = failures;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn record(&self, id: NoteId) -> Option<RemoteRecord> {
        self.state.borrow().records.get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<NoteId> {
        self.state.borrow().records.keys().copied().collect()
    }

    fn log(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn rejected(action: &str) -> RemoteError {
        RemoteError::Rejected {
            action: action.to_string(),
            message: "mock failure".to_string(),
        }
    }
}

impl RemoteDirectory for MockRemote {
    fn find_by_scope(&self, tag: &str) -> Result<Vec<NoteId>, RemoteError> {
        self.log(Call::FindByScope(tag.to_string()));
        if self.failures.scope {
            return Err(RemoteError::Unreachable("connection refused".to_string()));
        }
        let ids: Vec<NoteId> = self
            .state
            .borrow()
            .records
            .values()
            .filter(|r| r.tags.iter().any(|t| t == tag))
            .map(|r| r.id)
            .collect();
        if self.repeat_scope {
            return Ok(ids.iter().chain(ids.iter()).copied().collect());
        }
        Ok(ids)
    }

    fn fetch_records(&self, ids: &[NoteId]) -> Result<Vec<RemoteRecord>, RemoteError> {
        self.log(Call::Fetch(ids.to_vec()));
        if self.failures.fetch {
            return Err(RemoteError::Unreachable("connection refused".to_string()));
        }
        let state = self.state.borrow();
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect())
    }

    fn create(
        &self,
        deck: &str,
        model: &str,
        fields: &Fields,
        tags: &[String],
    ) -> Result<NoteId, RemoteError> {
        self.log(Call::Create {
            deck: deck.to_string(),
            model: model.to_string(),
            fields: fields.clone(),
            tags: tags.to_vec(),
        });
        if let Some(needle) = &self.failures.create_containing {
            if fields.values().any(|v| v.contains(needle.as_str())) {
                return Err(Self::rejected("addNote"));
            }
        }

        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.records.insert(
            id,
            RemoteRecord {
                id,
                model_name: model.to_string(),
                tags: tags.to_vec(),
                fields: fields.clone(),
                modified: None,
            },
        );
        Ok(id)
    }

    fn update(&self, id: NoteId, fields: &Fields, tags: &[String]) -> Result<(), RemoteError> {
        self.log(Call::Update {
            id,
            fields: fields.clone(),
            tags: tags.to_vec(),
        });
        if self.failures.update {
            return Err(Self::rejected("updateNote"));
        }
        let mut state = self.state.borrow_mut();
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| Self::rejected("updateNote"))?;
        record.fields.extend(fields.clone());
        record.tags = tags.to_vec();
        Ok(())
    }

    fn add_tag(&self, ids: &[NoteId], tag: &str) -> Result<(), RemoteError> {
        self.log(Call::AddTag {
            ids: ids.to_vec(),
            tag: tag.to_string(),
        });
        if self.failures.orphan_mutation {
            return Err(Self::rejected("addTags"));
        }
        let mut state = self.state.borrow_mut();
        for id in ids {
            if let Some(record) = state.records.get_mut(id) {
                record.tags.push(tag.to_string());
            }
        }
        Ok(())
    }

    fn delete(&self, ids: &[NoteId]) -> Result<(), RemoteError> {
        self.log(Call::Delete(ids.to_vec()));
        if self.failures.orphan_mutation {
            return Err(Self::rejected("deleteNotes"));
        }
        let mut state = self.state.borrow_mut();
        for id in ids {
            state.records.remove(id);
        }
        Ok(())
    }

    fn media_dir_path(&self) -> Option<PathBuf> {
        self.media_dir.clone()
    }
}
