//! Blocking client for the AnkiConnect add-on.
//!
//! Every call is a JSON POST of `{action, version, params}` answered by
//! `{result, error}`.

use chrono::{DateTime, Utc};
use mdanki_core::{Fields, NoteId, RemoteDirectory, RemoteError, RemoteRecord};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8765";
pub const API_VERSION: u32 = 6;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// One entry of a `notesInfo` answer. Unknown ids come back as `{}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawNoteInfo {
    note_id: Option<NoteId>,
    model_name: String,
    tags: Vec<String>,
    fields: BTreeMap<String, RawField>,
    #[serde(rename = "mod")]
    modified: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawField {
    value: String,
}

impl RawNoteInfo {
    fn into_record(self) -> Option<RemoteRecord> {
        Some(RemoteRecord {
            id: self.note_id?,
            model_name: self.model_name,
            tags: self.tags,
            fields: self
                .fields
                .into_iter()
                .map(|(name, field)| (name, field.value))
                .collect(),
            modified: self
                .modified
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        })
    }
}

fn decode_response<T: DeserializeOwned>(action: &str, body: &str) -> Result<Option<T>, RemoteError> {
    let response: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| RemoteError::Protocol {
            action: action.to_string(),
            message: e.to_string(),
        })?;

    if let Some(message) = response.error {
        return Err(RemoteError::Rejected {
            action: action.to_string(),
            message,
        });
    }
    Ok(response.result)
}

fn into_records(raw: Vec<RawNoteInfo>) -> Vec<RemoteRecord> {
    raw.into_iter().filter_map(RawNoteInfo::into_record).collect()
}

/// AnkiConnect over HTTP.
pub struct AnkiConnectClient {
    client: Client,
    url: String,
}

impl AnkiConnectClient {
    pub fn new(url: &str) -> Result<Self, RemoteError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Send one request. `Value::Null` params are left out of the payload.
    fn invoke<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<Option<T>, RemoteError> {
        let mut payload = json!({ "action": action, "version": API_VERSION });
        if !params.is_null() {
            payload["params"] = params;
        }
        tracing::debug!("ankiconnect {}", action);

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| RemoteError::Unreachable(format!("{} ({})", self.url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RemoteError::Unreachable(format!("{} ({})", self.url, e)))?;
        if !status.is_success() {
            return Err(RemoteError::Protocol {
                action: action.to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        decode_response(action, &body)
    }

    fn invoke_required<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<T, RemoteError> {
        self.invoke(action, params)?.ok_or_else(|| RemoteError::Protocol {
            action: action.to_string(),
            message: "null result".to_string(),
        })
    }

    /// API version reported by the add-on.
    pub fn version(&self) -> Result<u32, RemoteError> {
        self.invoke_required("version", Value::Null)
    }
}

impl RemoteDirectory for AnkiConnectClient {
    fn find_by_scope(&self, tag: &str) -> Result<Vec<NoteId>, RemoteError> {
        self.invoke_required("findNotes", json!({ "query": format!("tag:{}", tag) }))
    }

    fn fetch_records(&self, ids: &[NoteId]) -> Result<Vec<RemoteRecord>, RemoteError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<RawNoteInfo> = self.invoke_required("notesInfo", json!({ "notes": ids }))?;
        Ok(into_records(raw))
    }

    fn create(
        &self,
        deck: &str,
        model: &str,
        fields: &Fields,
        tags: &[String],
    ) -> Result<NoteId, RemoteError> {
        let note = json!({
            "deckName": deck,
            "modelName": model,
            "fields": fields,
            "tags": tags,
            "options": { "allowDuplicate": true },
        });
        self.invoke("addNote", json!({ "note": note }))?
            .ok_or_else(|| RemoteError::Rejected {
                action: "addNote".to_string(),
                message: "null result, note may be invalid".to_string(),
            })
    }

    fn update(&self, id: NoteId, fields: &Fields, tags: &[String]) -> Result<(), RemoteError> {
        let note = json!({ "id": id, "fields": fields, "tags": tags });
        self.invoke::<Value>("updateNote", json!({ "note": note }))?;
        Ok(())
    }

    fn add_tag(&self, ids: &[NoteId], tag: &str) -> Result<(), RemoteError> {
        self.invoke::<Value>("addTags", json!({ "notes": ids, "tags": tag }))?;
        Ok(())
    }

    fn delete(&self, ids: &[NoteId]) -> Result<(), RemoteError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.invoke::<Value>("deleteNotes", json!({ "notes": ids }))?;
        Ok(())
    }

    fn media_dir_path(&self) -> Option<PathBuf> {
        match self.invoke::<String>("getMediaDirPath", Value::Null) {
            Ok(Some(path)) => Some(to_local_path(&path)),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("getMediaDirPath failed: {}", e);
                None
            }
        }
    }
}

/// `C:\...` or `C:/...`.
fn is_windows_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[1] == b':' && matches!(bytes[2], b'\\' | b'/')
}

/// Translate a Windows path reported by Anki when running under WSL.
pub fn to_local_path(path: &str) -> PathBuf {
    if cfg!(target_os = "linux") && is_windows_path(path) {
        match Command::new("wslpath").arg("-u").arg(path).output() {
            Ok(output) if output.status.success() => {
                let translated = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !translated.is_empty() {
                    tracing::debug!("translated {} -> {}", path, translated);
                    return PathBuf::from(translated);
                }
            }
            _ => tracing::debug!("wslpath unavailable, keeping {}", path),
        }
    }
    PathBuf::from(path)
}
