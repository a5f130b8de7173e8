//! Persistent settings: the Anki media folder and the AnkiConnect URL.

use crate::ankiconnect::DEFAULT_URL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "MDANKI_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write config {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed config {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no per-user config directory; set MDANKI_CONFIG")]
    NoConfigDir,

    #[error("Anki media folder unknown; pass --anki-media once to save it")]
    MissingMediaPath,
}

/// Contents of `config.json`. Unknown keys are kept on save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anki_media_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ankiconnect_url: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The config file on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$MDANKI_CONFIG`, else `<config dir>/mdanki/config.json`.
    pub fn locate() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(Self::new(path));
        }
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(dir.join("mdanki").join("config.json")))
    }

    /// Saved settings; an absent file is an empty config.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let write_err = |source: io::Error| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let text = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text + "\n").map_err(write_err)
    }

    /// Media folder from the command line (saved for later runs) or the
    /// config file. `None` when neither has one.
    pub fn media_path(&self, cli_override: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        let mut config = self.load()?;

        if let Some(path) = cli_override {
            config.anki_media_path = Some(path.to_path_buf());
            self.save(&config)?;
            tracing::info!("Anki media path set to {} and saved", path.display());
            return Ok(Some(path.to_path_buf()));
        }

        if let Some(path) = &config.anki_media_path {
            tracing::debug!("loaded Anki media path {}", path.display());
        }
        Ok(config.anki_media_path)
    }

    /// Like [`media_path`](Self::media_path) but the folder is required.
    pub fn require_media_path(&self, cli_override: Option<&Path>) -> Result<PathBuf, ConfigError> {
        self.media_path(cli_override)?
            .ok_or(ConfigError::MissingMediaPath)
    }

    /// AnkiConnect URL from the command line (saved), the config file, or
    /// the default.
    pub fn ankiconnect_url(&self, cli_override: Option<&str>) -> Result<String, ConfigError> {
        let mut config = self.load()?;

        if let Some(url) = cli_override {
            config.ankiconnect_url = Some(url.to_string());
            self.save(&config)?;
            tracing::info!("AnkiConnect URL set to {} and saved", url);
            return Ok(url.to_string());
        }

        Ok(config
            .ankiconnect_url
            .unwrap_or_else(|| DEFAULT_URL.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("nested").join("config.json"))
    }

    #[test]
    fn missing_file_is_empty_config() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store(&dir).load().unwrap(), Config::default());
    }

    #[test]
    fn malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let err = ConfigStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn override_is_saved_and_reused() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let path = store.media_path(Some(Path::new("/anki/media"))).unwrap();
        assert_eq!(path, Some(PathBuf::from("/anki/media")));
        assert_eq!(store.media_path(None).unwrap(), Some(PathBuf::from("/anki/media")));
    }

    #[test]
    fn media_path_required() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir).require_media_path(None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingMediaPath));
    }

    #[test]
    fn url_defaults_then_override_wins() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert_eq!(store.ankiconnect_url(None).unwrap(), DEFAULT_URL);
        store.ankiconnect_url(Some("http://10.0.0.2:8765")).unwrap();
        assert_eq!(store.ankiconnect_url(None).unwrap(), "http://10.0.0.2:8765");
    }

    #[test]
    fn unknown_keys_survive_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"anki_media_path": "/old", "theme": "dark"}"#).unwrap();
        let store = ConfigStore::new(&path);

        store.media_path(Some(Path::new("/new"))).unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["anki_media_path"], "/new");
        assert_eq!(saved["theme"], "dark");
    }
}
