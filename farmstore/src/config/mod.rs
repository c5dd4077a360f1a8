// Store configuration - YAML file plus FARMSTORE_* environment overrides

use crate::backend::{Backend, FileBackend, SqliteBackend};
use crate::document::IdStrategy;
use crate::error::{FarmStoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which backend holds the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Json,
    Sqlite,
}

/// How `replace` treats the version carried by the incoming document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Reject writes based on a stale version.
    #[default]
    Versioned,
    /// Overwrite unconditionally; concurrent writers lose updates.
    Blind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_path: PathBuf,
    pub backend: BackendKind,
    pub write_mode: WriteMode,
    /// Require an acting user on replace and check what they changed.
    pub enforce_ownership: bool,
    pub id_strategy: IdStrategy,
    /// Indent the JSON file.
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_path: PathBuf::from("data.json"),
            backend: BackendKind::Json,
            write_mode: WriteMode::Versioned,
            enforce_ownership: true,
            id_strategy: IdStrategy::Ulid,
            pretty: true,
        }
    }
}

impl StoreConfig {
    /// A config for the given data file, everything else default.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_path: path.into(),
            ..Default::default()
        }
    }

    /// Parse a farmstore.yaml file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse a config YAML string. Missing keys take their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: StoreConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Apply `FARMSTORE_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup("FARMSTORE_DATA_PATH") {
            self.data_path = PathBuf::from(path);
        }
        if let Some(v) = lookup("FARMSTORE_BACKEND") {
            self.backend = parse_value("FARMSTORE_BACKEND", &v)?;
        }
        if let Some(v) = lookup("FARMSTORE_WRITE_MODE") {
            self.write_mode = parse_value("FARMSTORE_WRITE_MODE", &v)?;
        }
        if let Some(v) = lookup("FARMSTORE_ENFORCE_OWNERSHIP") {
            self.enforce_ownership = v.trim().parse().map_err(|_| {
                FarmStoreError::Config(format!(
                    "FARMSTORE_ENFORCE_OWNERSHIP must be true or false, got '{v}'"
                ))
            })?;
        }
        if let Some(v) = lookup("FARMSTORE_ID_STRATEGY") {
            self.id_strategy = parse_value("FARMSTORE_ID_STRATEGY", &v)?;
        }
        Ok(self)
    }

    /// Build the backend this config describes.
    pub fn open_backend(&self) -> Result<Box<dyn Backend>> {
        Ok(match self.backend {
            BackendKind::Json => {
                let backend = FileBackend::new(&self.data_path);
                Box::new(if self.pretty { backend } else { backend.compact() })
            }
            BackendKind::Sqlite => Box::new(SqliteBackend::open(&self.data_path)?),
        })
    }
}

fn parse_value<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    serde_yaml::from_str(raw.trim())
        .map_err(|e| FarmStoreError::Config(format!("{key}: invalid value '{raw}': {e}")))
}
