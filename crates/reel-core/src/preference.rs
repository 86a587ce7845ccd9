#![forbid(unsafe_code)]

//! Persisted user preferences consulted by the controller.
//!
//! The controller only ever *reads* one flag: the hold-profile preference,
//! at session start. A stored value of exactly `"false"` selects the legacy
//! long-press duration; absence or any other value selects the quick one.
//!
//! Two backends are provided: [`MemoryPreferences`] for tests and embedded
//! hosts, and [`JsonFilePreferences`], a flat JSON object on disk (the
//! native counterpart of browser `localStorage`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ahash::AHashMap;

use crate::config::GestureConfig;

/// Key/value preference storage.
pub trait PreferenceStore {
    /// Read a stored value.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;

    /// Remove a value.
    fn remove(&mut self, key: &str) -> Result<(), PreferenceError>;
}

/// In-memory preference storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: AHashMap<String, String>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PreferenceError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Preferences persisted as a flat JSON object of strings.
///
/// Writes go straight to disk. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: serde_json::Map<String, serde_json::Value>,
}

impl JsonFilePreferences {
    /// Open (or lazily create) the preference file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => serde_json::Map::new(),
            Ok(content) => match serde_json::from_str::<serde_json::Value>(&content)
                .map_err(PreferenceError::Json)?
            {
                serde_json::Value::Object(map) => map,
                _ => return Err(PreferenceError::NotAnObject { path }),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => serde_json::Map::new(),
            Err(e) => return Err(PreferenceError::Io(e)),
        };
        Ok(Self { path, values })
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), PreferenceError> {
        let content =
            serde_json::to_string_pretty(&self.values).map_err(PreferenceError::Json)?;
        std::fs::write(&self.path, content).map_err(PreferenceError::Io)
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        // localStorage only holds strings; accept JSON scalars by their text.
        match self.values.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values
            .insert(key.to_owned(), serde_json::Value::String(value.to_owned()));
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), PreferenceError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Preference storage errors.
#[derive(Debug)]
pub enum PreferenceError {
    Io(std::io::Error),
    Json(serde_json::Error),
    NotAnObject { path: PathBuf },
}

impl fmt::Display for PreferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "preference I/O error: {e}"),
            Self::Json(e) => write!(f, "preference JSON error: {e}"),
            Self::NotAnObject { path } => {
                write!(f, "preference file {} is not a JSON object", path.display())
            }
        }
    }
}

impl std::error::Error for PreferenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::NotAnObject { .. } => None,
        }
    }
}

/// Long-press profile selected at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HoldProfile {
    #[default]
    Quick,
    Legacy,
}

impl HoldProfile {
    /// Apply the stored-flag rule: exactly `"false"` means legacy.
    #[must_use]
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("false") => Self::Legacy,
            _ => Self::Quick,
        }
    }

    /// Read the profile from `store` using the configured key.
    #[must_use]
    pub fn resolve(store: &dyn PreferenceStore, config: &GestureConfig) -> Self {
        Self::from_flag(store.get(&config.hold_preference_key).as_deref())
    }

    /// Hold duration for this profile.
    #[must_use]
    pub fn duration(self, config: &GestureConfig) -> Duration {
        match self {
            Self::Quick => config.quick_hold,
            Self::Legacy => config.legacy_hold,
        }
    }
}
