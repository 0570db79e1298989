//! Persisted user preferences.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PreferenceError;
use crate::explorer::LayoutKind;

const LAYOUT_KEY: &str = "layout";
const COLOR_SCHEME_KEY: &str = "color_scheme";
const SHOW_LINES_KEY: &str = "show_lines";
const CARD_PINNED_KEY: &str = "card_pinned";

/// String key/value storage.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Flat JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFilePreferences {
    /// Opens `path`; a missing file starts out empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| PreferenceError::Parse {
                path: path.display().to_string(),
                source,
            })?,
            Err(error) if error.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(PreferenceError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        debug!(path = %path.display(), entries = values.len(), "loaded preferences");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<(), PreferenceError> {
        let write_error = |source: std::io::Error| PreferenceError::Write {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let raw = serde_json::to_string_pretty(&self.values)
            .map_err(|error| write_error(std::io::Error::other(error)))?;
        fs::write(&self.path, raw).map_err(write_error)
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        if self.values.get(key).is_some_and(|current| current == value) {
            return Ok(());
        }
        self.values.insert(key.to_owned(), value.to_owned());
        self.write()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorScheme {
    #[default]
    Similarity,
    Depth,
    Expansion,
}

impl ColorScheme {
    pub const ALL: [Self; 3] = [Self::Similarity, Self::Depth, Self::Expansion];

    pub fn label(self) -> &'static str {
        match self {
            Self::Similarity => "Similarity",
            Self::Depth => "Depth",
            Self::Expansion => "Expansion state",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Similarity => "similarity",
            Self::Depth => "depth",
            Self::Expansion => "expansion",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scheme| scheme.key() == key)
    }
}

/// Typed view over a [`PreferenceStore`]. Unknown or malformed stored
/// values fall back to defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preferences {
    pub layout: LayoutKind,
    pub color_scheme: ColorScheme,
    pub show_lines: bool,
    pub card_pinned: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            layout: LayoutKind::Force,
            color_scheme: ColorScheme::Similarity,
            show_lines: true,
            card_pinned: false,
        }
    }
}

fn parse_bool(store: &dyn PreferenceStore, key: &str, default: bool) -> bool {
    match store.get(key).as_deref() {
        Some("true") => true,
        Some("false") => false,
        Some(other) => {
            warn!(key, value = other, "ignoring malformed preference");
            default
        }
        None => default,
    }
}

impl Preferences {
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let defaults = Self::default();
        Self {
            layout: store
                .get(LAYOUT_KEY)
                .and_then(|key| LayoutKind::from_key(&key))
                .unwrap_or(defaults.layout),
            color_scheme: store
                .get(COLOR_SCHEME_KEY)
                .and_then(|key| ColorScheme::from_key(&key))
                .unwrap_or(defaults.color_scheme),
            show_lines: parse_bool(store, SHOW_LINES_KEY, defaults.show_lines),
            card_pinned: parse_bool(store, CARD_PINNED_KEY, defaults.card_pinned),
        }
    }

    pub fn save(&self, store: &mut dyn PreferenceStore) -> Result<(), PreferenceError> {
        store.set(LAYOUT_KEY, self.layout.key())?;
        store.set(COLOR_SCHEME_KEY, self.color_scheme.key())?;
        store.set(SHOW_LINES_KEY, if self.show_lines { "true" } else { "false" })?;
        store.set(CARD_PINNED_KEY, if self.card_pinned { "true" } else { "false" })
    }
}
