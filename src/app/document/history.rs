// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/document/history.rs
//
// Per-document view history: last page and display preferences.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constant::{APP_DIR, HISTORY_FILE, MAX_OPACITY, MIN_OPACITY};

/// View state of a document that survives restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewPrefs {
    pub page: usize,
    pub invert: bool,
    pub trim: bool,
    pub opacity: u8,
}

/// One history section. Preferences equal to the defaults are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<i64>,
}

impl HistoryEntry {
    /// Build the entry to store for `prefs`.
    pub fn from_prefs(prefs: &ViewPrefs, defaults: &ViewPrefs) -> Self {
        Self {
            page: Some(prefs.page as i64),
            invert: (prefs.invert != defaults.invert).then_some(prefs.invert),
            trim: (prefs.trim != defaults.trim).then_some(prefs.trim),
            opacity: (prefs.opacity != defaults.opacity).then_some(i64::from(prefs.opacity)),
        }
    }

    /// Whether storing this entry would add nothing over the defaults.
    pub fn is_trivial(&self) -> bool {
        *self
            == Self {
                page: Some(0),
                ..Self::default()
            }
    }

    /// Overwrite `prefs` with the stored values; the page is clamped into
    /// a document of `length` pages.
    pub fn apply(&self, prefs: &mut ViewPrefs, length: usize) {
        if let Some(invert) = self.invert {
            prefs.invert = invert;
        }
        if let Some(trim) = self.trim {
            prefs.trim = trim;
        }
        if let Some(opacity) = self.opacity {
            prefs.opacity =
                opacity.clamp(i64::from(MIN_OPACITY), i64::from(MAX_OPACITY)) as u8;
        }
        let page = self.page.unwrap_or(prefs.page as i64);
        let last = length.saturating_sub(1) as i64;
        prefs.page = page.min(last).max(0) as usize;
    }
}

/// History of all documents, keyed by absolute path.
#[derive(Debug, Default)]
pub struct History {
    documents: BTreeMap<String, HistoryEntry>,
    file_path: Option<PathBuf>,
}

impl History {
    /// Default location below the XDG data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR).join(HISTORY_FILE))
    }

    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn with_file(file_path: &Path) -> Self {
        Self {
            documents: BTreeMap::new(),
            file_path: Some(file_path.to_path_buf()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&Path>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load history from {}: {}", path.display(), e);
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if !file_path.exists() {
            return Ok(Self::with_file(file_path));
        }
        let content = fs::read_to_string(file_path)?;
        let documents = toml::from_str(&content)?;
        Ok(Self {
            documents,
            file_path: Some(file_path.to_path_buf()),
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.file_path {
            Some(path) => {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir)?;
                }
                let content = toml::to_string(&self.documents)?;
                fs::write(path, content)?;
                Ok(())
            }
            None => {
                // Ephemeral history doesn't save to disk
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&HistoryEntry> {
        self.documents.get(key)
    }

    /// Store `entry` under `key` and report whether anything changed.
    ///
    /// Trivial entries remove the section instead.
    pub fn record(&mut self, key: &str, entry: HistoryEntry) -> bool {
        if entry.is_trivial() {
            return self.documents.remove(key).is_some();
        }
        let old = self.documents.insert(key.to_string(), entry.clone());
        old.as_ref() != Some(&entry)
    }
}

/// Absolute form of `path` with `.` and `..` removed lexically.
///
/// Symlinks are not resolved: `a/link/../b` becomes `a/b`.
pub fn lexical_absolute(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// History key of a document.
pub fn history_key(path: &Path) -> String {
    let cwd = std::env::current_dir().unwrap_or_default();
    lexical_absolute(path, &cwd).to_string_lossy().into_owned()
}
