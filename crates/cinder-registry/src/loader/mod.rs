//! Pack-root scanning and loading.
//!
//! Walks the configured pack roots for `pack.toml` descriptions, parses
//! them in parallel and collapses duplicate installs of the same pack.

use std::ffi::OsStr;

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::model::{Pack, PackManifest, RegistryError, RegistryResult};

const PACK_FILE_NAME: &str = "pack.toml";

/// Severity of a diagnostic produced while loading pack roots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSeverity {
    Warning,
    Error,
}

/// Diagnostic emitted during pack loading
#[derive(Debug, Clone)]
pub struct LoadNote {
    pub severity: NoteSeverity,
    pub message: String,
}

impl LoadNote {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: NoteSeverity::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: NoteSeverity::Error,
            message: message.into(),
        }
    }
}

/// Result of scanning pack roots: loaded packs plus diagnostics.
///
/// A description file that fails to read or parse produces an `Error`
/// note and is skipped; the remaining packs still load.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub packs: Vec<Pack>,
    pub notes: Vec<LoadNote>,
}

impl LoadOutcome {
    pub fn has_errors(&self) -> bool {
        self.notes
            .iter()
            .any(|note| note.severity == NoteSeverity::Error)
    }
}

/// Parse a single pack description file
pub fn load_pack_file(path: &Utf8Path) -> RegistryResult<Pack> {
    let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_owned(),
        source,
    })?;
    let manifest: PackManifest = toml::from_str(&text).map_err(|source| RegistryError::Parse {
        path: path.to_owned(),
        source,
    })?;
    manifest.into_pack(path.to_owned())
}

/// Scan `roots` recursively for pack descriptions and load them all.
///
/// Files parse in parallel; the outcome keeps deterministic path order.
/// The same pack installed under more than one path collapses to the
/// first copy found, with a warning naming the ignored path.
pub fn load_pack_roots(roots: &[Utf8PathBuf]) -> LoadOutcome {
    let mut notes = Vec::new();

    // Collect candidate files first, then sort for deterministic output
    let mut files: Vec<Utf8PathBuf> = Vec::new();
    for root in roots {
        for entry in WalkDir::new(root).follow_links(true) {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file()
                        || entry.file_name() != OsStr::new(PACK_FILE_NAME)
                    {
                        continue;
                    }
                    match Utf8PathBuf::from_path_buf(entry.into_path()) {
                        Ok(path) => files.push(path),
                        Err(path) => notes.push(LoadNote::warning(format!(
                            "skipping non-utf8 path '{}'",
                            path.display()
                        ))),
                    }
                }
                Err(err) => notes.push(LoadNote::warning(format!(
                    "skipping unreadable entry under '{}': {}",
                    root, err
                ))),
            }
        }
    }
    files.sort();
    files.dedup();

    let parsed: DashMap<usize, RegistryResult<Pack>> = DashMap::new();
    files.par_iter().enumerate().for_each(|(slot, path)| {
        parsed.insert(slot, load_pack_file(path));
    });

    // Freeze the parallel results back into path order
    let mut by_id: IndexMap<String, Pack> = IndexMap::new();
    for (slot, path) in files.iter().enumerate() {
        let result = match parsed.remove(&slot) {
            Some((_, result)) => result,
            None => continue,
        };
        match result {
            Ok(pack) => {
                debug!("loaded pack description: {} ({})", pack.id, path);
                let key = pack.id.to_string();
                if let Some(kept) = by_id.get(&key) {
                    notes.push(LoadNote::warning(format!(
                        "duplicate installed pack '{}': '{}' ignored in favour of '{}'",
                        pack.id, pack.path, kept.path
                    )));
                } else {
                    by_id.insert(key, pack);
                }
            }
            Err(err) => {
                warn!("failed to load pack description: {}", path);
                notes.push(LoadNote::error(err.to_string()));
            }
        }
    }

    LoadOutcome {
        packs: by_id.into_values().collect(),
        notes,
    }
}
