//! Pack lock file (`cinder.lock`)
//!
//! Records the pack versions a previous resolution settled on, together
//! with the requirement strings that selected each pack. Resolution
//! prefers locked versions while they still satisfy the requirements,
//! keeping rebuilds stable when newer packs get installed.

use camino::Utf8Path;
use chrono::{DateTime, SecondsFormat, Utc};
use cinder_core::PackId;
use serde::Deserialize;
use toml_edit::{value, Array, ArrayOfTables, DocumentMut, Item, Table};

use crate::{ConfigError, ConfigResult};

pub const LOCK_FILE_NAME: &str = "cinder.lock";

const LOCK_VERSION: i64 = 1;

const LOCK_HEADER: &str = "\
# This file is automatically generated by cinder.
# It is not intended for manual editing.
";

/// Parsed pack lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockFile {
    /// Generation timestamp as written, if any
    pub generated: Option<String>,

    /// Pinned packs in resolution order
    pub packs: Vec<LockedPack>,
}

/// One pinned pack with the requirement strings that selected it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedPack {
    pub id: PackId,
    pub selected_by: Vec<String>,
}

impl LockFile {
    /// Look up the pinned entry for a (vendor, name) pair
    pub fn find(&self, vendor: &str, name: &str) -> Option<&LockedPack> {
        self.packs
            .iter()
            .find(|pack| pack.id.vendor == vendor && pack.id.name == name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LockDoc {
    lock: LockMeta,
    #[serde(default, rename = "pack")]
    packs: Vec<LockedPackDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LockMeta {
    version: i64,
    #[serde(default)]
    generated: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LockedPackDoc {
    id: String,
    #[serde(default)]
    selected_by: Vec<String>,
}

/// Parse lock file text
pub fn parse_lock(text: &str, path: &Utf8Path) -> ConfigResult<LockFile> {
    let doc: LockDoc = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })?;
    if doc.lock.version != LOCK_VERSION {
        return Err(ConfigError::Invalid {
            path: path.to_owned(),
            reason: format!("unsupported lock version {}", doc.lock.version),
        });
    }
    let mut packs = Vec::with_capacity(doc.packs.len());
    for pack in doc.packs {
        packs.push(LockedPack {
            id: pack.id.parse()?,
            selected_by: pack.selected_by,
        });
    }
    Ok(LockFile {
        generated: doc.lock.generated,
        packs,
    })
}

/// Read a lock file; an absent file is not an error
pub fn read_lock(path: &Utf8Path) -> ConfigResult<Option<LockFile>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            })
        }
    };
    parse_lock(&text, path).map(Some)
}

/// Render a lock file with the given generation timestamp
pub fn render_lock(lock: &LockFile, generated: DateTime<Utc>) -> String {
    let mut doc = DocumentMut::new();

    let mut meta = Table::new();
    meta["version"] = value(LOCK_VERSION);
    meta["generated"] = value(generated.to_rfc3339_opts(SecondsFormat::Secs, true));
    doc["lock"] = Item::Table(meta);

    let mut packs = ArrayOfTables::new();
    for pack in &lock.packs {
        let mut table = Table::new();
        table["id"] = value(pack.id.to_string());
        let mut selected = Array::new();
        for requirement in &pack.selected_by {
            selected.push(requirement.as_str());
        }
        table["selected-by"] = value(selected);
        packs.push(table);
    }
    doc["pack"] = Item::ArrayOfTables(packs);

    format!("{LOCK_HEADER}\n{doc}")
}

/// Write the lock file, stamped with the current time
pub fn write_lock(lock: &LockFile, path: &Utf8Path) -> ConfigResult<()> {
    let text = render_lock(lock, Utc::now());
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_owned(),
        source,
    })
}
