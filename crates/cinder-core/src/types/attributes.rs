//! Target attribute bags and the ordered-source merge.
//!
//! Resolved target attributes accumulate from device, board, and explicit
//! per-target sources. Defaults override silently left-to-right; two
//! explicit sources disagreeing on a value is a redefinition error.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Conventional attribute keys shared with installed pack data
pub mod keys {
    pub const DNAME: &str = "Dname";
    pub const DVENDOR: &str = "Dvendor";
    pub const DFAMILY: &str = "Dfamily";
    pub const DVARIANT: &str = "Dvariant";
    pub const DCORE: &str = "Dcore";
    pub const DCORE_VERSION: &str = "DcoreVersion";
    pub const DCLOCK: &str = "Dclock";
    pub const DFPU: &str = "Dfpu";
    pub const DMPU: &str = "Dmpu";
    pub const DDSP: &str = "Ddsp";
    pub const DMVE: &str = "Dmve";
    pub const DENDIAN: &str = "Dendian";
    pub const DSECURE: &str = "Dsecure";
    pub const DBRANCHPROT: &str = "Dbranchprot";
    pub const PNAME: &str = "Pname";
    pub const BNAME: &str = "Bname";
    pub const BVENDOR: &str = "Bvendor";
    pub const BREVISION: &str = "Brevision";
    pub const TCOMPILER: &str = "Tcompiler";
    pub const TOPTIONS: &str = "Toptions";
}

/// Endianness value a device uses to defer the choice to the integrator;
/// never copied into a resolved attribute bag
pub const CONFIGURABLE: &str = "Configurable";

/// An ordered key/value attribute bag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The value for `key`, or `""` when absent
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
struct MergeEntry {
    value: String,
    source: String,
    explicit: bool,
}

/// Ordered attribute merge with redefinition detection.
///
/// Default layers (device, then board) override each other silently;
/// explicit values win over any default but may not contradict an earlier
/// explicit value.
#[derive(Debug, Default)]
pub struct AttrMerge {
    entries: IndexMap<String, MergeEntry>,
}

impl AttrMerge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a layer of default values; empty values are skipped
    pub fn defaults(&mut self, attrs: &Attributes, source: &str) -> &mut Self {
        for (key, value) in attrs.iter() {
            self.default_value(key, value, source);
        }
        self
    }

    /// Merge one default value
    pub fn default_value(&mut self, key: &str, value: &str, source: &str) -> &mut Self {
        if value.is_empty() {
            return self;
        }
        match self.entries.get_mut(key) {
            Some(entry) if entry.explicit => {}
            Some(entry) => {
                entry.value = value.to_string();
                entry.source = source.to_string();
            }
            None => {
                self.entries.insert(
                    key.to_string(),
                    MergeEntry {
                        value: value.to_string(),
                        source: source.to_string(),
                        explicit: false,
                    },
                );
            }
        }
        self
    }

    /// Merge one explicit value; a conflicting explicit redefinition fails
    pub fn explicit(&mut self, key: &str, value: &str, source: &str) -> CoreResult<()> {
        if value.is_empty() {
            return Ok(());
        }
        match self.entries.get_mut(key) {
            Some(entry) if entry.explicit && entry.value != value => {
                Err(CoreError::Redefinition {
                    key: key.to_string(),
                    existing: entry.value.clone(),
                    existing_source: entry.source.clone(),
                    incoming: value.to_string(),
                    incoming_source: source.to_string(),
                })
            }
            Some(entry) => {
                entry.value = value.to_string();
                entry.source = source.to_string();
                entry.explicit = true;
                Ok(())
            }
            None => {
                self.entries.insert(
                    key.to_string(),
                    MergeEntry {
                        value: value.to_string(),
                        source: source.to_string(),
                        explicit: true,
                    },
                );
                Ok(())
            }
        }
    }

    /// The merged bag, keys in first-appearance order
    pub fn finish(self) -> Attributes {
        self.entries
            .into_iter()
            .map(|(key, entry)| (key, entry.value))
            .collect()
    }
}
