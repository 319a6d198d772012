//! Reusable layer files and their discovery
//!
//! Layers are self-contained fragments (`*.layer.toml`) contributing
//! components and connection declarations. A layer advertises a type tag
//! plus optional board/device applicability filters; the solver picks a
//! compatible combination of discovered layers per referenced type.

use camino::{Utf8Path, Utf8PathBuf};
use cinder_core::{BoardSpec, DeviceSpec};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::solution::{name_from_path, normalize_selection, SelectionDoc};
use crate::{ComponentSelection, ConnectDecl, ConfigError, ConfigResult};

const LAYER_SUFFIX: &str = ".layer.toml";

/// One parsed layer file
#[derive(Debug, Clone)]
pub struct LayerFile {
    /// Path the layer was loaded from
    pub path: Utf8PathBuf,

    /// Short name derived from the file stem
    pub name: String,

    /// Type tag matched against project layer references
    pub layer_type: String,

    /// Free-form description used in diagnostics
    pub description: String,

    /// Board applicability filter; `None` matches any board
    pub for_board: Option<BoardSpec>,

    /// Device applicability filter; `None` matches any device
    pub for_device: Option<DeviceSpec>,

    /// Components contributed when the layer is active
    pub components: Vec<ComponentSelection>,

    /// Connection declarations contributed when the layer is active
    pub connects: Vec<ConnectDecl>,
}

impl LayerFile {
    /// Whether this layer applies to the resolved board and device.
    ///
    /// Each filter field constrains only when non-empty, and then by
    /// exact equality against the corresponding resolved field.
    pub fn applies_to(&self, board: Option<&BoardSpec>, device: Option<&DeviceSpec>) -> bool {
        if let Some(filter) = &self.for_board {
            let matched = board.map_or(false, |actual| {
                field_accepts(filter.vendor.as_deref(), actual.vendor.as_deref())
                    && (filter.name.is_empty() || filter.name == actual.name)
                    && field_accepts(filter.revision.as_deref(), actual.revision.as_deref())
            });
            if !matched {
                return false;
            }
        }
        if let Some(filter) = &self.for_device {
            let matched = device.map_or(false, |actual| {
                field_accepts(filter.vendor.as_deref(), actual.vendor.as_deref())
                    && (filter.name.is_empty() || filter.name == actual.name)
                    && field_accepts(filter.pname.as_deref(), actual.pname.as_deref())
            });
            if !matched {
                return false;
            }
        }
        true
    }
}

fn field_accepts(filter: Option<&str>, actual: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(f) if f.is_empty() => true,
        Some(f) => actual == Some(f),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LayerDoc {
    layer: LayerInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LayerInfo {
    #[serde(rename = "type")]
    layer_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    for_board: Option<String>,
    #[serde(default)]
    for_device: Option<String>,
    #[serde(default)]
    components: Vec<SelectionDoc>,
    #[serde(default, rename = "connect")]
    connects: Vec<ConnectDecl>,
}

/// Parse a layer from TOML text
pub fn parse_layer(text: &str, path: &Utf8Path) -> ConfigResult<LayerFile> {
    let doc: LayerDoc = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })?;
    let info = doc.layer;

    if info.layer_type.is_empty() {
        return Err(ConfigError::Invalid {
            path: path.to_owned(),
            reason: "layer type must not be empty".into(),
        });
    }

    let mut components = Vec::with_capacity(info.components.len());
    for selection in &info.components {
        components.push(normalize_selection(selection, path)?);
    }

    let for_board = info
        .for_board
        .as_deref()
        .map(BoardSpec::parse)
        .filter(|spec| !spec.is_empty());
    let for_device = info
        .for_device
        .as_deref()
        .map(DeviceSpec::parse)
        .filter(|spec| !spec.is_empty());

    Ok(LayerFile {
        path: path.to_owned(),
        name: name_from_path(path, ".layer"),
        layer_type: info.layer_type,
        description: info.description,
        for_board,
        for_device,
        components,
        connects: info.connects,
    })
}

/// Load and parse a single layer file
pub fn load_layer(path: &Utf8Path) -> ConfigResult<LayerFile> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    parse_layer(&text, path)
}

/// Discover every `*.layer.toml` under the given search paths.
///
/// Files are returned in sorted path order so downstream combination
/// enumeration is deterministic. A malformed layer file fails the whole
/// discovery; layers are user configuration, not third-party content.
pub fn discover_layers(search_paths: &[Utf8PathBuf]) -> ConfigResult<Vec<LayerFile>> {
    let mut files: Vec<Utf8PathBuf> = Vec::new();
    for root in search_paths {
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                // Missing search paths are tolerated; they simply yield nothing
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) {
                if path.as_str().ends_with(LAYER_SUFFIX) {
                    files.push(path);
                }
            }
        }
    }
    files.sort();
    files.dedup();

    files.iter().map(|path| load_layer(path)).collect()
}
