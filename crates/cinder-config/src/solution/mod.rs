//! Solution and project file parsing
//!
//! A solution (`*.solution.toml`) names the installed-pack requirements,
//! the target and build types, and its member projects. Each project
//! (`*.project.toml`) selects components, declares connections and may
//! reference reusable layers by type.

use camino::{Utf8Path, Utf8PathBuf};
use cinder_core::{ComponentQuery, PackRequirement};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Complete solution description
#[derive(Debug, Clone)]
pub struct SolutionFile {
    /// Path the solution was loaded from
    pub path: Utf8PathBuf,

    /// Pack requirements shared by every member project
    pub packs: Vec<PackRequirement>,

    /// Solution-level device selection
    pub device: Option<String>,

    /// Solution-level board selection
    pub board: Option<String>,

    /// Solution-level compiler selection
    pub compiler: Option<String>,

    /// Named target types, each pinning device/board/compiler values
    pub target_types: Vec<TargetType>,

    /// Named build types; empty means a single unnamed build
    pub build_types: Vec<String>,

    /// Member project file paths, relative to the solution
    pub projects: Vec<Utf8PathBuf>,

    /// Directories searched for reusable layer files
    pub layer_paths: Vec<Utf8PathBuf>,
}

impl SolutionFile {
    /// Directory containing the solution file
    pub fn dir(&self) -> &Utf8Path {
        self.path.parent().unwrap_or(Utf8Path::new(""))
    }

    /// Member project paths resolved against the solution directory
    pub fn resolved_projects(&self) -> Vec<Utf8PathBuf> {
        self.projects.iter().map(|p| self.dir().join(p)).collect()
    }

    /// Layer search paths resolved against the solution directory
    pub fn resolved_layer_paths(&self) -> Vec<Utf8PathBuf> {
        self.layer_paths.iter().map(|p| self.dir().join(p)).collect()
    }

    pub fn target_type(&self, name: &str) -> Option<&TargetType> {
        self.target_types.iter().find(|t| t.name == name)
    }
}

/// One named target type within a solution
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetType {
    /// Target type name, unique within the solution
    pub name: String,

    /// Device selection for this target type
    #[serde(default)]
    pub device: Option<String>,

    /// Board selection for this target type
    #[serde(default)]
    pub board: Option<String>,

    /// Compiler selection for this target type
    #[serde(default)]
    pub compiler: Option<String>,

    /// Explicit target attribute overrides, e.g. `Dfpu = "SP_FPU"`
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

/// One member project description
#[derive(Debug, Clone)]
pub struct ProjectFile {
    /// Path the project was loaded from
    pub path: Utf8PathBuf,

    /// Project name; defaults to the file stem
    pub name: String,

    /// Project-level device selection
    pub device: Option<String>,

    /// Project-level board selection
    pub board: Option<String>,

    /// Project-level compiler selection
    pub compiler: Option<String>,

    /// Explicit target attribute overrides applied after the target type
    pub attributes: IndexMap<String, String>,

    /// Selected components with instance counts
    pub components: Vec<ComponentSelection>,

    /// Connection declarations contributed by the project itself
    pub connects: Vec<ConnectDecl>,

    /// Referenced layer types
    pub layers: Vec<LayerRef>,
}

/// One component selection from a project or layer
#[derive(Debug, Clone)]
pub struct ComponentSelection {
    /// Parsed component query
    pub query: ComponentQuery,

    /// Requested instance count
    pub count: u32,
}

/// Reference to a layer slot the project expects to be filled
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayerRef {
    /// Layer type tag to match against discovered layers
    #[serde(rename = "type")]
    pub layer_type: String,

    /// Explicit layer file path, bypassing discovery
    #[serde(default)]
    pub path: Option<Utf8PathBuf>,

    /// Whether the slot may stay unfilled
    #[serde(default)]
    pub optional: bool,
}

/// One connection declaration (a "connect block")
///
/// Several declarations under distinct `set` labels from the same file
/// are mutually exclusive alternatives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectDecl {
    /// Set label; declarations sharing a label form one alternative group
    #[serde(default)]
    pub set: String,

    /// Free-form description used in diagnostics
    #[serde(default)]
    pub info: String,

    /// Provided interface pairs, in declaration order
    #[serde(default)]
    pub provides: Vec<ConnectPair>,

    /// Consumed interface pairs, in declaration order
    #[serde(default)]
    pub consumes: Vec<ConnectPair>,
}

/// One provided or consumed interface pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectPair {
    pub key: String,

    /// Numeric, `+`-prefixed numeric, or empty
    #[serde(default)]
    pub value: String,
}

impl ConnectPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde layer
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SolutionDoc {
    solution: SolutionInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SolutionInfo {
    #[serde(default)]
    packs: Vec<String>,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    board: Option<String>,
    #[serde(default)]
    compiler: Option<String>,
    #[serde(default)]
    target_types: Vec<TargetType>,
    #[serde(default)]
    build_types: Vec<String>,
    #[serde(default)]
    projects: Vec<Utf8PathBuf>,
    #[serde(default)]
    layer_paths: Vec<Utf8PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ProjectDoc {
    project: ProjectInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ProjectInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    board: Option<String>,
    #[serde(default)]
    compiler: Option<String>,
    #[serde(default)]
    attributes: IndexMap<String, String>,
    #[serde(default)]
    components: Vec<SelectionDoc>,
    #[serde(default, rename = "connect")]
    connects: Vec<ConnectDecl>,
    #[serde(default)]
    layers: Vec<LayerRef>,
}

/// Component selection (simple identifier string or detailed object)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SelectionDoc {
    /// Bare component identifier
    Simple(String),

    /// Identifier with an explicit instance count
    Detailed {
        component: String,
        #[serde(default)]
        count: Option<u32>,
    },
}

pub(crate) fn normalize_selection(
    doc: &SelectionDoc,
    path: &Utf8Path,
) -> ConfigResult<ComponentSelection> {
    let (text, count) = match doc {
        SelectionDoc::Simple(text) => (text.as_str(), 1),
        SelectionDoc::Detailed { component, count } => (component.as_str(), count.unwrap_or(1)),
    };
    if count == 0 {
        return Err(ConfigError::Invalid {
            path: path.to_owned(),
            reason: format!("component '{}' count must be at least 1", text),
        });
    }
    let query = ComponentQuery::parse(text)?;
    Ok(ComponentSelection { query, count })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a solution from TOML text
pub fn parse_solution(text: &str, path: &Utf8Path) -> ConfigResult<SolutionFile> {
    let doc: SolutionDoc = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })?;
    let info = doc.solution;

    let mut seen = Vec::new();
    for target in &info.target_types {
        if target.name.is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_owned(),
                reason: "target-type name must not be empty".into(),
            });
        }
        if seen.contains(&target.name) {
            return Err(ConfigError::Invalid {
                path: path.to_owned(),
                reason: format!("duplicate target-type '{}'", target.name),
            });
        }
        seen.push(target.name.clone());
    }

    let mut packs = Vec::with_capacity(info.packs.len());
    for text in &info.packs {
        packs.push(PackRequirement::parse(text)?.with_origin(path.to_owned()));
    }

    Ok(SolutionFile {
        path: path.to_owned(),
        packs,
        device: info.device,
        board: info.board,
        compiler: info.compiler,
        target_types: info.target_types,
        build_types: info.build_types,
        projects: info.projects,
        layer_paths: info.layer_paths,
    })
}

/// Load and parse a solution file
pub fn load_solution(path: &Utf8Path) -> ConfigResult<SolutionFile> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    parse_solution(&text, path)
}

/// Parse a project from TOML text
pub fn parse_project(text: &str, path: &Utf8Path) -> ConfigResult<ProjectFile> {
    let doc: ProjectDoc = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })?;
    let info = doc.project;

    let mut components = Vec::with_capacity(info.components.len());
    for selection in &info.components {
        components.push(normalize_selection(selection, path)?);
    }

    let name = match info.name {
        Some(name) => name,
        None => name_from_path(path, ".project"),
    };

    Ok(ProjectFile {
        path: path.to_owned(),
        name,
        device: info.device,
        board: info.board,
        compiler: info.compiler,
        attributes: info.attributes,
        components,
        connects: info.connects,
        layers: info.layers,
    })
}

/// Load and parse a project file
pub fn load_project(path: &Utf8Path) -> ConfigResult<ProjectFile> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    parse_project(&text, path)
}

/// Derive a name from a file path, trimming a trailing `suffix` from the
/// stem ("core.project.toml" with ".project" gives "core")
pub(crate) fn name_from_path(path: &Utf8Path, suffix: &str) -> String {
    let stem = path.file_stem().unwrap_or("");
    stem.strip_suffix(suffix).unwrap_or(stem).to_string()
}
