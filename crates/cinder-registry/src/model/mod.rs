//! The installed-pack data model.
//!
//! A pack root holds one directory per installed pack version, each with a
//! `pack.toml` description listing the pack's components, APIs, bundles,
//! devices, boards, and conditions. The serde structs in this module
//! mirror that file; [`PackManifest::into_pack`] normalizes them into the
//! runtime model (vendor defaulting, bundle attribute inheritance).

use std::fmt;

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cinder_core::types::keys;
use cinder_core::{Attributes, BoardSpec, ComponentId, CoreError, DeviceSpec, PackId, Version};

/// Errors produced while reading or normalizing pack descriptions
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read pack description {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pack description {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid pack description {path}: {reason}")]
    Invalid { path: Utf8PathBuf, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// One installed pack, normalized from its description file
#[derive(Debug, Clone)]
pub struct Pack {
    pub id: PackId,
    pub path: Utf8PathBuf,
    pub description: String,
    pub components: Vec<Component>,
    pub apis: Vec<Api>,
    pub devices: Vec<Device>,
    pub boards: Vec<Board>,
    pub conditions: IndexMap<String, Condition>,
}

impl Pack {
    pub fn condition(&self, id: &str) -> Option<&Condition> {
        self.conditions.get(id)
    }
}

/// A selectable component carried by a pack
#[derive(Debug, Clone)]
pub struct Component {
    pub id: ComponentId,
    pub condition: Option<String>,
    pub api_version: Option<Version>,
    pub max_instances: u32,
    pub description: String,
}

impl Component {
    /// Key shared with the API this component implements
    pub fn api_key(&self) -> String {
        format!("{}:{}", self.id.class, self.id.group)
    }
}

/// An interface definition implemented by components of its class/group
#[derive(Debug, Clone)]
pub struct Api {
    pub class: String,
    pub group: String,
    pub version: Version,
    pub exclusive: bool,
    pub condition: Option<String>,
}

impl Api {
    pub fn key(&self) -> String {
        format!("{}:{}", self.class, self.group)
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}(API)@{}", self.class, self.group, self.version)
    }
}

/// A device definition with one attribute set per processor
#[derive(Debug, Clone)]
pub struct Device {
    pub vendor: String,
    pub name: String,
    pub family: Option<String>,
    pub processors: Vec<Processor>,
    pub variants: Vec<String>,
}

impl Device {
    /// `Vendor::Name`
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.vendor, self.name)
    }

    pub fn processor_names(&self) -> Vec<&str> {
        self.processors
            .iter()
            .filter_map(|p| p.pname.as_deref())
            .collect()
    }

    /// The processor for `pname`, or the only processor when none is asked
    pub fn processor(&self, pname: Option<&str>) -> Option<&Processor> {
        match pname {
            Some(pname) => self
                .processors
                .iter()
                .find(|p| p.pname.as_deref() == Some(pname)),
            None if self.processors.len() == 1 => self.processors.first(),
            None => None,
        }
    }

    /// True when `spec` names this device (vendor and pname unchecked
    /// here; the resolver reports those separately)
    pub fn matches_name(&self, spec: &DeviceSpec) -> bool {
        if spec.name.is_empty() {
            return false;
        }
        if let Some(vendor) = &spec.vendor {
            if vendor != &self.vendor {
                return false;
            }
        }
        spec.name == self.name
    }
}

/// Per-processor target attributes
#[derive(Debug, Clone, Default)]
pub struct Processor {
    pub pname: Option<String>,
    pub core: String,
    pub core_version: Option<String>,
    pub clock: Option<String>,
    pub fpu: Option<String>,
    pub mpu: Option<String>,
    pub dsp: Option<String>,
    pub mve: Option<String>,
    pub endian: Option<String>,
    pub secure: Option<String>,
    pub branch_prot: Option<String>,
}

impl Processor {
    /// The processor's attribute bag, conventional key names
    pub fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        let push = |attrs: &mut Attributes, key: &str, value: &Option<String>| {
            if let Some(value) = value {
                attrs.set(key, value.clone());
            }
        };
        if !self.core.is_empty() {
            attrs.set(keys::DCORE, self.core.clone());
        }
        push(&mut attrs, keys::DCORE_VERSION, &self.core_version);
        push(&mut attrs, keys::DCLOCK, &self.clock);
        push(&mut attrs, keys::DFPU, &self.fpu);
        push(&mut attrs, keys::DMPU, &self.mpu);
        push(&mut attrs, keys::DDSP, &self.dsp);
        push(&mut attrs, keys::DMVE, &self.mve);
        push(&mut attrs, keys::DENDIAN, &self.endian);
        push(&mut attrs, keys::DSECURE, &self.secure);
        push(&mut attrs, keys::DBRANCHPROT, &self.branch_prot);
        push(&mut attrs, keys::PNAME, &self.pname);
        attrs
    }

    /// True when the processor declares support for `value` of the
    /// user-selectable attribute `key`
    pub fn supports(&self, key: &str, value: &str) -> bool {
        let declared = match key {
            k if k == keys::DFPU => &self.fpu,
            k if k == keys::DDSP => &self.dsp,
            k if k == keys::DMVE => &self.mve,
            k if k == keys::DENDIAN => &self.endian,
            k if k == keys::DSECURE => &self.secure,
            k if k == keys::DBRANCHPROT => &self.branch_prot,
            _ => return true,
        };
        match declared.as_deref() {
            // an undeclared capability accepts only disabling values
            None => matches!(value, "NO_FPU" | "NO_DSP" | "NO_MVE" | "Non-secure"),
            Some(declared) if declared == cinder_core::types::CONFIGURABLE => true,
            Some(declared) => declared == value,
        }
    }
}

/// A board definition with its mounted devices
#[derive(Debug, Clone)]
pub struct Board {
    pub vendor: String,
    pub name: String,
    pub revision: Option<String>,
    pub mounted_devices: Vec<DeviceSpec>,
}

impl Board {
    /// `Vendor::Name[:Revision]`
    pub fn full_id(&self) -> String {
        match &self.revision {
            Some(revision) => format!("{}::{}:{}", self.vendor, self.name, revision),
            None => format!("{}::{}", self.vendor, self.name),
        }
    }

    /// True when `spec` names this board; empty spec fields match anything
    pub fn matches_spec(&self, spec: &BoardSpec) -> bool {
        if spec.name.is_empty() || spec.name != self.name {
            return false;
        }
        if let Some(vendor) = &spec.vendor {
            if vendor != &self.vendor {
                return false;
            }
        }
        if let Some(revision) = &spec.revision {
            if Some(revision.as_str()) != self.revision.as_deref() {
                return false;
            }
        }
        true
    }
}

/// Rule polarity inside a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Require,
    Accept,
    Deny,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Require => f.write_str("require"),
            Self::Accept => f.write_str("accept"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

/// One rule of a condition: a sub-condition reference or a leaf
/// expression over component (`C*`) or target (`D*`/`T*`) attributes
#[derive(Debug, Clone)]
pub struct ConditionRule {
    pub kind: RuleKind,
    pub condition: Option<String>,
    pub attrs: Attributes,
}

impl ConditionRule {
    /// True when the leaf constrains components rather than the target
    pub fn is_component_expression(&self) -> bool {
        self.condition.is_none() && self.attrs.iter().any(|(k, _)| k.starts_with('C'))
    }

    /// The literal expression text used in dependency reports
    pub fn expression(&self) -> String {
        if let Some(condition) = &self.condition {
            return format!("{} {}", self.kind, condition);
        }
        if self.is_component_expression() {
            let mut target = String::new();
            if let Some(vendor) = self.attrs.get("Cvendor") {
                target.push_str(vendor);
                target.push_str("::");
            }
            target.push_str(self.attrs.get_or_empty("Cclass"));
            if let Some(bundle) = self.attrs.get("Cbundle") {
                target.push('&');
                target.push_str(bundle);
            }
            target.push(':');
            target.push_str(self.attrs.get_or_empty("Cgroup"));
            if let Some(sub) = self.attrs.get("Csub") {
                target.push(':');
                target.push_str(sub);
            }
            if let Some(variant) = self.attrs.get("Cvariant") {
                target.push('&');
                target.push_str(variant);
            }
            if let Some(version) = self.attrs.get("Cversion") {
                target.push('@');
                target.push_str(version);
            }
            format!("{} {}", self.kind, target)
        } else {
            let pairs: Vec<String> = self
                .attrs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            format!("{} {}", self.kind, pairs.join(" "))
        }
    }
}

/// A named condition: the conjunction/disjunction structure lives in the
/// rule kinds, evaluation in the resolver
#[derive(Debug, Clone)]
pub struct Condition {
    pub id: String,
    pub rules: Vec<ConditionRule>,
}

impl Condition {
    /// Ids of conditions this one references
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|r| r.condition.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Serde layer: the literal shape of pack.toml
// ---------------------------------------------------------------------------

/// Parsed `pack.toml` before normalization
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackManifest {
    pub pack: PackInfo,
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentDef>,
    #[serde(default, rename = "api")]
    pub apis: Vec<ApiDef>,
    #[serde(default, rename = "bundle")]
    pub bundles: Vec<BundleDef>,
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceDef>,
    #[serde(default, rename = "board")]
    pub boards: Vec<BoardDef>,
    #[serde(default, rename = "condition")]
    pub conditions: Vec<ConditionDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackInfo {
    pub vendor: String,
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComponentDef {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    pub group: String,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub bundle: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub api_version: Option<Version>,
    #[serde(default = "default_max_instances")]
    pub max_instances: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiDef {
    pub class: String,
    pub group: String,
    pub version: Version,
    #[serde(default = "default_true")]
    pub exclusive: bool,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BundleDef {
    pub class: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceDef {
    #[serde(default)]
    pub vendor: Option<String>,
    pub name: String,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default, rename = "processor")]
    pub processors: Vec<ProcessorDef>,
    #[serde(default)]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProcessorDef {
    #[serde(default)]
    pub pname: Option<String>,
    #[serde(default)]
    pub core: String,
    #[serde(default)]
    pub core_version: Option<String>,
    #[serde(default)]
    pub clock: Option<String>,
    #[serde(default)]
    pub fpu: Option<String>,
    #[serde(default)]
    pub mpu: Option<String>,
    #[serde(default)]
    pub dsp: Option<String>,
    #[serde(default)]
    pub mve: Option<String>,
    #[serde(default)]
    pub endian: Option<String>,
    #[serde(default)]
    pub secure: Option<String>,
    #[serde(default)]
    pub branch_prot: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BoardDef {
    #[serde(default)]
    pub vendor: Option<String>,
    pub name: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub mounted_devices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConditionDef {
    pub id: String,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleDef {
    pub kind: RuleKind,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub attrs: Attributes,
}

fn default_max_instances() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl PackManifest {
    /// Normalize into the runtime model: vendor defaulting, bundle
    /// attribute inheritance, condition registration
    pub fn into_pack(self, path: Utf8PathBuf) -> RegistryResult<Pack> {
        let id = PackId::new(
            self.pack.vendor.clone(),
            self.pack.name.clone(),
            self.pack.version.clone(),
        );

        let mut components = Vec::new();
        for def in &self.components {
            let component =
                normalize_component(def, &id, None, None).map_err(|reason| {
                    RegistryError::Invalid {
                        path: path.clone(),
                        reason,
                    }
                })?;
            components.push(component);
        }
        for bundle in &self.bundles {
            for def in &bundle.components {
                let component = normalize_component(def, &id, Some(bundle), bundle.version.as_ref())
                    .map_err(|reason| RegistryError::Invalid {
                        path: path.clone(),
                        reason,
                    })?;
                components.push(component);
            }
        }

        let apis = self
            .apis
            .into_iter()
            .map(|def| Api {
                class: def.class,
                group: def.group,
                version: def.version,
                exclusive: def.exclusive,
                condition: def.condition,
            })
            .collect();

        let devices = self
            .devices
            .into_iter()
            .map(|def| Device {
                vendor: def.vendor.unwrap_or_else(|| id.vendor.clone()),
                name: def.name,
                family: def.family,
                processors: def.processors.into_iter().map(normalize_processor).collect(),
                variants: def.variants,
            })
            .collect();

        let boards = self
            .boards
            .into_iter()
            .map(|def| Board {
                vendor: def.vendor.unwrap_or_else(|| id.vendor.clone()),
                name: def.name,
                revision: def.revision,
                mounted_devices: def
                    .mounted_devices
                    .iter()
                    .map(|text| DeviceSpec::parse(text))
                    .collect(),
            })
            .collect();

        let mut conditions = IndexMap::new();
        for def in self.conditions {
            let condition = Condition {
                id: def.id.clone(),
                rules: def
                    .rules
                    .into_iter()
                    .map(|rule| ConditionRule {
                        kind: rule.kind,
                        condition: rule.condition,
                        attrs: rule.attrs,
                    })
                    .collect(),
            };
            if conditions.insert(def.id.clone(), condition).is_some() {
                return Err(RegistryError::Invalid {
                    path,
                    reason: format!("duplicate condition id '{}'", def.id),
                });
            }
        }

        Ok(Pack {
            id,
            path,
            description: self.pack.description,
            components,
            apis,
            devices,
            boards,
            conditions,
        })
    }
}

fn normalize_processor(def: ProcessorDef) -> Processor {
    Processor {
        pname: def.pname,
        core: def.core,
        core_version: def.core_version,
        clock: def.clock,
        fpu: def.fpu,
        mpu: def.mpu,
        dsp: def.dsp,
        mve: def.mve,
        endian: def.endian,
        secure: def.secure,
        branch_prot: def.branch_prot,
    }
}

fn normalize_component(
    def: &ComponentDef,
    pack: &PackId,
    bundle: Option<&BundleDef>,
    bundle_version: Option<&Version>,
) -> Result<Component, String> {
    let class = match (&def.class, bundle) {
        (Some(class), _) => class.clone(),
        (None, Some(bundle)) => bundle.class.clone(),
        (None, None) => {
            return Err(format!("component group '{}' is missing a class", def.group))
        }
    };
    let version = match (&def.version, bundle_version) {
        (Some(version), _) => version.clone(),
        (None, Some(version)) => version.clone(),
        (None, None) => {
            return Err(format!(
                "component '{}:{}' is missing a version",
                class, def.group
            ))
        }
    };
    let id = ComponentId {
        vendor: def.vendor.clone().unwrap_or_else(|| pack.vendor.clone()),
        class,
        bundle: def
            .bundle
            .clone()
            .or_else(|| bundle.map(|b| b.name.clone())),
        group: def.group.clone(),
        sub: def.sub.clone(),
        variant: def.variant.clone(),
        version,
    };
    Ok(Component {
        id,
        condition: def.condition.clone(),
        api_version: def.api_version.clone(),
        max_instances: def.max_instances,
        description: def.description.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
        [pack]
        vendor = "ARM"
        name = "RteTest_DFP"
        version = "0.2.0"
        description = "Test device family pack"

        [[component]]
        class = "RteTest"
        group = "CORE"
        version = "0.1.1"
        condition = "Core Condition"

        [[api]]
        class = "RteTest"
        group = "ApiExclusive"
        version = "1.0.0"

        [[bundle]]
        class = "Device"
        name = "RteTest Startup"
        version = "2.0.3"

        [[bundle.component]]
        group = "Startup"
        variant = "RteTest Startup"

        [[device]]
        name = "RteTest_ARMCM0"

        [[device.processor]]
        core = "Cortex-M0"
        clock = "10000000"
        fpu = "NO_FPU"
        endian = "Little-endian"

        [[board]]
        vendor = "Keil"
        name = "RteTest board test revision"
        revision = "Rev1"
        mounted-devices = ["RteTest_ARMCM0"]

        [[condition]]
        id = "Core Condition"

        [[condition.rule]]
        kind = "require"

        [condition.rule.attrs]
        Cclass = "RteTest"
        Cgroup = "CORE"
    "#;

    fn load() -> Pack {
        let manifest: PackManifest = toml::from_str(MANIFEST).unwrap();
        manifest.into_pack("packs/ARM/RteTest_DFP/0.2.0/pack.toml".into()).unwrap()
    }

    #[test]
    fn test_pack_identity() {
        let pack = load();
        assert_eq!(pack.id.to_string(), "ARM::RteTest_DFP@0.2.0");
        assert_eq!(pack.description, "Test device family pack");
    }

    #[test]
    fn test_component_vendor_defaults_to_pack_vendor() {
        let pack = load();
        let core = &pack.components[0];
        assert_eq!(core.id.to_string(), "ARM::RteTest:CORE@0.1.1");
        assert_eq!(core.condition.as_deref(), Some("Core Condition"));
        assert_eq!(core.max_instances, 1);
    }

    #[test]
    fn test_bundle_members_inherit_class_bundle_and_version() {
        let pack = load();
        let startup = &pack.components[1];
        assert_eq!(
            startup.id.to_string(),
            "ARM::Device&RteTest Startup:Startup&RteTest Startup@2.0.3"
        );
        assert_eq!(startup.id.bundle.as_deref(), Some("RteTest Startup"));
    }

    #[test]
    fn test_api_is_exclusive_by_default() {
        let pack = load();
        assert!(pack.apis[0].exclusive);
        assert_eq!(pack.apis[0].to_string(), "RteTest:ApiExclusive(API)@1.0.0");
    }

    #[test]
    fn test_device_and_board_normalization() {
        let pack = load();
        let device = &pack.devices[0];
        assert_eq!(device.full_name(), "ARM::RteTest_ARMCM0");
        let attrs = device.processors[0].attributes();
        assert_eq!(attrs.get("Dcore"), Some("Cortex-M0"));
        assert_eq!(attrs.get("Dclock"), Some("10000000"));

        let board = &pack.boards[0];
        assert_eq!(board.full_id(), "Keil::RteTest board test revision:Rev1");
        assert_eq!(board.mounted_devices[0].name, "RteTest_ARMCM0");
    }

    #[test]
    fn test_board_spec_matching_is_exact() {
        let pack = load();
        let board = &pack.boards[0];
        assert!(board.matches_spec(&BoardSpec::parse("RteTest board test revision")));
        assert!(board.matches_spec(&BoardSpec::parse(
            "Keil::RteTest board test revision:Rev1"
        )));
        assert!(!board.matches_spec(&BoardSpec::parse(
            "Keil::RteTest board test revision:Rev10"
        )));
        assert!(!board.matches_spec(&BoardSpec::parse("RteTest board")));
    }

    #[test]
    fn test_condition_expression_rendering() {
        let pack = load();
        let condition = pack.condition("Core Condition").unwrap();
        assert_eq!(condition.rules[0].expression(), "require RteTest:CORE");
    }

    #[test]
    fn test_duplicate_condition_id_is_invalid() {
        let text = r#"
            [pack]
            vendor = "ARM"
            name = "P"
            version = "1.0.0"

            [[condition]]
            id = "Same"

            [[condition]]
            id = "Same"
        "#;
        let manifest: PackManifest = toml::from_str(text).unwrap();
        let err = manifest.into_pack("pack.toml".into()).unwrap_err();
        assert!(err.to_string().contains("duplicate condition id 'Same'"));
    }

    #[test]
    fn test_component_without_version_is_invalid() {
        let text = r#"
            [pack]
            vendor = "ARM"
            name = "P"
            version = "1.0.0"

            [[component]]
            class = "RteTest"
            group = "CORE"
        "#;
        let manifest: PackManifest = toml::from_str(text).unwrap();
        let err = manifest.into_pack("pack.toml".into()).unwrap_err();
        assert!(err.to_string().contains("missing a version"));
    }

    #[test]
    fn test_processor_capability_check() {
        let processor = Processor {
            fpu: Some("SP_FPU".to_string()),
            endian: Some(cinder_core::types::CONFIGURABLE.to_string()),
            ..Processor::default()
        };
        assert!(processor.supports(keys::DFPU, "SP_FPU"));
        assert!(!processor.supports(keys::DFPU, "DP_FPU"));
        assert!(processor.supports(keys::DENDIAN, "Big-endian"));

        let bare = Processor::default();
        assert!(bare.supports(keys::DFPU, "NO_FPU"));
        assert!(!bare.supports(keys::DFPU, "SP_FPU"));
    }
}
