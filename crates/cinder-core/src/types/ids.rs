//! Identifier types and their grammar.
//!
//! The delimiter grammar is shared by every identifier class:
//! `::` separates vendor from name, `&` introduces bundle and variant
//! segments, `:` separates class/group/sub fields, and `@` attaches a
//! version or version constraint.
//!
//! - pack: `Vendor::Name@1.2.3`
//! - component: `Vendor::Class&Bundle:Group:Sub&Variant@1.2.3`
//! - device: `Vendor::Name:Pname`
//! - board: `Vendor::Name:Revision`

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::version::{Version, VersionMatch};
use crate::utils::wildcard;

/// Fully qualified identity of an installed pack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackId {
    pub vendor: String,
    pub name: String,
    pub version: Version,
}

impl PackId {
    pub fn new(vendor: impl Into<String>, name: impl Into<String>, version: Version) -> Self {
        Self {
            vendor: vendor.into(),
            name: name.into(),
            version,
        }
    }

    /// The per-(vendor, name) key used for duplicate collapsing and
    /// latest-version selection
    pub fn pack_key(&self) -> String {
        format!("{}::{}", self.vendor, self.name)
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}@{}", self.vendor, self.name, self.version)
    }
}

impl FromStr for PackId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ident, version) = s
            .split_once('@')
            .ok_or_else(|| CoreError::identifier_syntax(s, "missing '@version'"))?;
        let (vendor, name) = ident
            .split_once("::")
            .ok_or_else(|| CoreError::identifier_syntax(s, "missing 'Vendor::' prefix"))?;
        if vendor.is_empty() || name.is_empty() {
            return Err(CoreError::identifier_syntax(s, "empty vendor or name"));
        }
        Ok(Self {
            vendor: vendor.to_string(),
            name: name.to_string(),
            version: version.parse()?,
        })
    }
}

/// A pack requirement as declared in a solution file.
///
/// `ARM::RteTest_DFP@>=0.1.1`, `ARM::*Gen*`, a bare `ARM` (every pack of
/// that vendor), or `*`. Equality and hashing consider only
/// (vendor, name, constraint) so textual duplicates collapse; the origin
/// records the declaring file for diagnostics.
#[derive(Debug, Clone)]
pub struct PackRequirement {
    raw: String,
    pub vendor: Option<String>,
    pub name: Option<String>,
    pub version: VersionMatch,
    pub origin: Option<Utf8PathBuf>,
}

impl PackRequirement {
    /// Parse a requirement string
    pub fn parse(text: &str) -> CoreResult<Self> {
        let (ident, constraint) = match text.split_once('@') {
            Some((ident, constraint)) => (ident, Some(constraint)),
            None => (text, None),
        };
        if ident.is_empty() {
            return Err(CoreError::identifier_syntax(text, "empty pack identifier"));
        }
        let (vendor, name) = match ident.split_once("::") {
            Some((vendor, name)) => (non_empty(vendor), non_empty(name)),
            // a bare token filters by vendor
            None => (Some(ident.to_string()), None),
        };
        let version = match constraint {
            Some(constraint) => VersionMatch::parse(constraint)?,
            None => VersionMatch::Any,
        };
        Ok(Self {
            raw: text.to_string(),
            vendor,
            name,
            version,
            origin: None,
        })
    }

    /// Attach the declaring file
    pub fn with_origin(mut self, origin: impl Into<Utf8PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The requirement exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when vendor or name carries `*`/`?` or the name is open
    pub fn is_filter(&self) -> bool {
        self.name.is_none()
            || self
                .name
                .as_deref()
                .is_some_and(wildcard::has_wildcards)
            || self
                .vendor
                .as_deref()
                .is_some_and(wildcard::has_wildcards)
    }

    /// True when `id` satisfies vendor, name, and version constraint
    pub fn matches(&self, id: &PackId) -> bool {
        if let Some(vendor) = &self.vendor {
            if !wildcard::matches(vendor, &id.vendor) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !wildcard::matches(name, &id.name) {
                return false;
            }
        }
        self.version.matches(&id.version)
    }
}

impl fmt::Display for PackRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for PackRequirement {
    fn eq(&self, other: &Self) -> bool {
        self.vendor == other.vendor && self.name == other.name && self.version == other.version
    }
}

impl Eq for PackRequirement {}

impl std::hash::Hash for PackRequirement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.vendor.hash(state);
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl FromStr for PackRequirement {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A component identifier as requested by a project.
///
/// Optional fields widen the match; the resolver narrows the surviving
/// candidates by precedence. An explicitly written empty variant
/// (`...Group&`) pins to variant-less components, while an absent variant
/// leaves the choice to the class default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentQuery {
    raw: String,
    pub vendor: Option<String>,
    pub class: String,
    pub bundle: Option<String>,
    pub group: String,
    pub sub: Option<String>,
    pub variant: Option<String>,
    pub version: VersionMatch,
}

impl ComponentQuery {
    /// Parse `[Vendor::]Class[&Bundle]:Group[:Sub][&Variant][@Constraint]`
    pub fn parse(text: &str) -> CoreResult<Self> {
        let (ident, constraint) = match text.split_once('@') {
            Some((ident, constraint)) => (ident, Some(constraint)),
            None => (text, None),
        };
        let (vendor, rest) = match ident.split_once("::") {
            Some((vendor, rest)) => (non_empty(vendor), rest),
            None => (None, ident),
        };
        let segments: Vec<&str> = rest.split(':').collect();
        if segments.len() < 2 || segments.len() > 3 {
            return Err(CoreError::identifier_syntax(
                text,
                "expected 'Class:Group' or 'Class:Group:Sub'",
            ));
        }
        let (class, bundle) = match segments[0].split_once('&') {
            Some((class, bundle)) => (class, Some(bundle.to_string())),
            None => (segments[0], None),
        };
        if class.is_empty() {
            return Err(CoreError::identifier_syntax(text, "empty component class"));
        }
        // the variant suffix binds to the last segment
        let (last, variant) = match segments[segments.len() - 1].split_once('&') {
            Some((last, variant)) => (last, Some(variant.to_string())),
            None => (segments[segments.len() - 1], None),
        };
        let (group, sub) = if segments.len() == 3 {
            (segments[1], Some(last.to_string()))
        } else {
            (last, None)
        };
        if group.is_empty() {
            return Err(CoreError::identifier_syntax(text, "empty component group"));
        }
        let version = match constraint {
            Some(constraint) => VersionMatch::parse(constraint)?,
            None => VersionMatch::Any,
        };
        Ok(Self {
            raw: text.to_string(),
            vendor,
            class: class.to_string(),
            bundle,
            group: group.to_string(),
            sub,
            variant,
            version,
        })
    }

    /// The identifier exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when `id` satisfies every field this query specifies
    pub fn matches_id(&self, id: &ComponentId) -> bool {
        if let Some(vendor) = &self.vendor {
            if vendor != &id.vendor {
                return false;
            }
        }
        if self.class != id.class || self.group != id.group {
            return false;
        }
        if !optional_field_matches(&self.bundle, id.bundle.as_deref()) {
            return false;
        }
        if !optional_field_matches(&self.sub, id.sub.as_deref()) {
            return false;
        }
        if !optional_field_matches(&self.variant, id.variant.as_deref()) {
            return false;
        }
        self.version.matches(&id.version)
    }
}

impl fmt::Display for ComponentQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ComponentQuery {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// When a query specifies an optional field, an empty specification only
/// matches components that leave the field empty too.
fn optional_field_matches(wanted: &Option<String>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(w) if w.is_empty() => actual.map_or(true, str::is_empty),
        Some(w) => actual == Some(w.as_str()),
    }
}

/// Fully qualified identity of a resolved component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId {
    pub vendor: String,
    pub class: String,
    pub bundle: Option<String>,
    pub group: String,
    pub sub: Option<String>,
    pub variant: Option<String>,
    pub version: Version,
}

impl ComponentId {
    /// Identity without version and variant; all versions and variants of
    /// one component share an aggregate id
    pub fn aggregate_id(&self) -> String {
        let mut out = format!("{}::{}", self.vendor, self.class);
        if let Some(bundle) = non_empty_ref(&self.bundle) {
            out.push('&');
            out.push_str(bundle);
        }
        out.push(':');
        out.push_str(&self.group);
        if let Some(sub) = non_empty_ref(&self.sub) {
            out.push(':');
            out.push_str(sub);
        }
        out
    }

    /// True when `text` is this id written out fully, tolerating an
    /// omitted vendor or bundle segment
    pub fn matches_exact_text(&self, text: &str) -> bool {
        self.display_forms().iter().any(|form| form == text)
    }

    fn display_forms(&self) -> [String; 4] {
        let full = self.to_string();
        let without_vendor = full
            .split_once("::")
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_else(|| full.clone());
        // the first '&' always introduces the bundle segment, which runs
        // to the next ':'
        let strip_bundle = |form: &str| match form.split_once('&') {
            Some((head, tail)) => match tail.split_once(':') {
                Some((_, rest)) => format!("{head}:{rest}"),
                None => form.to_string(),
            },
            None => form.to_string(),
        };
        let without_bundle = if self.bundle.is_some() {
            strip_bundle(&full)
        } else {
            full.clone()
        };
        let without_both = if self.bundle.is_some() {
            strip_bundle(&without_vendor)
        } else {
            without_vendor.clone()
        };
        [full, without_vendor, without_bundle, without_both]
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.vendor, self.class)?;
        if let Some(bundle) = non_empty_ref(&self.bundle) {
            write!(f, "&{bundle}")?;
        }
        write!(f, ":{}", self.group)?;
        if let Some(sub) = non_empty_ref(&self.sub) {
            write!(f, ":{sub}")?;
        }
        if let Some(variant) = non_empty_ref(&self.variant) {
            write!(f, "&{variant}")?;
        }
        write!(f, "@{}", self.version)
    }
}

/// A device reference: `[Vendor::]Name[:Pname]`.
///
/// Partial forms (empty name, lone `:Pname`) are legal inputs to the
/// precedence merge and only become errors if still incomplete after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub vendor: Option<String>,
    pub name: String,
    pub pname: Option<String>,
}

impl DeviceSpec {
    pub fn parse(text: &str) -> Self {
        let (vendor, rest) = match text.split_once("::") {
            Some((vendor, rest)) => (non_empty(vendor), rest),
            None => (None, text),
        };
        let (name, pname) = match rest.split_once(':') {
            Some((name, pname)) => (name, non_empty(pname)),
            None => (rest, None),
        };
        Self {
            vendor,
            name: name.to_string(),
            pname,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vendor.is_none() && self.name.is_empty() && self.pname.is_none()
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(vendor) = &self.vendor {
            write!(f, "{vendor}::")?;
        }
        f.write_str(&self.name)?;
        if let Some(pname) = &self.pname {
            write!(f, ":{pname}")?;
        }
        Ok(())
    }
}

/// A board reference: `[Vendor::]Name[:Revision]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardSpec {
    pub vendor: Option<String>,
    pub name: String,
    pub revision: Option<String>,
}

impl BoardSpec {
    pub fn parse(text: &str) -> Self {
        let (vendor, rest) = match text.split_once("::") {
            Some((vendor, rest)) => (non_empty(vendor), rest),
            None => (None, text),
        };
        let (name, revision) = match rest.split_once(':') {
            Some((name, revision)) => (name, non_empty(revision)),
            None => (rest, None),
        };
        Self {
            vendor,
            name: name.to_string(),
            revision,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vendor.is_none() && self.name.is_empty() && self.revision.is_none()
    }
}

impl fmt::Display for BoardSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(vendor) = &self.vendor {
            write!(f, "{vendor}::")?;
        }
        f.write_str(&self.name)?;
        if let Some(revision) = &self.revision {
            write!(f, ":{revision}")?;
        }
        Ok(())
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn non_empty_ref(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
