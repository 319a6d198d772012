//! Version parsing, ordering, and constraint matching.
//!
//! Pack and component versions are a numeric triple plus an optional
//! release tag (`1.2.3-rc1`). Missing numeric fields parse as zero, so
//! `1.2` and `1.2.0` are the same version. Release tags order naturally
//! (`rc10` above `rc2`, case-insensitive) and a version without a release
//! tag orders above every version that has one at the same triple.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, CoreResult};
use crate::utils::alnum;

/// A pack or component version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub release: Option<String>,
}

impl Version {
    /// Create a version from its numeric fields
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            release: None,
        }
    }

    /// Attach a release tag
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (numeric, release) = match s.split_once('-') {
            Some((n, r)) => (n, Some(r)),
            None => (s, None),
        };
        if numeric.is_empty() {
            return Err(CoreError::version_syntax(s, "empty numeric part"));
        }
        let mut fields = [0u64; 3];
        let mut count = 0;
        for segment in numeric.split('.') {
            if count == 3 {
                return Err(CoreError::version_syntax(s, "more than three numeric fields"));
            }
            fields[count] = segment
                .parse()
                .map_err(|_| CoreError::version_syntax(s, "numeric field expected"))?;
            count += 1;
        }
        let release = match release {
            Some("") => return Err(CoreError::version_syntax(s, "empty release tag")),
            Some(r) => Some(r.to_string()),
            None => None,
        };
        Ok(Self {
            major: fields[0],
            minor: fields[1],
            patch: fields[2],
            release,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(release) = &self.release {
            write!(f, "-{release}")?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.release, &other.release) {
                (None, None) => Ordering::Equal,
                // a bare version is newer than any of its pre-releases
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => alnum::compare_ci(a, b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Version constraint attached to an identifier after `@`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum VersionMatch {
    /// No constraint; selection prefers the highest version
    #[default]
    Any,
    /// `@V` - exact version
    Exact(Version),
    /// `@>=V` - minimum version, prefer highest
    AtLeast(Version),
    /// `@V1:V2` - inclusive range
    Range(Version, Version),
    /// `@^V` - at least V, same major component
    Compatible(Version),
}

impl VersionMatch {
    /// Parse the constraint text following `@` in an identifier
    pub fn parse(text: &str) -> CoreResult<Self> {
        if text.is_empty() {
            return Err(CoreError::version_syntax(text, "empty version constraint"));
        }
        if let Some(min) = text.strip_prefix(">=") {
            return Ok(Self::AtLeast(min.parse()?));
        }
        if let Some(base) = text.strip_prefix('^') {
            return Ok(Self::Compatible(base.parse()?));
        }
        if let Some((lo, hi)) = text.split_once(':') {
            let lo: Version = lo.parse()?;
            let hi: Version = hi.parse()?;
            if lo > hi {
                return Err(CoreError::version_syntax(
                    text,
                    "range lower bound exceeds upper bound",
                ));
            }
            return Ok(Self::Range(lo, hi));
        }
        Ok(Self::Exact(text.parse()?))
    }

    /// True when `version` satisfies this constraint
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => version == expected,
            Self::AtLeast(min) => version >= min,
            Self::Range(lo, hi) => version >= lo && version <= hi,
            Self::Compatible(base) => version >= base && version.major == base.major,
        }
    }

    /// True when no constraint was given
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// True when selection should take the highest satisfying version
    pub fn prefers_highest(&self) -> bool {
        !matches!(self, Self::Exact(_))
    }
}

impl fmt::Display for VersionMatch {
    /// Renders the full `@...` suffix; [`VersionMatch::Any`] renders empty
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => Ok(()),
            Self::Exact(v) => write!(f, "@{v}"),
            Self::AtLeast(v) => write!(f, "@>={v}"),
            Self::Range(lo, hi) => write!(f, "@{lo}:{hi}"),
            Self::Compatible(v) => write!(f, "@^{v}"),
        }
    }
}
