//! Multi-level setting precedence
//!
//! Device, board and compiler values may appear at solution, target-type
//! and project level. Collection merges them field-wise: a field given at
//! one level completes fields missing at another (":cm0_core1" completes
//! "ARM::RteTest_ARMCM0_Dual"), while two different non-empty values for
//! the same field are a redefinition error naming both levels.

use cinder_core::{BoardSpec, CoreError, DeviceSpec, Version};
use std::fmt;

use crate::ConfigResult;

/// One value for a precedence-merged setting, tagged with its level
/// ("solution", "target-type 'CM0'", "project 'core'")
#[derive(Debug, Clone, Copy)]
pub struct Leveled<'a> {
    pub value: &'a str,
    pub level: &'a str,
}

impl<'a> Leveled<'a> {
    pub fn new(value: &'a str, level: &'a str) -> Self {
        Self { value, level }
    }
}

/// A selected toolchain, split from its `Name@Version` spelling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainItem {
    pub name: String,
    pub version: Version,
}

impl ToolchainItem {
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let (name, version) = split_compiler(text)?;
        Ok(Self {
            name: name.to_string(),
            version: version.unwrap_or_else(|| Version::new(0, 0, 0)),
        })
    }
}

impl fmt::Display for ToolchainItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

fn split_compiler(text: &str) -> ConfigResult<(&str, Option<Version>)> {
    let (name, version) = match text.split_once('@') {
        Some((name, version)) => (name, Some(version.parse::<Version>()?)),
        None => (text, None),
    };
    if name.is_empty() {
        return Err(CoreError::identifier_syntax(text, "empty compiler name").into());
    }
    Ok((name, version))
}

/// Merge device selections from outermost to innermost level
pub fn collect_device(values: &[Leveled<'_>]) -> ConfigResult<DeviceSpec> {
    let mut merged = Merger::new("device", 3);
    for leveled in values {
        if leveled.value.is_empty() {
            continue;
        }
        let spec = DeviceSpec::parse(leveled.value);
        merged.offer(0, spec.vendor.as_deref(), leveled)?;
        merged.offer(1, non_empty(&spec.name), leveled)?;
        merged.offer(2, spec.pname.as_deref(), leveled)?;
    }
    let mut slots = merged.finish();
    Ok(DeviceSpec {
        vendor: slots[0].take(),
        name: slots[1].take().unwrap_or_default(),
        pname: slots[2].take(),
    })
}

/// Merge board selections from outermost to innermost level
pub fn collect_board(values: &[Leveled<'_>]) -> ConfigResult<BoardSpec> {
    let mut merged = Merger::new("board", 3);
    for leveled in values {
        if leveled.value.is_empty() {
            continue;
        }
        let spec = BoardSpec::parse(leveled.value);
        merged.offer(0, spec.vendor.as_deref(), leveled)?;
        merged.offer(1, non_empty(&spec.name), leveled)?;
        merged.offer(2, spec.revision.as_deref(), leveled)?;
    }
    let mut slots = merged.finish();
    Ok(BoardSpec {
        vendor: slots[0].take(),
        name: slots[1].take().unwrap_or_default(),
        revision: slots[2].take(),
    })
}

/// Merge compiler selections from outermost to innermost level.
///
/// A version given without a name at one level completes a bare name at
/// another; the version defaults to `0.0.0` when never given.
pub fn collect_compiler(values: &[Leveled<'_>]) -> ConfigResult<Option<ToolchainItem>> {
    let mut merged = Merger::new("compiler", 2);
    for leveled in values {
        if leveled.value.is_empty() {
            continue;
        }
        let (name, version) = split_compiler(leveled.value)?;
        let version = version.map(|v| v.to_string());
        merged.offer(0, non_empty(name), leveled)?;
        merged.offer(1, version.as_deref(), leveled)?;
    }
    let mut slots = merged.finish();
    let name = match slots[0].take() {
        Some(name) => name,
        None => return Ok(None),
    };
    let version = match slots[1].take() {
        Some(text) => text.parse()?,
        None => Version::new(0, 0, 0),
    };
    Ok(Some(ToolchainItem { name, version }))
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Field-wise accumulator; remembers which level first set each field so
/// conflicts can name both sides
struct Merger {
    key: &'static str,
    slots: Vec<Option<Slot>>,
}

struct Slot {
    value: String,
    raw: String,
    level: String,
}

impl Merger {
    fn new(key: &'static str, fields: usize) -> Self {
        Self {
            key,
            slots: (0..fields).map(|_| None).collect(),
        }
    }

    fn offer(
        &mut self,
        index: usize,
        incoming: Option<&str>,
        owner: &Leveled<'_>,
    ) -> ConfigResult<()> {
        let incoming = match incoming {
            Some(incoming) => incoming,
            None => return Ok(()),
        };
        match &self.slots[index] {
            Some(slot) if slot.value == incoming => Ok(()),
            Some(slot) => Err(CoreError::Redefinition {
                key: self.key.to_string(),
                existing: slot.raw.clone(),
                existing_source: slot.level.clone(),
                incoming: owner.value.to_string(),
                incoming_source: owner.level.to_string(),
            }
            .into()),
            None => {
                self.slots[index] = Some(Slot {
                    value: incoming.to_string(),
                    raw: owner.value.to_string(),
                    level: owner.level.to_string(),
                });
                Ok(())
            }
        }
    }

    fn finish(self) -> Vec<Option<String>> {
        self.slots
            .into_iter()
            .map(|slot| slot.map(|s| s.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_completion_across_levels() {
        let spec = collect_device(&[
            Leveled::new("ARM::RteTest_ARMCM0_Dual", "target-type 'CM0'"),
            Leveled::new(":cm0_core1", "project 'core1'"),
        ])
        .unwrap();
        assert_eq!(spec.to_string(), "ARM::RteTest_ARMCM0_Dual:cm0_core1");
    }

    #[test]
    fn test_device_equal_values_accepted() {
        let spec = collect_device(&[
            Leveled::new("RteTest_ARMCM3", "solution"),
            Leveled::new("RteTest_ARMCM3", "project 'core'"),
        ])
        .unwrap();
        assert_eq!(spec.name, "RteTest_ARMCM3");
        assert!(spec.vendor.is_none());
    }

    #[test]
    fn test_device_conflict_names_both_levels() {
        let err = collect_device(&[
            Leveled::new("RteTest_ARMCM3", "target-type 'CM3'"),
            Leveled::new("RteTest_ARMCM0", "project 'core'"),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "redefinition of 'device' from 'RteTest_ARMCM3' (target-type 'CM3') \
             into 'RteTest_ARMCM0' (project 'core') is not allowed"
        );
    }

    #[test]
    fn test_board_completion() {
        let spec = collect_board(&[
            Leveled::new("Keil::RteTest Dummy board", "solution"),
            Leveled::new("RteTest Dummy board:1.2.3", "target-type 'Board'"),
        ])
        .unwrap();
        assert_eq!(spec.to_string(), "Keil::RteTest Dummy board:1.2.3");
    }

    #[test]
    fn test_board_revision_conflict() {
        let err = collect_board(&[
            Leveled::new("RteTest Dummy board:1.2.3", "solution"),
            Leveled::new("RteTest Dummy board:4.5.6", "project 'core'"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("redefinition of 'board'"));
        assert!(err.to_string().contains("is not allowed"));
    }

    #[test]
    fn test_compiler_completion_and_default() {
        let item = collect_compiler(&[
            Leveled::new("AC6", "solution"),
            Leveled::new("AC6@6.18.0", "target-type 'Debug'"),
        ])
        .unwrap()
        .unwrap();
        assert_eq!(item.to_string(), "AC6@6.18.0");

        let bare = collect_compiler(&[Leveled::new("GCC", "solution")])
            .unwrap()
            .unwrap();
        assert_eq!(bare.version, Version::new(0, 0, 0));

        assert!(collect_compiler(&[]).unwrap().is_none());
    }

    #[test]
    fn test_compiler_name_conflict() {
        let err = collect_compiler(&[
            Leveled::new("AC6@6.18.0", "solution"),
            Leveled::new("GCC", "project 'core'"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("redefinition of 'compiler'"));
    }

    #[test]
    fn test_empty_values_are_transparent() {
        let spec = collect_device(&[
            Leveled::new("", "solution"),
            Leveled::new("RteTest_ARMCM3", "project 'core'"),
        ])
        .unwrap();
        assert_eq!(spec.name, "RteTest_ARMCM3");
    }

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn device_strings() -> impl Strategy<Value = String> {
            (
                proptest::option::of("[A-Z][a-z]{1,6}"),
                "[A-Z][A-Za-z0-9_]{1,10}",
                proptest::option::of("[a-z][a-z0-9_]{1,8}"),
            )
                .prop_map(|(vendor, name, pname)| {
                    let mut text = String::new();
                    if let Some(vendor) = vendor {
                        text.push_str(&vendor);
                        text.push_str("::");
                    }
                    text.push_str(&name);
                    if let Some(pname) = pname {
                        text.push(':');
                        text.push_str(&pname);
                    }
                    text
                })
        }

        proptest! {
            #[test]
            fn prop_single_level_is_parse(text in device_strings()) {
                let collected = collect_device(&[Leveled::new(&text, "solution")]).unwrap();
                prop_assert_eq!(collected, DeviceSpec::parse(&text));
            }

            #[test]
            fn prop_repeated_level_is_idempotent(text in device_strings()) {
                let once = collect_device(&[Leveled::new(&text, "solution")]).unwrap();
                let twice = collect_device(&[
                    Leveled::new(&text, "solution"),
                    Leveled::new(&text, "project 'p'"),
                ])
                .unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
