//! Device and board resolution
//!
//! Turns the merged device/board/compiler selections of one context into
//! a concrete target: the device definition from the installed packs,
//! the processor when the device has several, the device variant, and
//! the attribute bag every later stage filters against. Attributes merge
//! in precedence order (device defaults, then board values, then
//! explicit per-target overrides) with redefinition detection on the
//! explicit layer.

use tracing::debug;

use cinder_core::types::{keys, CONFIGURABLE};
use cinder_core::{AttrMerge, Attributes, BoardSpec, DeviceSpec};
use cinder_registry::{Board, Device, Pack, Processor};

use cinder_config::ToolchainItem;

use crate::context::Diagnostics;
use crate::{ResolverError, ResolverResult};

/// Attributes a user may pin that the device must actually support
const USER_SELECTABLE: [&str; 6] = [
    keys::DFPU,
    keys::DDSP,
    keys::DMVE,
    keys::DENDIAN,
    keys::DSECURE,
    keys::DBRANCHPROT,
];

/// One explicit attribute override with the level that declared it
#[derive(Debug, Clone)]
pub struct AttrOverride {
    pub key: String,
    pub value: String,
    pub source: String,
}

impl AttrOverride {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            source: source.into(),
        }
    }
}

/// Merged target selections of one context, ready for resolution
#[derive(Debug, Clone, Default)]
pub struct TargetInput {
    /// Device selection after precedence merging; may be empty
    pub device: DeviceSpec,

    /// Board selection after precedence merging; may be empty
    pub board: BoardSpec,

    /// Compiler selection, if any level declared one
    pub compiler: Option<ToolchainItem>,

    /// Explicit attribute overrides, outermost level first
    pub overrides: Vec<AttrOverride>,
}

/// The resolved target of one context
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Fully qualified device reference, pname included when one applies
    pub device: DeviceSpec,

    /// Fully qualified board reference when a board is in use
    pub board: Option<BoardSpec>,

    /// Selected device variant, if the device declares variants
    pub variant: Option<String>,

    /// Merged target attribute bag
    pub attributes: Attributes,
}

/// Resolve the target of one context against the resolved pack set.
///
/// Fatal problems (unknown device/board, ambiguity without a tiebreak,
/// attribute redefinition) come back as errors; tolerated mismatches
/// (board not mounting the device, unsupported-but-honored attribute
/// values) are logged as warnings and resolution continues.
pub fn resolve_target(
    input: &TargetInput,
    packs: &[&Pack],
    diagnostics: &mut Diagnostics,
) -> ResolverResult<ResolvedTarget> {
    if input.device.is_empty() && input.board.is_empty() {
        return Err(ResolverError::operation("missing device and/or board info"));
    }

    let board = match input.board.is_empty() {
        true => None,
        false => Some(find_board(&input.board, packs)?),
    };

    let spec = match (board, input.device.name.is_empty()) {
        (Some(board), true) => mounted_device_spec(board, &input.device)?,
        _ => input.device.clone(),
    };
    let device = find_device(&spec, packs, diagnostics)?;

    if let Some(board) = board {
        if !mounts(board, device) {
            diagnostics.warning(format!(
                "board '{}' does not mount device '{}'",
                board.full_id(),
                device.full_name()
            ));
        }
    }

    let processor = select_processor(device, spec.pname.as_deref())?;
    let variant = select_variant(device, &input.overrides)?;

    let mut merge = AttrMerge::new();
    let device_source = format!("device '{}'", device.full_name());
    merge.default_value(keys::DNAME, &device.name, &device_source);
    merge.default_value(keys::DVENDOR, &device.vendor, &device_source);
    if let Some(family) = &device.family {
        merge.default_value(keys::DFAMILY, family, &device_source);
    }
    if let Some(variant) = &variant {
        merge.default_value(keys::DVARIANT, variant, &device_source);
    }
    if let Some(processor) = processor {
        for (key, value) in processor.attributes().iter() {
            // a device deferring the endianness choice contributes none
            if key == keys::DENDIAN && value == CONFIGURABLE {
                continue;
            }
            merge.default_value(key, value, &device_source);
        }
    }
    if let Some(board) = board {
        let board_source = format!("board '{}'", board.full_id());
        merge.default_value(keys::BNAME, &board.name, &board_source);
        merge.default_value(keys::BVENDOR, &board.vendor, &board_source);
        if let Some(revision) = &board.revision {
            merge.default_value(keys::BREVISION, revision, &board_source);
        }
    }

    if let Some(compiler) = &input.compiler {
        merge.explicit(keys::TCOMPILER, &compiler.to_string(), "compiler selection")?;
    }
    for item in &input.overrides {
        merge.explicit(&item.key, &item.value, &item.source)?;
        if USER_SELECTABLE.contains(&item.key.as_str()) {
            let supported = processor.map_or(true, |p| p.supports(&item.key, &item.value));
            if !supported {
                diagnostics.warning(format!(
                    "value '{}' for attribute '{}' is not supported by device '{}'",
                    item.value,
                    item.key,
                    device.full_name()
                ));
            }
        }
    }

    let resolved_device = DeviceSpec {
        vendor: Some(device.vendor.clone()),
        name: device.name.clone(),
        pname: processor
            .and_then(|p| p.pname.clone())
            .or_else(|| spec.pname.clone()),
    };
    let resolved_board = board.map(|b| BoardSpec {
        vendor: Some(b.vendor.clone()),
        name: b.name.clone(),
        revision: b.revision.clone(),
    });
    debug!("resolved target device '{}'", resolved_device);

    Ok(ResolvedTarget {
        device: resolved_device,
        board: resolved_board,
        variant,
        attributes: merge.finish(),
    })
}

/// The single installed board `spec` names
fn find_board<'a>(spec: &BoardSpec, packs: &[&'a Pack]) -> ResolverResult<&'a Board> {
    let mut found: Vec<&Board> = Vec::new();
    for pack in packs {
        for board in &pack.boards {
            if board.matches_spec(spec) && !found.iter().any(|b| b.full_id() == board.full_id()) {
                found.push(board);
            }
        }
    }
    match found.as_slice() {
        [] => Err(ResolverError::operation(format!(
            "board '{spec}' was not found"
        ))),
        [board] => Ok(*board),
        _ => {
            let mut message = format!("multiple boards were found for identifier '{spec}':");
            for board in &found {
                message.push('\n');
                message.push_str(&board.full_id());
            }
            Err(ResolverError::operation(message))
        }
    }
}

/// The single installed device `spec` names
fn find_device<'a>(
    spec: &DeviceSpec,
    packs: &[&'a Pack],
    diagnostics: &mut Diagnostics,
) -> ResolverResult<&'a Device> {
    let mut found: Vec<&Device> = Vec::new();
    for pack in packs {
        for device in &pack.devices {
            if device.matches_name(spec) && !found.iter().any(|d| d.full_name() == device.full_name())
            {
                found.push(device);
            }
        }
    }
    match found.as_slice() {
        [] => {
            diagnostics.info(format!(
                "install the pack providing device '{}', then run 'cinder resolve' again",
                spec.name
            ));
            Err(ResolverError::operation(format!(
                "specified device '{}' was not found among the installed packs",
                spec.name
            )))
        }
        [device] => Ok(*device),
        _ => {
            let mut message = format!("multiple devices were found for identifier '{spec}':");
            for device in &found {
                message.push('\n');
                message.push_str(&device.full_name());
            }
            Err(ResolverError::operation(message))
        }
    }
}

/// Complete an empty device selection from the board's mounted devices
fn mounted_device_spec(board: &Board, given: &DeviceSpec) -> ResolverResult<DeviceSpec> {
    let mut names: Vec<&str> = Vec::new();
    for mounted in &board.mounted_devices {
        if !names.contains(&mounted.name.as_str()) {
            names.push(&mounted.name);
        }
    }
    match names.as_slice() {
        [] => Err(ResolverError::operation(format!(
            "found no mounted device for board '{}'",
            board.full_id()
        ))),
        [_] => {
            let mounted = &board.mounted_devices[0];
            Ok(DeviceSpec {
                vendor: given.vendor.clone().or_else(|| mounted.vendor.clone()),
                name: mounted.name.clone(),
                pname: given.pname.clone().or_else(|| mounted.pname.clone()),
            })
        }
        _ => {
            let mut message =
                String::from("found multiple mounted devices, one of the following must be specified:");
            for name in names {
                message.push('\n');
                message.push_str(name);
            }
            Err(ResolverError::operation(message))
        }
    }
}

/// Whether the board mounts the device, matching by name or family
fn mounts(board: &Board, device: &Device) -> bool {
    board.mounted_devices.iter().any(|mounted| {
        mounted.name == device.name || Some(&mounted.name) == device.family.as_ref()
    })
}

/// The processor the context builds for.
///
/// A multi-core device without a processor name stays unresolved; the
/// error enumerates the names so the user can pick one.
fn select_processor<'a>(
    device: &'a Device,
    pname: Option<&str>,
) -> ResolverResult<Option<&'a Processor>> {
    if device.processors.is_empty() {
        if let Some(pname) = pname {
            return Err(ResolverError::operation(format!(
                "processor name '{}' was not found for device '{}'",
                pname,
                device.full_name()
            )));
        }
        return Ok(None);
    }
    match device.processor(pname) {
        Some(processor) => Ok(Some(processor)),
        None => match pname {
            Some(pname) => Err(ResolverError::operation(format!(
                "processor name '{}' was not found for device '{}'",
                pname,
                device.full_name()
            ))),
            None => Err(ResolverError::operation(format!(
                "found multiple processors for device '{}', one of the following must be \
                 specified: {}",
                device.full_name(),
                device.processor_names().join(", ")
            ))),
        },
    }
}

/// The device variant in use: the explicit `Dvariant` override when
/// given, the sole declared variant otherwise
fn select_variant(device: &Device, overrides: &[AttrOverride]) -> ResolverResult<Option<String>> {
    let explicit = overrides
        .iter()
        .find(|item| item.key == keys::DVARIANT && !item.value.is_empty());
    if let Some(item) = explicit {
        if !device.variants.is_empty() && !device.variants.contains(&item.value) {
            let mut message = format!(
                "variant '{}' was not found for device '{}', one of the following must be \
                 specified:",
                item.value,
                device.full_name()
            );
            for variant in &device.variants {
                message.push('\n');
                message.push_str(variant);
            }
            return Err(ResolverError::operation(message));
        }
        return Ok(Some(item.value.clone()));
    }
    match device.variants.as_slice() {
        [] => Ok(None),
        [variant] => Ok(Some(variant.clone())),
        _ => {
            let mut message = format!(
                "found multiple device variants for '{}', one of the following must be specified:",
                device.full_name()
            );
            for variant in &device.variants {
                message.push('\n');
                message.push_str(variant);
            }
            Err(ResolverError::operation(message))
        }
    }
}
