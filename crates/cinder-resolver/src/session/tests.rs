//! Session tests driving the full pipeline against on-disk fixtures

use super::*;
use std::fs;
use std::path::Path;

fn utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
}

fn write_file(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn dfp_toml(version: &str) -> String {
    format!(
        r#"
[pack]
vendor = "ARM"
name = "Dfp"
version = "{version}"

[[component]]
class = "Device"
group = "Startup"
version = "1.0.0"

[[component]]
class = "Device"
group = "Config"
version = "1.0.0"

[[device]]
name = "TestDevice"
family = "Test Family"

[[device.processor]]
core = "Cortex-M4"

[[board]]
name = "TestBoard"
revision = "1.0"
mounted-devices = ["ARM::TestDevice"]
"#
    )
}

const EXTRA_TOML: &str = r#"
[pack]
vendor = "Vendor"
name = "Extra"
version = "2.0.0"

[[component]]
class = "Utility"
group = "Logger"
version = "1.0.0"
"#;

const SOLUTION: &str = r#"
[solution]
packs = ["ARM::Dfp"]
projects = ["app.project.toml"]

[[solution.target-types]]
name = "TypeA"
device = "TestDevice"
"#;

const SOLUTION_NO_PACKS: &str = r#"
[solution]
projects = ["app.project.toml"]

[[solution.target-types]]
name = "TypeA"
device = "TestDevice"
"#;

const PROJECT: &str = r#"
[project]
components = ["ARM::Device:Startup"]
"#;

/// Standard fixture: a device-family pack and an unrelated utility pack
/// installed, one project, one target type.
fn make_session_with(
    solution: &str,
    project: &str,
    layers: &[(&str, &str)],
) -> (tempfile::TempDir, Session) {
    let temp = tempfile::tempdir().unwrap();
    write_file(&temp.path().join("packs/dfp/pack.toml"), &dfp_toml("1.0.0"));
    write_file(&temp.path().join("packs/extra/pack.toml"), EXTRA_TOML);
    for (rel, body) in layers {
        write_file(&temp.path().join("work").join(rel), body);
    }
    write_file(&temp.path().join("work/app.project.toml"), project);
    let solution_path = temp.path().join("work/app.solution.toml");
    write_file(&solution_path, solution);

    let mut session = Session::new();
    session
        .load_packs(&[utf8(&temp.path().join("packs"))])
        .unwrap();
    session.load_solution(&utf8(&solution_path)).unwrap();
    (temp, session)
}

fn make_session(solution: &str, project: &str) -> (tempfile::TempDir, Session) {
    make_session_with(solution, project, &[])
}

#[test]
fn test_contexts_derived_per_build_and_target_type() {
    let solution = r#"
[solution]
packs = ["ARM::Dfp"]
projects = ["app.project.toml"]
build-types = ["Debug", "Release"]

[[solution.target-types]]
name = "TypeA"
device = "TestDevice"

[[solution.target-types]]
name = "TypeB"
device = "TestDevice"
"#;
    let (_temp, session) = make_session(solution, PROJECT);
    assert_eq!(
        session.context_names(),
        vec![
            "app.Debug+TypeA",
            "app.Debug+TypeB",
            "app.Release+TypeA",
            "app.Release+TypeB",
        ]
    );
}

#[test]
fn test_context_name_omits_empty_build_type() {
    let (_temp, session) = make_session(SOLUTION, PROJECT);
    assert_eq!(session.context_names(), vec!["app+TypeA"]);
}

#[test]
fn test_validate_reports_clean_context() {
    let (_temp, mut session) = make_session(SOLUTION, PROJECT);
    let verdicts = session.validate(None).unwrap();
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].name, "app+TypeA");
    assert!(!verdicts[0].failed);
    assert!(verdicts[0].report.as_ref().unwrap().is_clean());

    let context = &session.contexts()[0];
    let target = context.target.as_ref().unwrap();
    assert_eq!(target.device.name, "TestDevice");
    let used = context.pool.as_ref().unwrap().used();
    assert_eq!(used.len(), 1);
    assert_eq!(used[0].id.to_string(), "ARM::Device:Startup@1.0.0");
}

#[test]
fn test_select_and_deselect_component() {
    let (_temp, mut session) = make_session(SOLUTION, PROJECT);
    let id = session.select_component("ARM::Device:Config", 1).unwrap();
    assert_eq!(id.group, "Config");
    assert_eq!(session.contexts()[0].pool.as_ref().unwrap().used().len(), 2);

    let err = session
        .select_component("ARM::Device:Config", 2)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "component 'ARM::Device:Config@1.0.0' does not accept more than 1 instance(s)"
    );

    session.deselect_component("ARM::Device:Config").unwrap();
    assert_eq!(session.contexts()[0].pool.as_ref().unwrap().used().len(), 1);
}

#[test]
fn test_unparseable_identifier_mentions_matching_board() {
    let (_temp, mut session) = make_session(SOLUTION, PROJECT);
    let err = session.select_component("TestBoard", 1).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("no component was found with identifier 'TestBoard'"));
    assert!(message.contains("note: the identifier names installed board 'ARM::TestBoard:1.0'"));
}

#[test]
fn test_pack_reference_lifecycle() {
    let (_temp, mut session) = make_session(SOLUTION_NO_PACKS, PROJECT);
    session
        .select_component("Vendor::Utility:Logger", 1)
        .unwrap();
    {
        let context = &session.contexts()[0];
        // Nothing is declared, so the project selection references its
        // pack too.
        assert_eq!(context.pack_refs.len(), 2);
        let state = &context.pack_refs["Vendor::Extra@2.0.0"];
        assert_eq!(state.users, 1);
        assert!(!state.removable);
        assert_eq!(context.used_packs().len(), 2);
    }

    session
        .deselect_component("Vendor::Utility:Logger")
        .unwrap();
    {
        let context = &session.contexts()[0];
        let state = &context.pack_refs["Vendor::Extra@2.0.0"];
        assert_eq!(state.users, 0);
        assert!(state.removable);
        // Still counted until the next apply
        assert_eq!(context.used_packs().len(), 2);
    }

    assert_eq!(session.apply().unwrap(), 1);
    let context = &session.contexts()[0];
    assert!(!context.pack_refs.contains_key("Vendor::Extra@2.0.0"));
    assert_eq!(context.used_packs().len(), 1);
}

#[test]
fn test_select_pack_extends_declared_set() {
    let (_temp, mut session) = make_session(SOLUTION, PROJECT);
    let err = session
        .select_component("Vendor::Utility:Logger", 1)
        .unwrap_err();
    assert!(err.to_string().contains("no component was found"));

    assert_eq!(session.select_pack("Vendor::Extra").unwrap(), 1);
    session
        .select_component("Vendor::Utility:Logger", 1)
        .unwrap();
    {
        let context = &session.contexts()[0];
        let used = context.pool.as_ref().unwrap().used();
        // The project selection survives the pool rebuild
        assert!(used.iter().any(|u| u.id.group == "Startup"));
        assert!(used.iter().any(|u| u.id.group == "Logger"));
        // Both packs are declared now, so no removable references exist
        assert!(context.pack_refs.is_empty());
        assert_eq!(context.used_packs().len(), 2);
        let extra = context
            .packs
            .iter()
            .find(|entry| entry.id.to_string() == "Vendor::Extra@2.0.0")
            .unwrap();
        assert_eq!(extra.selected_by, vec!["Vendor::Extra"]);
    }

    // Selecting the same pack again adds nothing
    assert_eq!(session.select_pack("Vendor::Extra").unwrap(), 0);
}

#[test]
fn test_select_pack_not_installed() {
    let (_temp, mut session) = make_session(SOLUTION, PROJECT);
    let err = session.select_pack("Missing::Pack").unwrap_err();
    assert_eq!(err.to_string(), "required pack not installed: Missing::Pack");
    let err = session.select_pack("Missing::*").unwrap_err();
    assert_eq!(err.to_string(), "no match found for pack filter: Missing::*");
}

#[test]
fn test_activate_switches_and_preparation_stays_lazy() {
    let solution = r#"
[solution]
packs = ["ARM::Dfp"]
projects = ["app.project.toml"]

[[solution.target-types]]
name = "TypeA"
device = "TestDevice"

[[solution.target-types]]
name = "TypeB"
device = "TestDevice"
"#;
    let (_temp, mut session) = make_session(solution, PROJECT);
    session.activate("app+TypeB").unwrap();
    session.select_component("ARM::Device:Config", 1).unwrap();

    // Only the active context was prepared
    assert!(session.contexts()[0].pool.is_none());
    let used = session.contexts()[1].pool.as_ref().unwrap().used();
    assert_eq!(used.len(), 2);

    let err = session.activate("nope").unwrap_err();
    assert_eq!(err.to_string(), "context 'nope' was not found");
}

#[test]
fn test_failed_context_reports_and_blocks_selection() {
    let solution = r#"
[solution]
packs = ["ARM::Missing"]
projects = ["app.project.toml"]

[[solution.target-types]]
name = "TypeA"
device = "TestDevice"
"#;
    let (_temp, mut session) = make_session(solution, PROJECT);
    let verdicts = session.validate(None).unwrap();
    assert_eq!(verdicts.len(), 1);
    assert!(verdicts[0].failed);
    assert!(verdicts[0].report.is_none());

    let err = session
        .select_component("ARM::Device:Startup", 1)
        .unwrap_err();
    assert_eq!(err.to_string(), "required pack not installed: ARM::Missing");
}

#[test]
fn test_validate_rejects_unknown_context_name() {
    let (_temp, mut session) = make_session(SOLUTION, PROJECT);
    let err = session.validate(Some("nope")).unwrap_err();
    assert_eq!(err.to_string(), "context 'nope' was not found");
}

#[test]
fn test_resolve_auto_selects_single_candidate() {
    let sensor = r#"
[pack]
vendor = "Vendor"
name = "Sensor"
version = "1.0.0"

[[component]]
class = "Sensor"
group = "Driver"
version = "1.0.0"
condition = "NeedsLogger"

[[condition]]
id = "NeedsLogger"

[[condition.rule]]
kind = "require"
attrs = { Cclass = "Utility", Cgroup = "Logger" }
"#;
    let temp = tempfile::tempdir().unwrap();
    write_file(&temp.path().join("packs/dfp/pack.toml"), &dfp_toml("1.0.0"));
    write_file(&temp.path().join("packs/extra/pack.toml"), EXTRA_TOML);
    write_file(&temp.path().join("packs/sensor/pack.toml"), sensor);
    write_file(
        &temp.path().join("work/app.project.toml"),
        "[project]\ncomponents = [\"Vendor::Sensor:Driver\"]\n",
    );
    let solution_path = temp.path().join("work/app.solution.toml");
    write_file(&solution_path, SOLUTION_NO_PACKS);

    let mut session = Session::new();
    session
        .load_packs(&[utf8(&temp.path().join("packs"))])
        .unwrap();
    session.load_solution(&utf8(&solution_path)).unwrap();

    let verdicts = session.validate(None).unwrap();
    assert!(!verdicts[0].report.as_ref().unwrap().is_clean());

    let verdicts = session.resolve(None).unwrap();
    assert!(verdicts[0].report.as_ref().unwrap().is_clean());

    let context = &session.contexts()[0];
    let used = context.pool.as_ref().unwrap().used();
    assert!(used
        .iter()
        .any(|u| u.id.class == "Utility" && u.id.group == "Logger"));
    // The auto-selected component references its pack
    assert!(context.pack_refs.contains_key("Vendor::Extra@2.0.0"));
}

const LAYER_SOLUTION: &str = r#"
[solution]
packs = ["ARM::Dfp"]
projects = ["app.project.toml"]
layer-paths = ["layers"]

[[solution.target-types]]
name = "TypeA"
device = "TestDevice"
"#;

const LAYER_PROJECT: &str = r#"
[project]
components = ["ARM::Device:Startup"]

[[project.layers]]
type = "Board"
"#;

const BOARD_LAYER: &str = r#"
[layer]
type = "Board"
description = "Board support"
components = ["ARM::Device:Config"]

[[layer.connect]]
provides = [{ key = "Heat", value = "-40" }]
"#;

#[test]
fn test_discovered_layer_fills_slot_and_selects_components() {
    let (_temp, mut session) = make_session_with(
        LAYER_SOLUTION,
        LAYER_PROJECT,
        &[("layers/board.layer.toml", BOARD_LAYER)],
    );
    let verdicts = session.validate(None).unwrap();
    assert!(!verdicts[0].failed);

    let context = &session.contexts()[0];
    let chosen = context.layers.get("Board").expect("layer chosen");
    assert!(chosen.ends_with("board.layer.toml"));
    let used = context.pool.as_ref().unwrap().used();
    assert!(used.iter().any(|u| u.id.group == "Config"));
    let infos = context.diagnostics.messages(Severity::Info);
    assert!(infos
        .iter()
        .any(|m| m.contains("clayer of type 'Board' was uniquely found")));

    let listed = session.list_layers("").unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].contains("(type: Board)"));
}

#[test]
fn test_missing_required_layer_fails_context() {
    let (_temp, mut session) = make_session(LAYER_SOLUTION, LAYER_PROJECT);
    let verdicts = session.validate(None).unwrap();
    assert!(verdicts[0].failed);
    let context = &session.contexts()[0];
    let errors = context.diagnostics.messages(Severity::Error);
    assert!(errors
        .iter()
        .any(|m| m.contains("no clayer matches type 'Board'")));
}

#[test]
fn test_explicit_layer_path_bypasses_discovery() {
    let project = r#"
[project]
components = ["ARM::Device:Startup"]

[[project.layers]]
type = "Board"
path = "board.layer.toml"
"#;
    let (_temp, mut session) =
        make_session_with(SOLUTION, project, &[("board.layer.toml", BOARD_LAYER)]);
    let verdicts = session.validate(None).unwrap();
    assert!(!verdicts[0].failed);

    let context = &session.contexts()[0];
    assert!(context
        .layers
        .get("Board")
        .unwrap()
        .ends_with("board.layer.toml"));
    let used = context.pool.as_ref().unwrap().used();
    assert!(used.iter().any(|u| u.id.group == "Config"));
}

#[test]
fn test_lock_pins_pack_resolution() {
    let temp = tempfile::tempdir().unwrap();
    write_file(&temp.path().join("packs/dfp1/pack.toml"), &dfp_toml("1.0.0"));
    write_file(&temp.path().join("packs/dfp2/pack.toml"), &dfp_toml("2.0.0"));
    write_file(&temp.path().join("work/app.project.toml"), PROJECT);
    let solution_path = temp.path().join("work/app.solution.toml");
    write_file(&solution_path, SOLUTION);
    write_file(
        &temp.path().join("work").join(LOCK_FILE_NAME),
        "[lock]\nversion = 1\n\n[[pack]]\nid = \"ARM::Dfp@1.0.0\"\nselected-by = [\"ARM::Dfp\"]\n",
    );

    let mut session = Session::new();
    session
        .load_packs(&[utf8(&temp.path().join("packs"))])
        .unwrap();
    session.load_solution(&utf8(&solution_path)).unwrap();
    assert!(session.lock().is_some());
    session.validate(None).unwrap();
    assert_eq!(
        session.contexts()[0].packs[0].id.to_string(),
        "ARM::Dfp@1.0.0"
    );

    // Without the lock the same requirement binds to the newest version
    fs::remove_file(temp.path().join("work").join(LOCK_FILE_NAME)).unwrap();
    let mut fresh = Session::new();
    fresh
        .load_packs(&[utf8(&temp.path().join("packs"))])
        .unwrap();
    fresh.load_solution(&utf8(&solution_path)).unwrap();
    fresh.validate(None).unwrap();
    assert_eq!(
        fresh.contexts()[0].packs[0].id.to_string(),
        "ARM::Dfp@2.0.0"
    );
}

#[test]
fn test_listings() {
    let (_temp, session) = make_session(SOLUTION, PROJECT);
    assert_eq!(session.list_packs("").unwrap(), vec!["ARM::Dfp@1.0.0"]);
    assert_eq!(session.list_devices("").unwrap(), vec!["ARM::TestDevice"]);
    assert_eq!(session.list_boards("").unwrap(), vec!["ARM::TestBoard:1.0"]);

    let components = session.list_components("").unwrap();
    assert!(components.contains(&"ARM::Device:Startup@1.0.0".to_string()));
    assert!(components.contains(&"Vendor::Utility:Logger@1.0.0".to_string()));

    assert_eq!(session.list_contexts("").unwrap(), vec!["app+TypeA"]);

    assert_eq!(
        session.list_devices("TestDevice").unwrap(),
        vec!["ARM::TestDevice"]
    );
    let err = session.list_boards("nothere").unwrap_err();
    assert_eq!(err.to_string(), "no board was found with filter 'nothere'");
}

#[test]
fn test_list_packs_reports_filter_miss() {
    let solution = r#"
[solution]
packs = ["keil::*"]
projects = ["app.project.toml"]

[[solution.target-types]]
name = "TypeA"
device = "TestDevice"
"#;
    let (_temp, session) = make_session(solution, PROJECT);
    let err = session.list_packs("").unwrap_err();
    assert_eq!(err.to_string(), "no match found for pack filter: keil::*");
}

#[test]
fn test_operations_require_a_solution() {
    let temp = tempfile::tempdir().unwrap();
    write_file(&temp.path().join("packs/dfp/pack.toml"), &dfp_toml("1.0.0"));
    let mut session = Session::new();
    let count = session
        .load_packs(&[utf8(&temp.path().join("packs"))])
        .unwrap();
    assert_eq!(count, 1);

    // Listing works off the bare index
    assert_eq!(session.list_packs("").unwrap().len(), 1);

    let err = session.validate(None).unwrap_err();
    assert_eq!(err.to_string(), "no solution is loaded");
    let err = session.select_component("ARM::Device:Startup", 1).unwrap_err();
    assert_eq!(err.to_string(), "no solution is loaded");
    let err = session.list_contexts("").unwrap_err();
    assert_eq!(err.to_string(), "no solution is loaded");
}

#[test]
fn test_load_notes_surface_in_context_without_failing_it() {
    let temp = tempfile::tempdir().unwrap();
    write_file(&temp.path().join("packs/dfp/pack.toml"), &dfp_toml("1.0.0"));
    write_file(
        &temp.path().join("packs/bad/pack.toml"),
        "[pack]\nvendor = \"ARM\"\n",
    );
    write_file(&temp.path().join("work/app.project.toml"), PROJECT);
    let solution_path = temp.path().join("work/app.solution.toml");
    write_file(&solution_path, SOLUTION);

    let mut session = Session::new();
    session
        .load_packs(&[utf8(&temp.path().join("packs"))])
        .unwrap();
    session.load_solution(&utf8(&solution_path)).unwrap();

    let verdicts = session.validate(None).unwrap();
    // The malformed install is reported but does not fail resolution
    assert!(!verdicts[0].failed);
    assert!(verdicts[0].report.is_some());
    let context = &session.contexts()[0];
    assert!(context.diagnostics.has_errors());
    let errors = context.diagnostics.messages(Severity::Error);
    assert!(errors
        .iter()
        .any(|m| m.contains("failed to parse pack description")));
}
