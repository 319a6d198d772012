//! Unit tests for CLI commands.

use super::*;
use crate::ListKind;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const DFP_TOML: &str = r#"
[pack]
vendor = "ARM"
name = "Dfp"
version = "1.0.0"

[[component]]
class = "Device"
group = "Startup"
version = "1.0.0"

[[device]]
name = "TestDevice"

[[device.processor]]
core = "Cortex-M4"
"#;

const SOLUTION_TOML: &str = r#"
[solution]
packs = ["ARM::Dfp"]
projects = ["app.project.toml"]

[[solution.target-types]]
name = "TypeA"
device = "TestDevice"
"#;

const PROJECT_TOML: &str = r#"
[project]
components = ["ARM::Device:Startup"]
"#;

fn utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
}

fn write_file(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Pack root plus a one-project solution under `work/`
fn create_workspace() -> TempDir {
    let temp = tempfile::tempdir().expect("Failed to create temp directory");
    write_file(&temp.path().join("packs/dfp/pack.toml"), DFP_TOML);
    write_file(&temp.path().join("work/app.project.toml"), PROJECT_TOML);
    write_file(&temp.path().join("work/app.solution.toml"), SOLUTION_TOML);
    temp
}

fn create_test_context(temp: &TempDir) -> CommandContext {
    CommandContext {
        cwd: utf8(temp.path()),
        output: crate::output::OutputHandler::new(),
    }
}

#[test]
fn test_list_requires_a_pack_root() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);

    let err = list::execute(ListKind::Packs, "", None, &[], &ctx).unwrap_err();
    assert!(err.to_string().contains("no pack root given"));
}

#[test]
fn test_list_packs_succeeds() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];

    let result = list::execute(ListKind::Packs, "", None, &roots, &ctx);
    assert!(result.is_ok());
}

#[test]
fn test_list_unknown_filter_is_an_error() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];

    let err = list::execute(ListKind::Devices, "nothere", None, &roots, &ctx).unwrap_err();
    assert!(err
        .to_string()
        .contains("no device was found with filter 'nothere'"));
}

#[test]
fn test_list_contexts_requires_a_solution() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];

    let err = list::execute(ListKind::Contexts, "", None, &roots, &ctx).unwrap_err();
    assert!(err.to_string().contains("no solution is loaded"));

    let solution = Utf8PathBuf::from("work/app.solution.toml");
    let result = list::execute(ListKind::Contexts, "", Some(&solution), &roots, &ctx);
    assert!(result.is_ok());
}

#[test]
fn test_validate_clean_solution() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];
    let solution = Utf8PathBuf::from("work/app.solution.toml");

    let result = validate::execute(&solution, None, &roots, &ctx);
    assert!(result.is_ok());
}

#[test]
fn test_resolve_writes_description_and_lock() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];
    let solution = Utf8PathBuf::from("work/app.solution.toml");

    resolve::execute(&solution, None, false, &roots, &ctx).unwrap();

    let description = temp.path().join("work/app+TypeA.cbuild.json");
    let text = fs::read_to_string(&description).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["build"]["context"].as_str(), Some("app+TypeA"));
    assert_eq!(value["build"]["device"].as_str(), Some("ARM::TestDevice"));
    assert_eq!(
        value["build"]["packs"][0]["pack"].as_str(),
        Some("ARM::Dfp@1.0.0")
    );
    assert_eq!(
        value["build"]["components"][0]["component"].as_str(),
        Some("ARM::Device:Startup@1.0.0")
    );
    assert_eq!(
        value["build"]["dependencies"]["overall"].as_str(),
        Some("FULFILLED")
    );

    let lock = fs::read_to_string(temp.path().join("work/cinder.lock")).unwrap();
    assert!(lock.contains("id = \"ARM::Dfp@1.0.0\""));
    assert!(lock.contains("selected-by = [\"ARM::Dfp\"]"));
}

#[test]
fn test_resolve_outputs_are_stable_across_runs() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];
    let solution = Utf8PathBuf::from("work/app.solution.toml");

    resolve::execute(&solution, None, false, &roots, &ctx).unwrap();
    let lock_first = fs::read_to_string(temp.path().join("work/cinder.lock")).unwrap();
    let description_first =
        fs::read_to_string(temp.path().join("work/app+TypeA.cbuild.json")).unwrap();

    resolve::execute(&solution, None, false, &roots, &ctx).unwrap();
    let lock_second = fs::read_to_string(temp.path().join("work/cinder.lock")).unwrap();
    let description_second =
        fs::read_to_string(temp.path().join("work/app+TypeA.cbuild.json")).unwrap();

    // An unchanged pack set must leave the lock byte-identical, and the
    // description carries no run-dependent state
    assert_eq!(lock_first, lock_second);
    assert_eq!(description_first, description_second);
}

#[test]
fn test_resolve_locked_without_lock_fails() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];
    let solution = Utf8PathBuf::from("work/app.solution.toml");

    let err = resolve::execute(&solution, None, true, &roots, &ctx).unwrap_err();
    assert!(err.to_string().contains("required by --locked"));
}

#[test]
fn test_resolve_locked_accepts_matching_lock() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];
    let solution = Utf8PathBuf::from("work/app.solution.toml");

    resolve::execute(&solution, None, false, &roots, &ctx).unwrap();
    let result = resolve::execute(&solution, None, true, &roots, &ctx);
    assert!(result.is_ok());
}

#[test]
fn test_resolve_failing_context_writes_nothing() {
    let temp = create_workspace();
    write_file(
        &temp.path().join("work/app.solution.toml"),
        "[solution]\npacks = [\"ARM::Missing\"]\nprojects = [\"app.project.toml\"]\n\n\
         [[solution.target-types]]\nname = \"TypeA\"\ndevice = \"TestDevice\"\n",
    );
    let ctx = create_test_context(&temp);
    let roots = vec![Utf8PathBuf::from("packs")];
    let solution = Utf8PathBuf::from("work/app.solution.toml");

    let result = resolve::execute(&solution, None, false, &roots, &ctx);
    assert!(result.is_ok());
    assert!(!temp.path().join("work/app+TypeA.cbuild.json").exists());
    assert!(!temp.path().join("work/cinder.lock").exists());
}

#[test]
fn test_absolute_resolves_against_cwd() {
    let cwd = Utf8PathBuf::from("/work");
    assert_eq!(absolute(Utf8Path::new("a/b"), &cwd), "/work/a/b");
    assert_eq!(absolute(Utf8Path::new("/a/b"), &cwd), "/a/b");
}

#[test]
fn test_show_version() {
    let temp = create_workspace();
    let ctx = create_test_context(&temp);
    let result = show_version(&ctx);
    assert!(result.is_ok());
}
