// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use crate::fixtures::{RecordingRunner, TestProject, strings, test_project};

fn open(project: &TestProject, name: &str) -> super::EnvironmentHandle {
    project.project.environment(name).unwrap()
}

#[rstest]
fn test_open_names_env_after_project(test_project: TestProject) {
    test_project.add_env("py-env", "name: e1\nconda:\n  deps: [numpy]\n");
    let env = open(&test_project, "py-env");
    assert_eq!(env.name(), "py-env");
    assert_eq!(env.manager_name(), "proj-e1");
    assert_eq!(env.spec().name, "e1");
    assert!(!env.is_built().unwrap());
}

#[rstest]
fn test_open_without_build_file(test_project: TestProject) {
    let dir = test_project.project.sub_paths().env.join("empty");
    std::fs::create_dir_all(&dir).unwrap();
    let err = super::EnvironmentHandle::open("proj", &dir, test_project.runner.clone())
        .unwrap_err();
    assert!(matches!(err, crate::Error::NotFoundAtPath(_)));
}

#[rstest]
fn test_build_issues_single_create(test_project: TestProject) {
    test_project.add_env("py-env", "name: e1\nconda:\n  deps: [numpy]\n");
    let mut env = open(&test_project, "py-env");
    env.build().unwrap();

    assert_eq!(
        test_project.runner.calls(),
        vec![vec!["conda", "create", "-n", "proj-e1", "numpy", "--yes"]]
    );
    assert!(env.is_built().unwrap());
    assert!(env.build_time().unwrap().is_some());

    // state survives a fresh handle
    assert!(open(&test_project, "py-env").is_built().unwrap());
}

#[rstest]
fn test_failed_build_stays_unbuilt() {
    let project = TestProject::new(RecordingRunner::new().failing_at(1));
    project.add_env("py-env", "name: e1\npip:\n  deps: [h5py]\n");
    let mut env = open(&project, "py-env");
    let err = env.build().unwrap_err();
    assert!(matches!(err, crate::Error::ProcessFailed { .. }));
    assert!(!env.is_built().unwrap());
    assert_eq!(env.build_time().unwrap(), None);
}

#[rstest]
fn test_failed_rebuild_clears_previous_build() {
    let project = TestProject::new(RecordingRunner::new().failing_at(1));
    project.add_env("py-env", "name: e1\n");
    let mut env = open(&project, "py-env");
    env.build().unwrap();
    assert!(env.is_built().unwrap());

    let err = env.build().unwrap_err();
    assert!(matches!(err, crate::Error::ProcessFailed { ref action, .. } if action == "create"));
    assert!(!env.is_built().unwrap());
    assert!(!open(&project, "py-env").is_built().unwrap());
}

#[rstest]
fn test_unavailable_manager_keeps_build_state() {
    let project = TestProject::new(RecordingRunner::new().with_missing(&["conda"]));
    let dir = project.add_env("py-env", "name: e1\n");
    std::fs::write(dir.join(".meta.json"), r#"{"build-time": "2024-03-01T10:22:31+00:00"}"#)
        .unwrap();
    let mut env = open(&project, "py-env");

    let err = env.build().unwrap_err();
    assert!(matches!(err, crate::Error::ManagerUnavailable { .. }));
    assert!(env.is_built().unwrap());
}

#[rstest]
fn test_run_command_requires_build(test_project: TestProject) {
    let dir = test_project.add_env("py-env", "name: e1\n");
    std::fs::write(dir.join(".meta.json"), r#"{"build-time": null}"#).unwrap();
    let mut env = open(&test_project, "py-env");

    let err = env.run_command(&strings(&["python", "-V"])).unwrap_err();
    assert!(matches!(err, crate::Error::NotBuilt(ref name) if name == "py-env"));
    assert!(test_project.runner.calls().is_empty());
}

#[rstest]
fn test_run_command_in_built_env(test_project: TestProject) {
    test_project.add_env("py-env", "name: e1\n");
    let mut env = open(&test_project, "py-env");
    env.build().unwrap();
    env.run_command(&strings(&["python", "-V"])).unwrap();

    let calls = test_project.runner.calls();
    assert_eq!(
        calls[1],
        vec!["conda", "run", "--live-stream", "-n", "proj-e1", "python", "-V"]
    );
}

#[rstest]
fn test_delete_built_returns_to_unbuilt(test_project: TestProject) {
    test_project.add_env("py-env", "name: e1\n");
    let mut env = open(&test_project, "py-env");
    env.build().unwrap();
    env.delete_built().unwrap();

    assert!(!env.is_built().unwrap());
    assert!(env.path().is_dir());
    let calls_after_delete = test_project.runner.calls().len();
    assert_eq!(calls_after_delete, 2);

    let err = env.run_command(&strings(&["python"])).unwrap_err();
    assert!(matches!(err, crate::Error::NotBuilt(_)));
    assert_eq!(test_project.runner.calls().len(), calls_after_delete);
}

#[rstest]
fn test_update_requires_build(test_project: TestProject) {
    test_project.add_env("py-env", "name: e1\npip:\n  deps: [h5py]\n");
    let mut env = open(&test_project, "py-env");
    let err = env.update().unwrap_err();
    assert!(matches!(err, crate::Error::NotBuilt(_)));
    assert!(test_project.runner.calls().is_empty());
}

#[rstest]
fn test_update_reinstalls_secondary(test_project: TestProject) {
    test_project.add_env("py-env", "name: e1\npip:\n  deps: [h5py]\n");
    let mut env = open(&test_project, "py-env");
    env.build().unwrap();
    env.update().unwrap();

    let calls = test_project.runner.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2][5..], ["pip", "install", "h5py"]);
    assert!(env.is_built().unwrap());
}

#[rstest]
fn test_build_preserves_sidecar_keys(test_project: TestProject) {
    let dir = test_project.add_env("py-env", "name: e1\n");
    std::fs::write(dir.join(".meta.json"), r#"{"name": "py-env"}"#).unwrap();
    let mut env = open(&test_project, "py-env");
    env.build().unwrap();

    let content = std::fs::read_to_string(dir.join(".meta.json")).unwrap();
    let meta: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(meta["name"], "py-env");
    assert!(meta["build-time"].is_string());
}
