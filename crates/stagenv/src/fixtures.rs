// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Shared test helpers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rstest::fixture;
use tempfile::TempDir;

use crate::runner::{CommandRunner, RunStatus};
use crate::{BUILD_FILENAME, INTERFACE_FILENAME, Project};

/// Runner that records every command line instead of running it.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    missing: HashSet<String>,
    fail_at: Option<usize>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report these programs as not installed.
    pub fn with_missing(mut self, programs: &[&str]) -> Self {
        self.missing = programs.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Make the `index`-th run (0-based) exit with status 1.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn is_available(&self, program: &str) -> bool {
        !self.missing.contains(program)
    }

    fn run(&self, argv: &[String]) -> std::io::Result<RunStatus> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(argv.to_vec());
        let code = if self.fail_at == Some(index) { 1 } else { 0 };
        Ok(RunStatus { code: Some(code) })
    }
}

/// Serializes tests that change the process working directory.
static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with `dir` as the working directory, restoring the previous
/// one afterwards.
pub fn with_cwd<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
    let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir).unwrap();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    std::env::set_current_dir(previous).unwrap();
    result.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A temporary project named `proj` backed by a [`RecordingRunner`].
pub struct TestProject {
    pub tmp: TempDir,
    pub runner: Arc<RecordingRunner>,
    pub project: Project,
}

impl TestProject {
    pub fn new(runner: RecordingRunner) -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        std::fs::create_dir(&root).unwrap();
        let runner = Arc::new(runner);
        let project = Project::with_runner(&root, runner.clone()).unwrap();
        Self {
            tmp,
            runner,
            project,
        }
    }

    pub fn root(&self) -> &Path {
        self.project.path()
    }

    /// Write `Environments/<name>/build.yaml`.
    pub fn add_env(&self, name: &str, build_yaml: &str) -> PathBuf {
        let dir = self.project.sub_paths().env.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(BUILD_FILENAME), build_yaml).unwrap();
        dir
    }

    /// Write `Tasks/<task>/<script>/interface.yaml` plus empty bundled
    /// files.
    pub fn add_script(
        &self,
        task: &str,
        script: &str,
        interface_yaml: &str,
        files: &[&str],
    ) -> PathBuf {
        let dir = self.project.sub_paths().task.join(task).join(script);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(INTERFACE_FILENAME), interface_yaml).unwrap();
        for file in files {
            std::fs::write(dir.join(file), "").unwrap();
        }
        dir
    }
}

#[fixture]
pub fn test_project() -> TestProject {
    TestProject::new(RecordingRunner::new())
}
