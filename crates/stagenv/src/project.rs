// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Project tree lookups and multi-environment orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::environment::EnvironmentHandle;
use crate::runner::{CommandRunner, SystemRunner};
use crate::script::Script;
use crate::BUILD_FILENAME;

#[cfg(test)]
#[path = "./project_test.rs"]
mod project_test;

pub const ENVIRONMENTS_DIR: &str = "Environments";
pub const TASKS_DIR: &str = "Tasks";
pub const PIPELINES_DIR: &str = "Pipelines";
pub const FORMATS_DIR: &str = "Formats";

/// Well-known sub-directories of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubPaths {
    pub env: PathBuf,
    pub task: PathBuf,
    pub pipe: PathBuf,
    pub format: PathBuf,
}

/// A project root holding environments and tasks.
///
/// Scripts do not keep a reference back to their project, anything that
/// needs both takes the project explicitly.
pub struct Project {
    path: PathBuf,
    name: String,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("path", &self.path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Project {
    /// Open the project at `path`, running processes on the host.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Self::with_runner(path, Arc::new(SystemRunner))
    }

    /// Open the project at `path` with a custom process runner.
    pub fn with_runner<P: AsRef<Path>>(
        path: P,
        runner: Arc<dyn CommandRunner>,
    ) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(crate::Error::NotFoundAtPath(path.to_path_buf()));
        }
        let canonical = dunce::canonicalize(path)?;
        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                crate::Error::ValidationFailed(format!(
                    "cannot derive a project name from {canonical:?}"
                ))
            })?;
        Ok(Self {
            path: canonical,
            name,
            runner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final component of the canonical project path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_paths(&self) -> SubPaths {
        SubPaths {
            env: self.path.join(ENVIRONMENTS_DIR),
            task: self.path.join(TASKS_DIR),
            pipe: self.path.join(PIPELINES_DIR),
            format: self.path.join(FORMATS_DIR),
        }
    }

    /// Names of every directory under `Environments` holding a
    /// `build.yaml`, sorted.
    pub fn environment_names(&self) -> crate::Result<Vec<String>> {
        let base = self.sub_paths().env;
        Ok(list_dirs(&base)?
            .into_iter()
            .filter(|name| base.join(name).join(BUILD_FILENAME).is_file())
            .collect())
    }

    pub fn environments(&self) -> crate::Result<Vec<EnvironmentHandle>> {
        self.environment_names()?
            .iter()
            .map(|name| self.environment(name))
            .collect()
    }

    /// Every environment paired with the result of opening it, so one
    /// broken `build.yaml` does not hide the others.
    pub fn scan_environments(
        &self,
    ) -> crate::Result<Vec<(String, crate::Result<EnvironmentHandle>)>> {
        Ok(self
            .environment_names()?
            .into_iter()
            .map(|name| {
                let env = self.environment(&name);
                (name, env)
            })
            .collect())
    }

    pub fn environment(&self, name: &str) -> crate::Result<EnvironmentHandle> {
        let path = self.sub_paths().env.join(name);
        if !path.is_dir() {
            return Err(crate::Error::EnvironmentNotFound(name.to_string()));
        }
        debug!(name, path = ?path, "opening environment");
        EnvironmentHandle::open(&self.name, path, Arc::clone(&self.runner))
    }

    pub fn tasks(&self) -> crate::Result<Vec<String>> {
        list_dirs(&self.sub_paths().task)
    }

    pub fn scripts(&self, task: &str) -> crate::Result<Vec<String>> {
        let path = self.sub_paths().task.join(task);
        if !path.is_dir() {
            return Err(crate::Error::TaskNotFound(task.to_string()));
        }
        list_dirs(&path)
    }

    /// Every task with its scripts, tasks sorted by name.
    pub fn all_scripts(&self) -> crate::Result<Vec<(String, Vec<String>)>> {
        self.tasks()?
            .into_iter()
            .map(|task| {
                let scripts = self.scripts(&task)?;
                Ok((task, scripts))
            })
            .collect()
    }

    pub fn script(&self, task: &str, name: &str) -> crate::Result<Script> {
        let task_path = self.sub_paths().task.join(task);
        if !task_path.is_dir() {
            return Err(crate::Error::TaskNotFound(task.to_string()));
        }
        let path = task_path.join(name);
        if !path.is_dir() {
            return Err(crate::Error::ScriptNotFound {
                task: task.to_string(),
                script: name.to_string(),
            });
        }
        Script::load(task, path)
    }

    /// Build every unbuilt environment, or all of them when `force`.
    ///
    /// Returns the names that were built. Stops at the first failure.
    pub fn build_all(&self, force: bool) -> crate::Result<Vec<String>> {
        let mut built = Vec::new();
        for mut env in self.environments()? {
            if env.is_built()? && !force {
                debug!(env = env.name(), "already built, skipping");
                continue;
            }
            env.build()?;
            built.push(env.name().to_string());
        }
        Ok(built)
    }

    /// Delete every built environment, returning the names removed.
    pub fn clear_all(&self) -> crate::Result<Vec<String>> {
        let mut removed = Vec::new();
        for mut env in self.environments()? {
            if !env.is_built()? {
                continue;
            }
            env.delete_built()?;
            removed.push(env.name().to_string());
        }
        Ok(removed)
    }

    /// Delete the environment if built, then build it from scratch.
    pub fn rebuild(&self, name: &str) -> crate::Result<()> {
        let mut env = self.environment(name)?;
        if env.is_built()? {
            env.delete_built()?;
        }
        info!("Rebuilding env {name}");
        env.build()
    }
}

/// Sorted names of the directories directly inside `path`; a missing
/// directory lists as empty.
fn list_dirs(path: &Path) -> crate::Result<Vec<String>> {
    if !path.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(path).map_err(|e| crate::Error::ReadFailed {
        path: path.to_path_buf(),
        error: e,
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
