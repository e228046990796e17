// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! On-disk environments and their built/unbuilt lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::plan::EnvironmentBuildPlan;
use crate::runner::CommandRunner;
use crate::state::{BuildState, BuildStateStore};
use crate::{BUILD_FILENAME, EnvironmentSpec, ErrorKind};

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// A named environment directory coupled to its build plan and state.
///
/// The handle is either unbuilt or built, decided solely by the
/// persisted [`BuildState`]. Deleting a built environment tears down the
/// manager-level environment but leaves the directory in place.
pub struct EnvironmentHandle {
    name: String,
    path: PathBuf,
    spec: EnvironmentSpec,
    plan: EnvironmentBuildPlan,
    state: BuildStateStore,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for EnvironmentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentHandle")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("manager_name", &self.manager_name())
            .finish_non_exhaustive()
    }
}

impl EnvironmentHandle {
    /// Open the environment at `path`, loading its `build.yaml`.
    ///
    /// The manager-level name is `<project>-<spec name>`.
    pub fn open<P: AsRef<Path>>(
        project_name: &str,
        path: P,
        runner: Arc<dyn CommandRunner>,
    ) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let build_file = path.join(BUILD_FILENAME);
        if !build_file.is_file() {
            return Err(crate::Error::NotFoundAtPath(build_file));
        }
        let spec = EnvironmentSpec::load(&build_file)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| spec.name.clone());
        let plan = EnvironmentBuildPlan::from_spec(&spec, format!("{project_name}-{}", spec.name));
        Ok(Self {
            name,
            state: BuildStateStore::new(&path),
            path,
            spec,
            plan,
            runner,
        })
    }

    /// Directory name of the environment.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> &EnvironmentSpec {
        &self.spec
    }

    pub fn plan(&self) -> &EnvironmentBuildPlan {
        &self.plan
    }

    /// Name of the environment as the manager knows it.
    pub fn manager_name(&self) -> &str {
        self.plan.primary().env_name()
    }

    pub fn build_state(&self) -> crate::Result<BuildState> {
        self.state.load()
    }

    pub fn build_time(&self) -> crate::Result<Option<DateTime<Utc>>> {
        Ok(self.state.load()?.build_time)
    }

    pub fn is_built(&self) -> crate::Result<bool> {
        Ok(self.state.load()?.is_built())
    }

    /// Run the full build plan, then stamp the build time.
    ///
    /// On an already built handle this re-runs the plan against the
    /// existing manager-level environment. A failed stage leaves the
    /// handle unbuilt, even if it was built before.
    pub fn build(&mut self) -> crate::Result<()> {
        info!("Start building env {}", self.name);
        if let Err(err) = self.plan.build(self.runner.as_ref()) {
            if err.kind() == ErrorKind::ExternalProcess {
                warn!("Marking env {} unbuilt after failed build", self.name);
                self.state.clear()?;
            }
            return Err(err);
        }
        self.state.mark_built(Utc::now())?;
        info!("The env {} has been built", self.name);
        Ok(())
    }

    /// Re-apply the secondary installs to a built environment.
    pub fn update(&mut self) -> crate::Result<()> {
        self.ensure_built()?;
        info!("Start updating env {}", self.name);
        self.plan.update(self.runner.as_ref())?;
        self.state.mark_built(Utc::now())?;
        info!("The env {} has been updated", self.name);
        Ok(())
    }

    /// Tear down the manager-level environment and clear the build time.
    pub fn delete_built(&mut self) -> crate::Result<()> {
        info!("Removing built env {}", self.name);
        self.plan.delete(self.runner.as_ref())?;
        self.state.clear()?;
        info!("The env {} has been removed", self.name);
        Ok(())
    }

    /// Run `argv` inside the built environment.
    pub fn run_command(&mut self, argv: &[String]) -> crate::Result<()> {
        self.ensure_built()?;
        self.plan.run_under_env(self.runner.as_ref(), argv)
    }

    fn ensure_built(&self) -> crate::Result<()> {
        if self.is_built()? {
            Ok(())
        } else {
            Err(crate::Error::NotBuilt(self.name.clone()))
        }
    }
}
