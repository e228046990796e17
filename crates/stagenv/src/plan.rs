// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Ordered execution of the stages that materialize one environment.

use tracing::{debug, info};

use crate::EnvironmentSpec;
use crate::runner::CommandRunner;
use crate::stage::{
    BioconductorStage, CranStage, GithubStage, PipStage, PrimaryStage, SecondaryStage,
};

#[cfg(test)]
#[path = "./plan_test.rs"]
mod plan_test;

/// Build plan for one environment.
///
/// The primary stage always runs first, then each non-empty secondary
/// stage in a fixed order: pip, CRAN, Bioconductor, GitHub. The first
/// failing stage aborts the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentBuildPlan {
    primary: PrimaryStage,
    pip: PipStage,
    cran: CranStage,
    bioconductor: BioconductorStage,
    github: GithubStage,
}

impl EnvironmentBuildPlan {
    /// Derive a plan from a spec, targeting the manager-level
    /// environment `env_name`.
    pub fn from_spec<S: Into<String>>(spec: &EnvironmentSpec, env_name: S) -> Self {
        let r = spec.r_section();
        Self {
            primary: PrimaryStage::new(&spec.primary(), env_name),
            pip: PipStage::new(spec.pip_deps()),
            cran: CranStage::new(&r),
            bioconductor: BioconductorStage::new(&r),
            github: GithubStage::new(&r),
        }
    }

    pub fn primary(&self) -> &PrimaryStage {
        &self.primary
    }

    /// Secondary stages in execution order, including empty ones.
    pub fn secondary_stages(&self) -> [&dyn SecondaryStage; 4] {
        [&self.pip, &self.cran, &self.bioconductor, &self.github]
    }

    /// Create the environment and run every secondary install.
    ///
    /// Not idempotent: the manager may refuse to create an environment
    /// that already exists. Callers wanting a rebuild delete first.
    pub fn build(&mut self, runner: &dyn CommandRunner) -> crate::Result<()> {
        self.primary.check_command_available(runner)?;
        let create = self.primary.create_command();
        self.primary.execute(runner, self.primary.kind(), &create, "create")?;
        self.install_secondary(runner)
    }

    /// Re-run the secondary installs against an existing environment.
    pub fn update(&mut self, runner: &dyn CommandRunner) -> crate::Result<()> {
        self.primary.check_command_available(runner)?;
        self.install_secondary(runner)
    }

    /// Remove the whole manager-level environment.
    pub fn delete(&mut self, runner: &dyn CommandRunner) -> crate::Result<()> {
        self.primary.check_command_available(runner)?;
        let remove = self.primary.remove_command();
        self.primary.execute(runner, self.primary.kind(), &remove, "remove")
    }

    /// Run `argv` inside the manager-level environment.
    pub fn run_under_env(
        &mut self,
        runner: &dyn CommandRunner,
        argv: &[String],
    ) -> crate::Result<()> {
        self.primary.check_command_available(runner)?;
        let cmd = self.primary.run_under_env_command(argv);
        self.primary.execute(runner, self.primary.kind(), &cmd, "run command in")
    }

    fn install_secondary(&self, runner: &dyn CommandRunner) -> crate::Result<()> {
        for stage in self.secondary_stages() {
            if stage.is_empty() {
                debug!(stage = %stage.kind(), "no dependents, skipping stage");
                continue;
            }
            info!(
                "Installing {} {} package(s) into {}",
                stage.dependents().len(),
                stage.kind(),
                self.primary.env_name()
            );
            let cmd = self.primary.run_under_env_command(&stage.install_command());
            let action = format!("install {} packages into", stage.kind());
            self.primary.execute(runner, stage.kind(), &cmd, &action)?;
        }
        Ok(())
    }
}
