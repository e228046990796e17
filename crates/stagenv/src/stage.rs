// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Package-manager stages and the command lines they render.

use tracing::{error, info, warn};

use crate::runner::CommandRunner;
use crate::spec::{CondaSection, DEFAULT_MANAGER, RSection};

#[cfg(test)]
#[path = "./stage_test.rs"]
mod stage_test;

/// Generic package installer run inside the environment.
pub const PIP_COMMAND: &str = "pip";

/// R interpreter used to evaluate install expressions.
pub const RSCRIPT_COMMAND: &str = "Rscript";

/// Identifies a stage in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Conda,
    Pip,
    Cran,
    Bioconductor,
    Github,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conda => "conda",
            Self::Pip => "pip",
            Self::Cran => "cran",
            Self::Bioconductor => "bioconductor",
            Self::Github => "github",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The primary environment manager stage.
///
/// Creates and removes the manager-level environment and routes every
/// later command through `<manager> run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryStage {
    command: String,
    env_name: String,
    channels: Vec<String>,
    deps: Vec<String>,
}

impl PrimaryStage {
    pub fn new<S: Into<String>>(section: &CondaSection, env_name: S) -> Self {
        Self {
            command: section.command.clone(),
            env_name: env_name.into(),
            channels: section.channels.clone(),
            deps: section.deps.clone(),
        }
    }

    pub fn kind(&self) -> StageKind {
        StageKind::Conda
    }

    /// Manager binary currently in use.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Name of the manager-level environment.
    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn dependents(&self) -> &[String] {
        &self.deps
    }

    pub fn create_command(&self) -> Vec<String> {
        let mut cmd = vec![
            self.command.clone(),
            "create".to_string(),
            "-n".to_string(),
            self.env_name.clone(),
        ];
        for channel in &self.channels {
            cmd.push("-c".to_string());
            cmd.push(channel.clone());
        }
        cmd.extend(self.deps.iter().cloned());
        cmd.push("--yes".to_string());
        cmd
    }

    pub fn remove_command(&self) -> Vec<String> {
        vec![
            self.command.clone(),
            "env".to_string(),
            "remove".to_string(),
            "-n".to_string(),
            self.env_name.clone(),
        ]
    }

    pub fn run_under_env_command(&self, inner: &[String]) -> Vec<String> {
        let mut cmd = vec![
            self.command.clone(),
            "run".to_string(),
            "--live-stream".to_string(),
            "-n".to_string(),
            self.env_name.clone(),
        ];
        cmd.extend(inner.iter().cloned());
        cmd
    }

    /// Make sure the manager binary resolves, falling back to
    /// [`DEFAULT_MANAGER`] at most once.
    pub fn check_command_available(&mut self, runner: &dyn CommandRunner) -> crate::Result<()> {
        if runner.is_available(&self.command) {
            return Ok(());
        }
        if self.command != DEFAULT_MANAGER {
            warn!(
                configured = %self.command,
                fallback = DEFAULT_MANAGER,
                "manager not installed, falling back"
            );
            self.command = DEFAULT_MANAGER.to_string();
            if runner.is_available(&self.command) {
                return Ok(());
            }
        }
        Err(crate::Error::ManagerUnavailable {
            command: self.command.clone(),
        })
    }

    /// Log and run `argv` on behalf of stage `kind`, mapping a failed exit
    /// into [`crate::Error::ProcessFailed`] for `action`.
    pub(crate) fn execute(
        &self,
        runner: &dyn CommandRunner,
        kind: StageKind,
        argv: &[String],
        action: &str,
    ) -> crate::Result<()> {
        info!(stage = %kind, "Run command '{}'", argv.join(" "));
        let status = runner.run(argv).map_err(|e| crate::Error::SpawnFailed {
            program: argv.first().cloned().unwrap_or_default(),
            error: e,
        })?;
        if status.success() {
            return Ok(());
        }
        error!(stage = %kind, "Failed to {action} env {}", self.env_name);
        Err(crate::Error::ProcessFailed {
            manager: self.command.clone(),
            action: action.to_string(),
            target: self.env_name.clone(),
            code: status.code,
        })
    }
}

/// An installer that runs inside an already created environment.
pub trait SecondaryStage {
    fn kind(&self) -> StageKind;

    fn dependents(&self) -> &[String];

    /// Command line to run under the environment, without the
    /// `<manager> run` prefix.
    fn install_command(&self) -> Vec<String>;

    /// Stages with nothing to install are skipped entirely.
    fn is_empty(&self) -> bool {
        self.dependents().is_empty()
    }
}

/// `pip install ...`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipStage {
    deps: Vec<String>,
}

impl PipStage {
    pub fn new(deps: &[String]) -> Self {
        Self {
            deps: deps.to_vec(),
        }
    }
}

impl SecondaryStage for PipStage {
    fn kind(&self) -> StageKind {
        StageKind::Pip
    }

    fn dependents(&self) -> &[String] {
        &self.deps
    }

    fn install_command(&self) -> Vec<String> {
        let mut cmd = vec![PIP_COMMAND.to_string(), "install".to_string()];
        cmd.extend(self.deps.iter().cloned());
        cmd
    }
}

/// `install.packages(...)` against a CRAN mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CranStage {
    mirror: String,
    deps: Vec<String>,
}

impl CranStage {
    pub fn new(r: &RSection) -> Self {
        Self {
            mirror: r.cran_mirror().to_string(),
            deps: r.cran.as_ref().map(|c| c.deps.clone()).unwrap_or_default(),
        }
    }

    pub fn mirror(&self) -> &str {
        &self.mirror
    }

    pub fn expression(&self) -> String {
        format!(
            "install.packages({}, repos = {})",
            r_packages(&self.deps),
            r_string(&self.mirror)
        )
    }
}

impl SecondaryStage for CranStage {
    fn kind(&self) -> StageKind {
        StageKind::Cran
    }

    fn dependents(&self) -> &[String] {
        &self.deps
    }

    fn install_command(&self) -> Vec<String> {
        rscript(self.expression())
    }
}

/// `BiocManager::install(...)`, installing BiocManager first if needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BioconductorStage {
    mirror: Option<String>,
    bootstrap_mirror: String,
    deps: Vec<String>,
}

impl BioconductorStage {
    pub fn new(r: &RSection) -> Self {
        let section = r.bioconductor.clone().unwrap_or_default();
        Self {
            mirror: section.mirror,
            bootstrap_mirror: r.cran_mirror().to_string(),
            deps: section.deps,
        }
    }

    pub fn expression(&self) -> String {
        let mut expr = bootstrap("BiocManager", &self.bootstrap_mirror);
        if let Some(mirror) = &self.mirror {
            expr.push_str(&format!("options(BioC_mirror = {}); ", r_string(mirror)));
        }
        expr.push_str(&format!(
            "BiocManager::install({}, update = FALSE, ask = FALSE)",
            r_packages(&self.deps)
        ));
        expr
    }
}

impl SecondaryStage for BioconductorStage {
    fn kind(&self) -> StageKind {
        StageKind::Bioconductor
    }

    fn dependents(&self) -> &[String] {
        &self.deps
    }

    fn install_command(&self) -> Vec<String> {
        rscript(self.expression())
    }
}

/// `remotes::install_github(...)`, installing remotes first if needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GithubStage {
    bootstrap_mirror: String,
    deps: Vec<String>,
}

impl GithubStage {
    pub fn new(r: &RSection) -> Self {
        Self {
            bootstrap_mirror: r.cran_mirror().to_string(),
            deps: r.github.as_ref().map(|g| g.deps.clone()).unwrap_or_default(),
        }
    }

    pub fn expression(&self) -> String {
        format!(
            "{}remotes::install_github({})",
            bootstrap("remotes", &self.bootstrap_mirror),
            r_packages(&self.deps)
        )
    }
}

impl SecondaryStage for GithubStage {
    fn kind(&self) -> StageKind {
        StageKind::Github
    }

    fn dependents(&self) -> &[String] {
        &self.deps
    }

    fn install_command(&self) -> Vec<String> {
        rscript(self.expression())
    }
}

fn rscript(expr: String) -> Vec<String> {
    vec![RSCRIPT_COMMAND.to_string(), "-e".to_string(), expr]
}

fn bootstrap(package: &str, mirror: &str) -> String {
    format!(
        "if (!requireNamespace({pkg}, quietly = TRUE)) install.packages({pkg}, repos = {mirror}); ",
        pkg = r_string(package),
        mirror = r_string(mirror),
    )
}

/// Quote a value as an R string literal.
pub(crate) fn r_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// A single quoted name, or a `c(...)` vector for several.
pub(crate) fn r_packages(deps: &[String]) -> String {
    match deps {
        [single] => r_string(single),
        many => {
            let quoted: Vec<String> = many.iter().map(|d| r_string(d)).collect();
            format!("c({})", quoted.join(", "))
        }
    }
}
