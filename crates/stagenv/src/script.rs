// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Scripts and their execution inside built environments.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::project::Project;
use crate::template::{Arguments, CommandTemplate, InterfaceSpec, ResolvedCommand};
use crate::{INTERFACE_FILENAME, README_FILENAME};

#[cfg(test)]
#[path = "./script_test.rs"]
mod script_test;

/// Separator between task and script in a script reference.
pub const REFERENCE_SEPARATOR: char = '/';

/// A script directory: an `interface.yaml` plus bundled files.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    task: String,
    name: String,
    path: PathBuf,
    interface: InterfaceSpec,
}

impl Script {
    /// Load the script in directory `path`, belonging to `task`.
    pub fn load<P: AsRef<Path>>(task: &str, path: P) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let interface_path = path.join(INTERFACE_FILENAME);
        if !interface_path.is_file() {
            return Err(crate::Error::NotFoundAtPath(interface_path));
        }
        let interface = InterfaceSpec::load(&interface_path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            task: task.to_string(),
            name,
            path,
            interface,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interface(&self) -> &InterfaceSpec {
        &self.interface
    }

    /// Name of the environment the script runs in.
    pub fn env_name(&self) -> &str {
        &self.interface.env
    }

    /// Regular files bundled with the script, excluding the interface
    /// document and the README, sorted.
    pub fn local_files(&self) -> crate::Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.path).map_err(|e| crate::Error::ReadFailed {
            path: self.path.clone(),
            error: e,
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            // follows symlinks
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name != INTERFACE_FILENAME && name != README_FILENAME {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    /// The command template with bundled file names made absolute.
    pub fn command_template(&self) -> crate::Result<CommandTemplate> {
        let files = self.local_files()?;
        CommandTemplate::parse(self.interface.command.as_str())?
            .with_local_files(&self.path, &files)
    }

    pub fn resolve(&self, args: &Arguments) -> crate::Result<ResolvedCommand> {
        self.command_template()?.bind(&self.interface.inputs, args)
    }
}

/// A resolved but not executed script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRun {
    pub env: String,
    pub manager_name: String,
    pub built: bool,
    pub command: ResolvedCommand,
}

/// Runs `TASK/SCRIPT` references inside their environments.
#[derive(Debug)]
pub struct ScriptExecutor<'a> {
    project: &'a Project,
}

impl<'a> ScriptExecutor<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// Split `TASK/SCRIPT` into its two parts.
    pub fn split_reference(reference: &str) -> crate::Result<(&str, &str)> {
        match reference.split_once(REFERENCE_SEPARATOR) {
            Some((task, script))
                if !task.is_empty()
                    && !script.is_empty()
                    && !script.contains(REFERENCE_SEPARATOR) =>
            {
                Ok((task, script))
            }
            _ => Err(crate::Error::InvalidReference(reference.to_string())),
        }
    }

    pub fn script(&self, reference: &str) -> crate::Result<Script> {
        let (task, name) = Self::split_reference(reference)?;
        self.project.script(task, name)
    }

    /// Resolve the command a run would execute, without checking the
    /// build state or running anything.
    pub fn resolve(&self, reference: &str, args: &Arguments) -> crate::Result<ResolvedRun> {
        let script = self.script(reference)?;
        let env = self.project.environment(script.env_name())?;
        let command = script.resolve(args)?;
        Ok(ResolvedRun {
            env: env.name().to_string(),
            manager_name: env.manager_name().to_string(),
            built: env.is_built()?,
            command,
        })
    }

    /// Run the referenced script inside its built environment.
    pub fn run(&self, reference: &str, args: &Arguments) -> crate::Result<()> {
        let script = self.script(reference)?;
        let mut env = self.project.environment(script.env_name())?;
        if !env.is_built()? {
            return Err(crate::Error::NotBuilt(env.name().to_string()));
        }
        let command = script.resolve(args)?;
        let line = command.command_line();
        info!("Running {reference} in env {}: {line}", env.name());
        let argv = shlex::split(&line).unwrap_or_else(|| command.into_argv());
        env.run_command(&argv)
    }
}
