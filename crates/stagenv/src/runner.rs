// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Subprocess boundary for package-manager and script invocations.

use std::process::Command;

use tracing::debug;

#[cfg(test)]
#[path = "./runner_test.rs"]
mod runner_test;

/// Exit status of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// Exit code, or `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for RunStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Runs external programs to completion.
///
/// Every stage and script execution goes through this trait, one blocking
/// invocation at a time.
pub trait CommandRunner: Send + Sync {
    /// Whether `program` resolves to an executable.
    fn is_available(&self, program: &str) -> bool;

    /// Run `argv[0]` with the remaining arguments and wait for it to exit.
    fn run(&self, argv: &[String]) -> std::io::Result<RunStatus>;
}

/// Runs programs on the host, streaming their output to the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn is_available(&self, program: &str) -> bool {
        let found = which::which(program);
        debug!(program, found = ?found.as_ref().ok(), "resolving program");
        found.is_ok()
    }

    fn run(&self, argv: &[String]) -> std::io::Result<RunStatus> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line")
        })?;
        let status = Command::new(program).args(args).status()?;
        Ok(status.into())
    }
}
