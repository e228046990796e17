// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! stagenv - Staged Package-Manager Environments CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_env;
mod cmd_run;
mod cmd_script;

use cmd_env::CmdEnv;
use cmd_run::CmdRun;
use cmd_script::CmdScript;

#[derive(Parser)]
#[clap(
    name = "stagenv",
    about = "Staged Package-Manager Environments",
    version,
    long_about = "Build per-task conda environments from build.yaml files and run scripts inside them"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ProjectFlags {
    /// Project root holding Environments/ and Tasks/
    #[clap(long, short = 'p', env = "STAGENV_PROJECT", default_value = ".")]
    pub project: PathBuf,
}

impl ProjectFlags {
    pub fn open(&self) -> Result<stagenv::Project> {
        Ok(stagenv::Project::open(&self.project)?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Build, update, delete and list environments
    Env(CmdEnv),

    /// List tasks and their scripts
    Script(CmdScript),

    /// Run a script inside its environment
    Run(CmdRun),
}

impl Opt {
    fn run(self) -> Result<i32> {
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::INFO,
            (false, 1) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_target(false)
            .init();

        match self.cmd {
            Command::Env(mut cmd) => cmd.run(),
            Command::Script(mut cmd) => cmd.run(),
            Command::Run(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
