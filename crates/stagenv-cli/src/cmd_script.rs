// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `stagenv script` commands.

use clap::{Args, Subcommand};
use colored::Colorize;
use miette::Result;

use crate::ProjectFlags;

/// List tasks and their scripts
#[derive(Debug, Args)]
pub struct CmdScript {
    #[clap(subcommand)]
    cmd: ScriptCommand,
}

#[derive(Debug, Subcommand)]
enum ScriptCommand {
    /// List scripts, optionally only those of one task
    List(ScriptList),
}

impl CmdScript {
    pub fn run(&mut self) -> Result<i32> {
        match &mut self.cmd {
            ScriptCommand::List(cmd) => cmd.run(),
        }
    }
}

#[derive(Debug, Args)]
struct ScriptList {
    #[clap(flatten)]
    project: ProjectFlags,

    /// Only list scripts of this task
    task: Option<String>,
}

impl ScriptList {
    fn run(&mut self) -> Result<i32> {
        let project = self.project.open()?;
        let tasks = match &self.task {
            Some(task) => vec![(task.clone(), project.scripts(task)?)],
            None => project.all_scripts()?,
        };
        if tasks.is_empty() {
            println!("No tasks found in {}", project.path().display());
            return Ok(0);
        }

        for (task, scripts) in tasks {
            println!("{}", task.bold());
            for name in scripts {
                let script = project.script(&task, &name)?;
                let env = format!("[{}]", script.env_name()).dimmed();
                match &script.interface().description {
                    Some(description) => {
                        println!("  {}/{} {} {}", task, name.cyan(), env, description)
                    }
                    None => println!("  {}/{} {}", task, name.cyan(), env),
                }
            }
        }
        Ok(0)
    }
}
