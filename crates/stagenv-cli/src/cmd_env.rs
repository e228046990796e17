// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `stagenv env` commands.

use clap::{Args, Subcommand};
use colored::Colorize;
use miette::Result;

use crate::ProjectFlags;

/// Build, update, delete and list environments
#[derive(Debug, Args)]
pub struct CmdEnv {
    #[clap(subcommand)]
    cmd: EnvCommand,
}

#[derive(Debug, Subcommand)]
enum EnvCommand {
    /// List environments and their build status
    List(EnvList),

    /// Build one environment, or every unbuilt one with --all
    Build(EnvBuild),

    /// Re-run the secondary installs of a built environment
    Update(EnvUpdate),

    /// Remove a built environment, or every built one with --all
    Delete(EnvDelete),

    /// Delete and build an environment from scratch
    Rebuild(EnvRebuild),
}

impl CmdEnv {
    pub fn run(&mut self) -> Result<i32> {
        match &mut self.cmd {
            EnvCommand::List(cmd) => cmd.run(),
            EnvCommand::Build(cmd) => cmd.run(),
            EnvCommand::Update(cmd) => cmd.run(),
            EnvCommand::Delete(cmd) => cmd.run(),
            EnvCommand::Rebuild(cmd) => cmd.run(),
        }
    }
}

#[derive(Debug, Args)]
struct EnvList {
    #[clap(flatten)]
    project: ProjectFlags,
}

impl EnvList {
    fn run(&mut self) -> Result<i32> {
        let project = self.project.open()?;
        let envs = project.scan_environments()?;
        if envs.is_empty() {
            println!("No environments found in {}", project.path().display());
            return Ok(0);
        }

        println!("{}", format!("Environments in {}:", project.name()).bold());
        println!();
        for (name, env) in &envs {
            let env = match env {
                Ok(env) => env,
                Err(err) => {
                    println!("  {:<20} {}", name.cyan(), err.to_string().red());
                    continue;
                }
            };
            let status = match env.build_time() {
                Ok(Some(time)) => {
                    format!("built {}", time.format("%Y-%m-%d %H:%M:%S UTC")).green()
                }
                Ok(None) => "not built".yellow(),
                Err(err) => err.to_string().red(),
            };
            println!(
                "  {:<20} {:<30} {}",
                env.name().cyan(),
                env.manager_name().dimmed(),
                status
            );
        }
        Ok(0)
    }
}

#[derive(Debug, Args)]
struct EnvBuild {
    #[clap(flatten)]
    project: ProjectFlags,

    /// Environment to build
    #[clap(required_unless_present = "all", conflicts_with = "all")]
    name: Option<String>,

    /// Build every environment that is not built yet
    #[clap(long)]
    all: bool,

    /// With --all, also rebuild environments that are already built
    #[clap(long, requires = "all")]
    force: bool,
}

impl EnvBuild {
    fn run(&mut self) -> Result<i32> {
        let project = self.project.open()?;
        match &self.name {
            Some(name) => {
                project.environment(name)?.build()?;
                println!("{} {}", "Built".green(), name);
            }
            None => {
                let built = project.build_all(self.force)?;
                if built.is_empty() {
                    println!("All environments are already built");
                }
                for name in built {
                    println!("{} {}", "Built".green(), name);
                }
            }
        }
        Ok(0)
    }
}

#[derive(Debug, Args)]
struct EnvUpdate {
    #[clap(flatten)]
    project: ProjectFlags,

    /// Environment to update
    name: String,
}

impl EnvUpdate {
    fn run(&mut self) -> Result<i32> {
        let project = self.project.open()?;
        project.environment(&self.name)?.update()?;
        println!("{} {}", "Updated".green(), self.name);
        Ok(0)
    }
}

#[derive(Debug, Args)]
struct EnvDelete {
    #[clap(flatten)]
    project: ProjectFlags,

    /// Environment to delete
    #[clap(required_unless_present = "all", conflicts_with = "all")]
    name: Option<String>,

    /// Delete every built environment
    #[clap(long)]
    all: bool,
}

impl EnvDelete {
    fn run(&mut self) -> Result<i32> {
        let project = self.project.open()?;
        let removed = match &self.name {
            Some(name) => {
                let mut env = project.environment(name)?;
                if !env.is_built()? {
                    println!("{} is not built, nothing to delete", name);
                    return Ok(0);
                }
                env.delete_built()?;
                vec![name.clone()]
            }
            None => project.clear_all()?,
        };
        if removed.is_empty() {
            println!("No built environments to delete");
        }
        for name in removed {
            println!("{} {}", "Deleted".red(), name);
        }
        Ok(0)
    }
}

#[derive(Debug, Args)]
struct EnvRebuild {
    #[clap(flatten)]
    project: ProjectFlags,

    /// Environment to rebuild
    name: String,
}

impl EnvRebuild {
    fn run(&mut self) -> Result<i32> {
        let project = self.project.open()?;
        project.rebuild(&self.name)?;
        println!("{} {}", "Rebuilt".green(), self.name);
        Ok(0)
    }
}
