// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `stagenv run` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use stagenv::{Arguments, ScriptExecutor};

use crate::ProjectFlags;

#[cfg(test)]
#[path = "./cmd_run_test.rs"]
mod cmd_run_test;

/// Run a script inside its environment
#[derive(Debug, Args)]
pub struct CmdRun {
    #[clap(flatten)]
    project: ProjectFlags,

    /// Script to run, as TASK/SCRIPT
    reference: String,

    /// Positional arguments, bound to parameters in declared order
    args: Vec<String>,

    /// Keyword argument (KEY=VALUE), may be repeated
    #[clap(short = 'a', long = "arg", value_parser = parse_key_value)]
    kwargs: Vec<(String, String)>,

    /// Print the resolved command without running it
    #[clap(long)]
    dry_run: bool,
}

impl CmdRun {
    pub fn run(&mut self) -> Result<i32> {
        let project = self.project.open()?;
        let args = self.arguments()?;
        let executor = ScriptExecutor::new(&project);

        if self.dry_run {
            let run = executor.resolve(&self.reference, &args)?;
            let status = if run.built {
                "built".green()
            } else {
                "not built".yellow()
            };
            println!("{} {} ({}, {})", "Environment:".bold(), run.env, run.manager_name, status);
            println!("{} {}", "Command:".bold(), run.command);
            return Ok(0);
        }

        executor.run(&self.reference, &args)?;
        Ok(0)
    }

    fn arguments(&self) -> Result<Arguments> {
        build_arguments(&self.args, &self.kwargs)
    }
}

/// Parse one `KEY=VALUE` keyword argument.
pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn build_arguments(positional: &[String], keyword: &[(String, String)]) -> Result<Arguments> {
    let mut args = Arguments::new();
    for value in positional {
        args = args.arg(value.as_str());
    }
    for (key, value) in keyword {
        if args.keyword.contains_key(key) {
            return Err(stagenv::Error::DuplicateArgument(key.clone()).into());
        }
        args = args.kwarg(key.as_str(), value.as_str());
    }
    Ok(args)
}
