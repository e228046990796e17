// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! stagenv - Staged Package-Manager Environments
//!
//! This crate provides the core library for declaring per-task computational
//! environments as data, materializing them through a sequence of external
//! package-manager invocations, and running scripts inside them.
//!
//! # Overview
//!
//! A project holds environments under `Environments/<name>/build.yaml` and
//! scripts under `Tasks/<task>/<script>/interface.yaml`. Building an
//! environment creates a conda-style environment and then installs
//! secondary packages (pip, CRAN, Bioconductor, GitHub) inside it. Whether an
//! environment is built is persisted in `Environments/<name>/.meta.json`.
//!
//! # Example
//!
//! ```yaml
//! # Environments/py-env/build.yaml
//! name: py-env
//!
//! conda:
//!   channels:
//!     - conda-forge
//!   deps:
//!     - python=3.11
//!     - numpy
//!
//! pip:
//!   deps:
//!     - h5py
//!
//! R:
//!   cran:
//!     mirror: https://cloud.r-project.org
//!     deps: [ggplot2]
//! ```

pub mod environment;
pub mod error;
pub mod plan;
pub mod project;
pub mod runner;
pub mod script;
pub mod spec;
pub mod stage;
pub mod state;
pub mod template;

#[cfg(test)]
mod fixtures;

pub use environment::EnvironmentHandle;
pub use error::{Error, ErrorKind, Result};
pub use plan::EnvironmentBuildPlan;
pub use project::{Project, SubPaths};
pub use runner::{CommandRunner, RunStatus, SystemRunner};
pub use script::{ResolvedRun, Script, ScriptExecutor};
pub use spec::{CondaSection, EnvironmentSpec, PackageList, RSection, RegistrySection};
pub use stage::{
    BioconductorStage, CranStage, GithubStage, PipStage, PrimaryStage, SecondaryStage, StageKind,
};
pub use state::{BuildState, BuildStateStore};
pub use template::{
    Arguments, CommandTemplate, InterfaceSpec, ParamSpec, ParamType, ResolvedCommand,
};

/// Well-known filename for environment build documents.
pub const BUILD_FILENAME: &str = "build.yaml";

/// Well-known filename for directory metadata sidecars.
pub const META_FILENAME: &str = ".meta.json";

/// Well-known filename for script interface documents.
pub const INTERFACE_FILENAME: &str = "interface.yaml";

/// Well-known filename for human-readable descriptions.
pub const README_FILENAME: &str = "README.md";
