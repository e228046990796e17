// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for stagenv operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[cfg(test)]
#[path = "./error_test.rs"]
mod error_test;

/// Convenience Result type with stagenv Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing configuration; the operation cannot proceed.
    Configuration,
    /// A referenced environment, task, script or file does not exist.
    NotFound,
    /// A spawned package-manager or script process failed.
    ExternalProcess,
    /// The environment is in the wrong build state for the request.
    State,
    /// Filesystem failure outside of the above.
    Io,
}

/// Errors that can occur during stagenv operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Neither the configured manager nor the default one can be found
    #[error("Environment manager '{command}' is not installed")]
    #[diagnostic(
        code(stagenv::manager_unavailable),
        help("Install {command} or make sure it is on PATH")
    )]
    ManagerUnavailable { command: String },

    /// Invalid YAML in a build or interface document
    #[error("Invalid document {path:?}: {error}")]
    #[diagnostic(
        code(stagenv::invalid_yaml),
        help("Check YAML syntax and required fields")
    )]
    InvalidYaml {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },

    /// Metadata sidecar could not be interpreted
    #[error("Invalid metadata in {path:?}: {reason}")]
    #[diagnostic(code(stagenv::invalid_metadata))]
    InvalidMetadata { path: PathBuf, reason: String },

    /// Command template could not be parsed
    #[error("Invalid command template '{template}': {reason}")]
    #[diagnostic(code(stagenv::invalid_template))]
    InvalidTemplate { template: String, reason: String },

    /// Required parameter not bound
    #[error("Missing required parameter '{0}'")]
    #[diagnostic(
        code(stagenv::missing_parameter),
        help("Pass it positionally or as a keyword argument")
    )]
    MissingParameter(String),

    /// Keyword argument names no declared parameter
    #[error("Unknown parameter '{name}'")]
    #[diagnostic(
        code(stagenv::unknown_parameter),
        help("{}", known_parameters_message(known))
    )]
    UnknownParameter { name: String, known: Vec<String> },

    /// More positional arguments than declared parameters
    #[error("Too many positional arguments: expected at most {expected}, got {actual}")]
    #[diagnostic(code(stagenv::too_many_arguments))]
    TooManyArguments { expected: usize, actual: usize },

    /// Parameter bound both positionally and by keyword
    #[error("Parameter '{0}' given more than once")]
    #[diagnostic(code(stagenv::duplicate_argument))]
    DuplicateArgument(String),

    /// Argument failed type coercion or choice validation
    #[error("Invalid value '{value}' for parameter '{name}': {reason}")]
    #[diagnostic(code(stagenv::invalid_argument))]
    InvalidArgument {
        name: String,
        value: String,
        reason: String,
    },

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(stagenv::validation_failed))]
    ValidationFailed(String),

    /// Environment directory not found in the project
    #[error("Environment '{0}' not found")]
    #[diagnostic(code(stagenv::environment_not_found))]
    EnvironmentNotFound(String),

    /// Task directory not found in the project
    #[error("Task '{0}' not found")]
    #[diagnostic(code(stagenv::task_not_found))]
    TaskNotFound(String),

    /// Script directory not found under a task
    #[error("Script '{script}' not found in task '{task}'")]
    #[diagnostic(code(stagenv::script_not_found))]
    ScriptNotFound { task: String, script: String },

    /// Required file not found at path
    #[error("File not found at {0:?}")]
    #[diagnostic(code(stagenv::not_found_at_path))]
    NotFoundAtPath(PathBuf),

    /// Script reference is not of the form TASK/SCRIPT
    #[error("Invalid script reference '{0}'")]
    #[diagnostic(
        code(stagenv::invalid_reference),
        help("Scripts are referenced as TASK/SCRIPT")
    )]
    InvalidReference(String),

    /// Subprocess exited unsuccessfully
    #[error(
        "Failed to {action} env {target} with {manager} (exit code: {})",
        exit_code_message(*code)
    )]
    #[diagnostic(code(stagenv::process_failed))]
    ProcessFailed {
        manager: String,
        action: String,
        target: String,
        code: Option<i32>,
    },

    /// Subprocess could not be started
    #[error("Failed to start '{program}'")]
    #[diagnostic(code(stagenv::spawn_failed))]
    SpawnFailed {
        program: String,
        #[source]
        error: std::io::Error,
    },

    /// Operation requires a built environment
    #[error("Environment '{0}' is not built")]
    #[diagnostic(
        code(stagenv::not_built),
        help("Build it first with 'stagenv env build {0}'")
    )]
    NotBuilt(String),

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(stagenv::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to write file
    #[error("Failed to write file: {path:?}")]
    #[diagnostic(code(stagenv::write_failed))]
    WriteFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(stagenv::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error into one of the broad error kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ManagerUnavailable { .. }
            | Self::InvalidYaml { .. }
            | Self::InvalidMetadata { .. }
            | Self::InvalidTemplate { .. }
            | Self::MissingParameter(_)
            | Self::UnknownParameter { .. }
            | Self::TooManyArguments { .. }
            | Self::DuplicateArgument(_)
            | Self::InvalidArgument { .. }
            | Self::ValidationFailed(_) => ErrorKind::Configuration,
            Self::EnvironmentNotFound(_)
            | Self::TaskNotFound(_)
            | Self::ScriptNotFound { .. }
            | Self::NotFoundAtPath(_)
            | Self::InvalidReference(_) => ErrorKind::NotFound,
            Self::ProcessFailed { .. } | Self::SpawnFailed { .. } => ErrorKind::ExternalProcess,
            Self::NotBuilt(_) => ErrorKind::State,
            Self::ReadFailed { .. } | Self::WriteFailed { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }
}

fn known_parameters_message(known: &[String]) -> String {
    if known.is_empty() {
        "This script declares no parameters".to_string()
    } else {
        format!("Known parameters: {}", known.join(", "))
    }
}

fn exit_code_message(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}
