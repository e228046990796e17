// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use rstest::rstest;

use super::*;

#[rstest]
#[case::manager(Error::ManagerUnavailable { command: "conda".into() }, ErrorKind::Configuration)]
#[case::missing_param(Error::MissingParameter("out".into()), ErrorKind::Configuration)]
#[case::too_many(Error::TooManyArguments { expected: 1, actual: 2 }, ErrorKind::Configuration)]
#[case::env(Error::EnvironmentNotFound("e".into()), ErrorKind::NotFound)]
#[case::reference(Error::InvalidReference("x".into()), ErrorKind::NotFound)]
#[case::process(
    Error::ProcessFailed {
        manager: "conda".into(),
        action: "create".into(),
        target: "proj-e".into(),
        code: Some(1),
    },
    ErrorKind::ExternalProcess
)]
#[case::not_built(Error::NotBuilt("e".into()), ErrorKind::State)]
#[case::read(
    Error::ReadFailed {
        path: PathBuf::from("x"),
        error: std::io::Error::other("boom"),
    },
    ErrorKind::Io
)]
fn test_error_kind(#[case] error: Error, #[case] kind: ErrorKind) {
    assert_eq!(error.kind(), kind);
}

#[rstest]
fn test_process_failed_message() {
    let err = Error::ProcessFailed {
        manager: "mamba".into(),
        action: "install pip packages into".into(),
        target: "proj-e1".into(),
        code: Some(1),
    };
    assert_eq!(
        err.to_string(),
        "Failed to install pip packages into env proj-e1 with mamba (exit code: 1)"
    );

    let err = Error::ProcessFailed {
        manager: "conda".into(),
        action: "create".into(),
        target: "proj-e1".into(),
        code: None,
    };
    assert!(err.to_string().ends_with("(exit code: terminated by signal)"));
}

#[rstest]
fn test_unknown_parameter_help_lists_known() {
    let err = Error::UnknownParameter {
        name: "color".into(),
        known: vec!["name".into(), "out".into()],
    };
    let help = miette::Diagnostic::help(&err).map(|h| h.to_string());
    assert_eq!(help.as_deref(), Some("Known parameters: name, out"));
}
