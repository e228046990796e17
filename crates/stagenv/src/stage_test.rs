// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;
use crate::fixtures::{RecordingRunner, strings};
use crate::spec::{PackageList, RegistrySection};

fn conda(command: &str, channels: &[&str], deps: &[&str]) -> CondaSection {
    CondaSection {
        command: command.to_string(),
        channels: strings(channels),
        deps: strings(deps),
    }
}

fn r_section(cran: &[&str], bioc: &[&str], github: &[&str]) -> RSection {
    RSection {
        cran: Some(RegistrySection {
            mirror: None,
            deps: strings(cran),
        }),
        bioconductor: Some(RegistrySection {
            mirror: None,
            deps: strings(bioc),
        }),
        github: Some(PackageList {
            deps: strings(github),
        }),
    }
}

#[rstest]
fn test_create_command_orders_channels_then_deps() {
    let stage = PrimaryStage::new(
        &conda("conda", &["conda-forge", "bioconda"], &["python=3.11", "numpy"]),
        "proj-e1",
    );
    assert_eq!(
        stage.create_command(),
        vec![
            "conda", "create", "-n", "proj-e1", "-c", "conda-forge", "-c", "bioconda",
            "python=3.11", "numpy", "--yes",
        ]
    );
}

#[rstest]
fn test_create_command_without_channels_or_deps() {
    let stage = PrimaryStage::new(&CondaSection::default(), "proj-bare");
    assert_eq!(
        stage.create_command(),
        vec!["conda", "create", "-n", "proj-bare", "--yes"]
    );
}

#[rstest]
fn test_remove_and_run_commands() {
    let stage = PrimaryStage::new(&conda("mamba", &["conda-forge"], &["numpy"]), "proj-e1");
    assert_eq!(stage.kind(), StageKind::Conda);
    assert_eq!(stage.kind().to_string(), "conda");
    assert_eq!(
        stage.remove_command(),
        vec!["mamba", "env", "remove", "-n", "proj-e1"]
    );
    assert_eq!(
        stage.run_under_env_command(&strings(&["python", "-V"])),
        vec!["mamba", "run", "--live-stream", "-n", "proj-e1", "python", "-V"]
    );
}

#[rstest]
fn test_check_command_keeps_available_manager() {
    let runner = RecordingRunner::new();
    let mut stage = PrimaryStage::new(&conda("mamba", &[], &[]), "proj-e1");
    stage.check_command_available(&runner).unwrap();
    assert_eq!(stage.command(), "mamba");
}

#[rstest]
fn test_check_command_falls_back_to_default() {
    let runner = RecordingRunner::new().with_missing(&["mamba"]);
    let mut stage = PrimaryStage::new(&conda("mamba", &[], &[]), "proj-e1");
    stage.check_command_available(&runner).unwrap();
    assert_eq!(stage.command(), DEFAULT_MANAGER);
    assert_eq!(stage.create_command()[0], "conda");
}

#[rstest]
#[case::custom_manager("mamba")]
#[case::default_manager("conda")]
fn test_check_command_fails_without_default(#[case] command: &str) {
    let runner = RecordingRunner::new().with_missing(&["mamba", "conda"]);
    let mut stage = PrimaryStage::new(&conda(command, &[], &[]), "proj-e1");
    let err = stage.check_command_available(&runner).unwrap_err();
    match err {
        crate::Error::ManagerUnavailable { command } => assert_eq!(command, "conda"),
        other => panic!("Expected ManagerUnavailable, got: {other:?}"),
    }
}

#[rstest]
fn test_execute_maps_exit_status() {
    let runner = RecordingRunner::new().failing_at(0);
    let stage = PrimaryStage::new(&CondaSection::default(), "proj-e1");
    let err = stage
        .execute(&runner, StageKind::Conda, &stage.create_command(), "create")
        .unwrap_err();
    match err {
        crate::Error::ProcessFailed {
            manager,
            action,
            target,
            code,
        } => {
            assert_eq!(manager, "conda");
            assert_eq!(action, "create");
            assert_eq!(target, "proj-e1");
            assert_eq!(code, Some(1));
        }
        other => panic!("Expected ProcessFailed, got: {other:?}"),
    }
}

#[rstest]
fn test_pip_install_command() {
    let stage = PipStage::new(&strings(&["h5py", "scipy>=1.10"]));
    assert_eq!(stage.kind(), StageKind::Pip);
    assert_eq!(
        stage.install_command(),
        vec!["pip", "install", "h5py", "scipy>=1.10"]
    );
    assert!(PipStage::new(&[]).is_empty());
}

#[rstest]
fn test_cran_single_package_is_not_a_vector() {
    let stage = CranStage::new(&r_section(&["ggplot2"], &[], &[]));
    assert_eq!(
        stage.install_command(),
        vec![
            "Rscript",
            "-e",
            "install.packages(\"ggplot2\", repos = \"https://cloud.r-project.org\")",
        ]
    );
}

#[rstest]
fn test_cran_many_packages_use_mirror() {
    let mut r = r_section(&["ggplot2", "dplyr"], &[], &[]);
    r.cran.as_mut().unwrap().mirror = Some("https://mirror.example/cran".to_string());
    let stage = CranStage::new(&r);
    assert_eq!(stage.mirror(), "https://mirror.example/cran");
    assert_eq!(
        stage.expression(),
        "install.packages(c(\"ggplot2\", \"dplyr\"), repos = \"https://mirror.example/cran\")"
    );
}

#[rstest]
fn test_bioconductor_bootstraps_manager() {
    let stage = BioconductorStage::new(&r_section(&[], &["DESeq2", "edgeR"], &[]));
    let expr = stage.expression();
    assert!(expr.starts_with(
        "if (!requireNamespace(\"BiocManager\", quietly = TRUE)) \
         install.packages(\"BiocManager\", repos = \"https://cloud.r-project.org\"); "
    ));
    assert!(!expr.contains("BioC_mirror"));
    assert!(expr.ends_with(
        "BiocManager::install(c(\"DESeq2\", \"edgeR\"), update = FALSE, ask = FALSE)"
    ));
}

#[rstest]
fn test_bioconductor_mirror_is_optional() {
    let mut r = r_section(&[], &["DESeq2"], &[]);
    r.bioconductor.as_mut().unwrap().mirror = Some("https://bioc.example".to_string());
    let expr = BioconductorStage::new(&r).expression();
    assert!(expr.contains("options(BioC_mirror = \"https://bioc.example\"); "));
    assert!(expr.ends_with("BiocManager::install(\"DESeq2\", update = FALSE, ask = FALSE)"));
}

#[rstest]
fn test_github_bootstraps_remotes() {
    let stage = GithubStage::new(&r_section(&[], &[], &["user/pkg"]));
    let cmd = stage.install_command();
    assert_eq!(cmd[0], "Rscript");
    assert_eq!(cmd[1], "-e");
    assert!(cmd[2].starts_with("if (!requireNamespace(\"remotes\", quietly = TRUE))"));
    assert!(cmd[2].ends_with("remotes::install_github(\"user/pkg\")"));
}

#[rstest]
fn test_r_stages_empty_without_section() {
    let r = RSection::default();
    assert!(CranStage::new(&r).is_empty());
    assert!(BioconductorStage::new(&r).is_empty());
    assert!(GithubStage::new(&r).is_empty());
}

#[rstest]
fn test_r_string_escapes_quotes() {
    assert_eq!(r_string("a\"b\\c"), "\"a\\\"b\\\\c\"");
    assert_eq!(r_packages(&strings(&["x", "y"])), "c(\"x\", \"y\")");
}
