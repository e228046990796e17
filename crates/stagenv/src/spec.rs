// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Declarative environment documents (`build.yaml`).
//!
//! All defaults for the document live here, stage types read resolved
//! values from these structs and never invent their own.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// Manager binary used when a document does not name one, and the
/// fallback when the named one is missing.
pub const DEFAULT_MANAGER: &str = "conda";

/// CRAN mirror used when the `R.cran` section has no `mirror`.
pub const DEFAULT_CRAN_MIRROR: &str = "https://cloud.r-project.org";

/// Primary environment manager section (`conda:`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CondaSection {
    /// Manager binary, e.g. `conda`, `mamba` or `micromamba`.
    #[serde(default = "default_manager")]
    pub command: String,

    /// Channels passed with `-c`, in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,

    /// Packages installed when the environment is created.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
}

impl Default for CondaSection {
    fn default() -> Self {
        Self {
            command: default_manager(),
            channels: Vec::new(),
            deps: Vec::new(),
        }
    }
}

fn default_manager() -> String {
    DEFAULT_MANAGER.to_string()
}

/// A bare dependency list (`pip:` and `R.github:`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageList {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
}

/// A dependency list with an optional mirror URL (`R.cran:` and
/// `R.bioconductor:`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistrySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
}

/// R package registries (`R:`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cran: Option<RegistrySection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bioconductor: Option<RegistrySection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<PackageList>,
}

impl RSection {
    /// Mirror for CRAN installs, also used to bootstrap installer packages.
    pub fn cran_mirror(&self) -> &str {
        self.cran
            .as_ref()
            .and_then(|c| c.mirror.as_deref())
            .unwrap_or(DEFAULT_CRAN_MIRROR)
    }
}

/// Environment definition loaded from a `build.yaml` file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvironmentSpec {
    /// Environment name, unique within the project.
    pub name: String,

    /// Primary manager stage. Absent means a bare environment with no
    /// channels and no packages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conda: Option<CondaSection>,

    /// Generic package-index installs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip: Option<PackageList>,

    /// R package installs.
    #[serde(rename = "R", default, skip_serializing_if = "Option::is_none")]
    pub r: Option<RSection>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl EnvironmentSpec {
    /// Create a spec with only a name set.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            conda: None,
            pip: None,
            r: None,
            source_path: None,
        }
    }

    /// Parse spec from YAML string.
    pub fn from_yaml<S: AsRef<str>>(yaml: S) -> crate::Result<Self> {
        Self::parse(yaml.as_ref(), Path::new("<string>"))
    }

    /// Load spec from file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut spec = Self::parse(&yaml, path)?;
        spec.source_path = Some(path.to_path_buf());
        Ok(spec)
    }

    /// Write spec to file path as YAML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).map_err(|e| crate::Error::InvalidYaml {
            path: path.to_path_buf(),
            error: e,
        })?;
        std::fs::write(path, yaml).map_err(|e| crate::Error::WriteFailed {
            path: path.to_path_buf(),
            error: e,
        })
    }

    fn parse(yaml: &str, path: &Path) -> crate::Result<Self> {
        let spec: Self = serde_yaml::from_str(yaml).map_err(|e| crate::Error::InvalidYaml {
            path: path.to_path_buf(),
            error: e,
        })?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::ValidationFailed(
                "environment name must not be empty".to_string(),
            ));
        }
        if self.primary().command.trim().is_empty() {
            return Err(crate::Error::ValidationFailed(format!(
                "conda.command of environment '{}' must not be empty",
                self.name
            )));
        }
        Ok(())
    }

    /// The primary manager section, defaulted when absent.
    pub fn primary(&self) -> CondaSection {
        self.conda.clone().unwrap_or_default()
    }

    /// Dependencies for the generic package-index stage.
    pub fn pip_deps(&self) -> &[String] {
        self.pip.as_ref().map(|p| p.deps.as_slice()).unwrap_or_default()
    }

    /// The R section, defaulted when absent.
    pub fn r_section(&self) -> RSection {
        self.r.clone().unwrap_or_default()
    }
}
