// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Persisted build state for environments.
//!
//! The state lives in the environment directory's metadata sidecar:
//!
//! ```json
//! {
//!   "name": "py-env",
//!   "build-time": "2024-03-01T10:22:31.044+00:00"
//! }
//! ```
//!
//! `build-time` is either `null`/absent (not built) or a timestamp. Every
//! other key belongs to whoever created the directory and is preserved on
//! write.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::META_FILENAME;

#[cfg(test)]
#[path = "./state_test.rs"]
mod state_test;

/// Key of the build timestamp within the sidecar.
pub const BUILD_TIME_KEY: &str = "build-time";

/// Built/unbuilt status of an environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildState {
    /// When the last successful build finished, `None` when not built.
    pub build_time: Option<DateTime<Utc>>,
}

impl BuildState {
    pub fn is_built(&self) -> bool {
        self.build_time.is_some()
    }
}

/// Reads and writes [`BuildState`] in a directory's `.meta.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStateStore {
    path: PathBuf,
}

impl BuildStateStore {
    /// Store for the sidecar inside `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(META_FILENAME),
        }
    }

    /// Path of the sidecar file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> crate::Result<BuildState> {
        let meta = self.read_meta()?;
        let build_time = match meta.get(BUILD_TIME_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(parse_timestamp(raw).ok_or_else(|| {
                crate::Error::InvalidMetadata {
                    path: self.path.clone(),
                    reason: format!("unrecognized {BUILD_TIME_KEY} '{raw}'"),
                }
            })?),
            Some(other) => {
                return Err(crate::Error::InvalidMetadata {
                    path: self.path.clone(),
                    reason: format!("{BUILD_TIME_KEY} must be a string or null, got {other}"),
                });
            }
        };
        Ok(BuildState { build_time })
    }

    /// Record a successful build at `time`.
    pub fn mark_built(&self, time: DateTime<Utc>) -> crate::Result<()> {
        self.write_build_time(Value::String(time.to_rfc3339()))
    }

    /// Record that the environment is no longer built.
    pub fn clear(&self) -> crate::Result<()> {
        self.write_build_time(Value::Null)
    }

    fn write_build_time(&self, value: Value) -> crate::Result<()> {
        let mut meta = self.read_meta()?;
        meta.insert(BUILD_TIME_KEY.to_string(), value);
        self.write_meta(&meta)
    }

    /// All keys in the sidecar; an absent file reads as empty.
    pub fn read_meta(&self) -> crate::Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| crate::Error::ReadFailed {
                path: self.path.clone(),
                error: e,
            })?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(crate::Error::InvalidMetadata {
                path: self.path.clone(),
                reason: "expected a JSON object".to_string(),
            }),
            Err(e) => Err(crate::Error::InvalidMetadata {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn write_meta(&self, meta: &Map<String, Value>) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(meta).map_err(|e| {
            crate::Error::InvalidMetadata {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        debug!(path = ?self.path, "writing metadata");
        std::fs::write(&self.path, json).map_err(|e| crate::Error::WriteFailed {
            path: self.path.clone(),
            error: e,
        })
    }
}

/// Accepts RFC 3339 and naive `YYYY-MM-DD HH:MM:SS[.f]` local times.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|time| time.with_timezone(&Utc))
}
