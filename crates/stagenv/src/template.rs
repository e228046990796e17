// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Script interface documents and command template resolution.
//!
//! A script's `interface.yaml` names the environment it runs in, a raw
//! command template and the parameters the template accepts:
//!
//! ```yaml
//! env: py-env
//! command: python hello.py --name {name} --times {times} --out {out}
//! inputs:
//!   name:
//!     type: str
//!     default: world
//!   times:
//!     type: int
//!     default: 1
//!   out:
//!     type: str
//! ```
//!
//! Resolution first rewrites every word of the template that names a
//! file bundled with the script to that file's absolute path, then
//! substitutes bound argument values into `{param}` placeholders. Values
//! are substituted per word and never split into several arguments.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "./template_test.rs"]
mod template_test;

/// Type a parameter value is coerced to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    #[serde(alias = "string")]
    Str,
    #[serde(alias = "integer")]
    Int,
    Float,
    #[serde(alias = "boolean")]
    Bool,
}

/// One declared template parameter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ParamSpec {
    #[serde(rename = "type", default)]
    pub kind: ParamType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_yaml::Value>,

    /// Defaults to true unless a default is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Permitted values after coercion; empty allows anything.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParamSpec {
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(self.default.is_none())
    }

    fn default_value(&self, name: &str) -> crate::Result<Option<String>> {
        use serde_yaml::Value;
        match &self.default {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(crate::Error::ValidationFailed(format!(
                "default of parameter '{name}' must be a scalar, got {other:?}"
            ))),
        }
    }

    /// Coerce a raw argument into its canonical textual form.
    fn coerce(&self, name: &str, raw: &str) -> crate::Result<String> {
        let invalid = |reason: &str| crate::Error::InvalidArgument {
            name: name.to_string(),
            value: raw.to_string(),
            reason: reason.to_string(),
        };
        let value = match self.kind {
            ParamType::Str => raw.to_string(),
            ParamType::Int => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| invalid("expected an integer"))?
                .to_string(),
            ParamType::Float => {
                let trimmed = raw.trim();
                match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() => trimmed.to_string(),
                    _ => return Err(invalid("expected a number")),
                }
            }
            ParamType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => "true".to_string(),
                "false" | "no" | "off" | "0" => "false".to_string(),
                _ => return Err(invalid("expected a boolean")),
            },
        };
        if !self.choices.is_empty() && !self.choices.contains(&value) {
            return Err(invalid(&format!("must be one of: {}", self.choices.join(", "))));
        }
        Ok(value)
    }
}

/// A script's `interface.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InterfaceSpec {
    /// Name of the environment the script runs in.
    pub env: String,

    /// Raw command template.
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared parameters, in positional order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, ParamSpec>,

    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl InterfaceSpec {
    /// Parse an interface from a YAML string.
    pub fn from_yaml<S: AsRef<str>>(yaml: S) -> crate::Result<Self> {
        Self::parse(yaml.as_ref(), Path::new("<string>"))
    }

    /// Load an interface from file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        let mut interface = Self::parse(&yaml, path)?;
        interface.source_path = Some(path.to_path_buf());
        Ok(interface)
    }

    fn parse(yaml: &str, path: &Path) -> crate::Result<Self> {
        let interface: Self =
            serde_yaml::from_str(yaml).map_err(|e| crate::Error::InvalidYaml {
                path: path.to_path_buf(),
                error: e,
            })?;
        if interface.env.trim().is_empty() {
            return Err(crate::Error::ValidationFailed(format!(
                "{path:?}: 'env' must not be empty"
            )));
        }
        if interface.command.trim().is_empty() {
            return Err(crate::Error::ValidationFailed(format!(
                "{path:?}: 'command' must not be empty"
            )));
        }
        Ok(interface)
    }
}

/// Caller-supplied arguments for a script run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    pub positional: Vec<String>,
    pub keyword: IndexMap<String, String>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<S: Into<String>>(mut self, value: S) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Word {
    /// Absolute path of a bundled file, never scanned for placeholders.
    Path(String),
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Param(String),
}

/// A tokenized command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
    words: Vec<Word>,
}

impl CommandTemplate {
    /// Split a raw template on shell-word boundaries.
    pub fn parse<S: Into<String>>(raw: S) -> crate::Result<Self> {
        let raw = raw.into();
        let words = shlex::split(&raw).ok_or_else(|| crate::Error::InvalidTemplate {
            template: raw.clone(),
            reason: "unbalanced quotes or trailing escape".to_string(),
        })?;
        if words.is_empty() {
            return Err(crate::Error::InvalidTemplate {
                template: raw,
                reason: "template is empty".to_string(),
            });
        }
        Ok(Self {
            words: words.into_iter().map(Word::Template).collect(),
            raw,
        })
    }

    /// The template as originally written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Rewrite every word that exactly names one of `files` to that
    /// file's absolute path under `dir`.
    pub fn with_local_files(mut self, dir: &Path, files: &[String]) -> crate::Result<Self> {
        for word in &mut self.words {
            let Word::Template(text) = word else {
                continue;
            };
            if files.iter().any(|f| f.as_str() == text.as_str()) {
                let absolute = std::path::absolute(dir.join(text.as_str()))?;
                *word = Word::Path(absolute.to_string_lossy().into_owned());
            }
        }
        Ok(self)
    }

    /// Words of the template after local file rewriting.
    pub fn words(&self) -> Vec<&str> {
        self.words
            .iter()
            .map(|w| match w {
                Word::Path(p) => p.as_str(),
                Word::Template(t) => t.as_str(),
            })
            .collect()
    }

    /// The rewritten template reassembled as one shell string.
    pub fn template_string(&self) -> String {
        let words = self.words();
        shlex::try_join(words.iter().copied()).unwrap_or_else(|_| words.join(" "))
    }

    /// Bind arguments against the declared parameters and render the
    /// final command.
    pub fn bind(
        &self,
        inputs: &IndexMap<String, ParamSpec>,
        args: &Arguments,
    ) -> crate::Result<ResolvedCommand> {
        let values = bind_values(inputs, args)?;
        let mut argv = Vec::with_capacity(self.words.len());
        for word in &self.words {
            let text = match word {
                Word::Path(p) => {
                    argv.push(p.clone());
                    continue;
                }
                Word::Template(t) => t,
            };
            let pieces = self.split_placeholders(text)?;
            let mut rendered = String::new();
            let mut only_absent_param = false;
            for piece in &pieces {
                match piece {
                    Piece::Literal(s) => rendered.push_str(s),
                    Piece::Param(name) => {
                        let value = values.get(name.as_str()).ok_or_else(|| {
                            crate::Error::InvalidTemplate {
                                template: self.raw.clone(),
                                reason: format!("placeholder {{{name}}} is not a declared input"),
                            }
                        })?;
                        match value {
                            Some(v) => rendered.push_str(v),
                            None => only_absent_param = pieces.len() == 1,
                        }
                    }
                }
            }
            if !only_absent_param {
                argv.push(rendered);
            }
        }
        Ok(ResolvedCommand { argv })
    }

    fn split_placeholders(&self, text: &str) -> crate::Result<Vec<Piece>> {
        let invalid = |reason: String| crate::Error::InvalidTemplate {
            template: self.raw.clone(),
            reason,
        };
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(n) if n.is_alphanumeric() || n == '_' || n == '-' => name.push(n),
                            _ => return Err(invalid(format!("malformed placeholder in '{text}'"))),
                        }
                    }
                    if name.is_empty() {
                        return Err(invalid(format!("empty placeholder in '{text}'")));
                    }
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Param(name));
                }
                '}' => return Err(invalid(format!("unmatched '}}' in '{text}'"))),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(pieces)
    }
}

/// Coerce every declared parameter to a value, `None` for optional
/// parameters nobody supplied.
fn bind_values<'a>(
    inputs: &'a IndexMap<String, ParamSpec>,
    args: &Arguments,
) -> crate::Result<IndexMap<&'a str, Option<String>>> {
    if args.positional.len() > inputs.len() {
        return Err(crate::Error::TooManyArguments {
            expected: inputs.len(),
            actual: args.positional.len(),
        });
    }

    let mut given: IndexMap<&str, &str> = inputs
        .keys()
        .map(String::as_str)
        .zip(args.positional.iter().map(String::as_str))
        .collect();

    for (name, value) in &args.keyword {
        if !inputs.contains_key(name) {
            return Err(crate::Error::UnknownParameter {
                name: name.clone(),
                known: inputs.keys().cloned().collect(),
            });
        }
        if given.insert(name.as_str(), value.as_str()).is_some() {
            return Err(crate::Error::DuplicateArgument(name.clone()));
        }
    }

    let mut values = IndexMap::with_capacity(inputs.len());
    for (name, spec) in inputs {
        let raw = match given.get(name.as_str()) {
            Some(v) => Some(v.to_string()),
            None => spec.default_value(name)?,
        };
        let value = match raw {
            Some(raw) => Some(spec.coerce(name, &raw)?),
            None if spec.is_required() => {
                return Err(crate::Error::MissingParameter(name.clone()));
            }
            None => None,
        };
        values.insert(name.as_str(), value);
    }
    Ok(values)
}

/// A fully bound command, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    argv: Vec<String>,
}

impl ResolvedCommand {
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn into_argv(self) -> Vec<String> {
        self.argv
    }

    /// Shell-quoted command line; splitting it yields [`Self::argv`].
    pub fn command_line(&self) -> String {
        shlex::try_join(self.argv.iter().map(String::as_str))
            .unwrap_or_else(|_| self.argv.join(" "))
    }
}

impl std::fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.command_line())
    }
}
