//! Loader plugin manifests backed by external commands.
//!
//! # Responsibility
//! - Check that a plugin manifest exposes invocable `canLoad` and `load`
//!   entrypoints, preferring the `default` member over top-level members.
//! - Run entrypoint commands and decode their JSON output.
//!
//! # Invariants
//! - Entrypoint commands receive the dependency file path as last argument.
//! - A plugin fault (spawn failure, non-zero exit, bad output) is an error,
//!   never a silent "cannot load".
//!
//! Manifest shape:
//!
//! ```json
//! {
//!   "default": {
//!     "canLoad": { "command": "./bin/can-load", "args": ["--strict"] },
//!     "load": "./bin/load"
//!   }
//! }
//! ```

use crate::loader::{DependencyLoader, LoaderError, LoaderResult};
use log::{debug, error};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

/// Manifest member holding the primary export.
pub const DEFAULT_EXPORT: &str = "default";
/// Entrypoint answering whether a file is supported.
pub const CAN_LOAD_ENTRYPOINT: &str = "canLoad";
/// Entrypoint listing dependency names.
pub const LOAD_ENTRYPOINT: &str = "load";

const REQUIRED_ENTRYPOINTS: &[&str] = &[CAN_LOAD_ENTRYPOINT, LOAD_ENTRYPOINT];

/// Loader plugin manifest read from disk but not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    /// Absolute location of the manifest file.
    pub path: PathBuf,
    /// Parsed manifest document.
    pub document: Value,
}

/// One invocable entrypoint declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCommand {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntrypointDecl {
    Program(String),
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl PluginCommand {
    fn from_value(value: &Value) -> Option<Self> {
        let decl = EntrypointDecl::deserialize(value).ok()?;
        let command = match decl {
            EntrypointDecl::Program(program) => Self {
                program,
                args: Vec::new(),
            },
            EntrypointDecl::Command { command, args } => Self {
                program: command,
                args,
            },
        };
        if command.program.trim().is_empty() {
            return None;
        }
        Some(command)
    }
}

/// Entrypoints found on the candidate export, plus what is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeCheck {
    pub can_load: Option<PluginCommand>,
    pub load: Option<PluginCommand>,
}

impl ShapeCheck {
    fn of(candidate: &Value) -> Self {
        let member = |name: &str| candidate.get(name).and_then(PluginCommand::from_value);
        Self {
            can_load: member(CAN_LOAD_ENTRYPOINT),
            load: member(LOAD_ENTRYPOINT),
        }
    }

    /// Required entrypoints absent from the candidate.
    pub fn missing(&self) -> Vec<&'static str> {
        REQUIRED_ENTRYPOINTS
            .iter()
            .copied()
            .filter(|name| match *name {
                CAN_LOAD_ENTRYPOINT => self.can_load.is_none(),
                _ => self.load.is_none(),
            })
            .collect()
    }
}

impl PluginManifest {
    /// Normalizes default vs top-level exports and checks the contract.
    ///
    /// Returns the missing entrypoint names when the manifest does not conform.
    pub fn validate(&self) -> Result<(PluginCommand, PluginCommand), Vec<&'static str>> {
        if let Some(primary) = self.document.get(DEFAULT_EXPORT) {
            if let ShapeCheck {
                can_load: Some(can_load),
                load: Some(load),
            } = ShapeCheck::of(primary)
            {
                return Ok((can_load, load));
            }
        }

        match ShapeCheck::of(&self.document) {
            ShapeCheck {
                can_load: Some(can_load),
                load: Some(load),
            } => Ok((can_load, load)),
            other => Err(other.missing()),
        }
    }
}

/// Dependency loader that shells out to plugin entrypoint commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLoader {
    reference: String,
    base_dir: PathBuf,
    cwd: PathBuf,
    can_load: PluginCommand,
    load: PluginCommand,
}

/// Item printed by a `load` entrypoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum LoadedDependency {
    Name(String),
    Entry { name: String },
}

impl CommandLoader {
    /// Builds a loader for a validated manifest.
    ///
    /// `cwd` is the working directory entrypoints run in; relative programs
    /// with a path separator resolve against the manifest directory.
    pub fn new(
        reference: impl Into<String>,
        manifest_path: &Path,
        cwd: &Path,
        can_load: PluginCommand,
        load: PluginCommand,
    ) -> Self {
        let base_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        Self {
            reference: reference.into(),
            base_dir,
            cwd: cwd.to_path_buf(),
            can_load,
            load,
        }
    }

    fn program_path(&self, program: &str) -> PathBuf {
        let path = Path::new(program);
        let has_separator = program.contains('/') || program.contains('\\');
        if has_separator && path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    fn run(
        &self,
        entrypoint: &'static str,
        command: &PluginCommand,
        file: &Path,
    ) -> LoaderResult<Vec<u8>> {
        let started_at = Instant::now();
        let output: Output = Command::new(self.program_path(&command.program))
            .args(&command.args)
            .arg(file)
            .current_dir(&self.cwd)
            .output()
            .map_err(|err| {
                self.fault(
                    entrypoint,
                    format!("failed to run `{}`: {err}", command.program),
                )
            })?;

        if !output.status.success() {
            error!(
                "event=plugin_run module=loader status=error reference={} entrypoint={} duration_ms={} exit={}",
                self.reference,
                entrypoint,
                started_at.elapsed().as_millis(),
                output.status
            );
            return Err(self.fault(
                entrypoint,
                format!(
                    "`{}` exited with {}: {}",
                    command.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        debug!(
            "event=plugin_run module=loader status=ok reference={} entrypoint={} duration_ms={}",
            self.reference,
            entrypoint,
            started_at.elapsed().as_millis()
        );
        Ok(output.stdout)
    }

    fn fault(&self, entrypoint: &'static str, message: String) -> LoaderError {
        LoaderError::Plugin {
            reference: self.reference.clone(),
            entrypoint,
            message,
        }
    }
}

impl DependencyLoader for CommandLoader {
    fn can_load(&self, file: &Path) -> LoaderResult<bool> {
        let stdout = self.run(CAN_LOAD_ENTRYPOINT, &self.can_load, file)?;
        serde_json::from_slice::<bool>(&stdout).map_err(|err| {
            self.fault(
                CAN_LOAD_ENTRYPOINT,
                format!("expected a JSON boolean on stdout: {err}"),
            )
        })
    }

    fn load(&self, file: &Path) -> LoaderResult<Vec<String>> {
        let stdout = self.run(LOAD_ENTRYPOINT, &self.load, file)?;
        let items = serde_json::from_slice::<Vec<LoadedDependency>>(&stdout).map_err(|err| {
            self.fault(
                LOAD_ENTRYPOINT,
                format!("expected a JSON array of dependency names on stdout: {err}"),
            )
        })?;

        let mut names = Vec::with_capacity(items.len());
        for item in items {
            let name = match item {
                LoadedDependency::Name(name) | LoadedDependency::Entry { name } => name,
            };
            if name.is_empty() {
                return Err(self.fault(LOAD_ENTRYPOINT, "empty dependency name".to_string()));
            }
            names.push(name);
        }
        Ok(names)
    }
}
