//! Source registries: module groups and build artifacts.
//!
//! A module group is a named, ordered list of source files shared across
//! artifacts. Groups compose by concatenation and are append-only while
//! features are being resolved; artifact assembly reads the frozen
//! registry, so every feature append lands before composition is
//! captured.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub mod defaults;

/// Errors raised during registry construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no rule to build `{0}` (unrecognized source extension)")]
    UnrecognizedExtension(String),

    #[error("module group `{0}` is not defined")]
    UnknownGroup(String),

    #[error("module group `{0}` is already defined")]
    DuplicateGroup(String),

    #[error("module group `{0}` is frozen and cannot be extended")]
    FrozenGroup(String),

    #[error("unknown artifact `{0}`")]
    UnknownArtifact(String),

    #[error("artifact `{0}` is already registered")]
    DuplicateArtifact(String),

    #[error("artifact `{0}` has no compiled sources")]
    NoCompiledSources(String),
}

/// How a source file participates in the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A translation unit compiled to an object file (`.cc`).
    Compiled,
    /// A generator input producing a header before compilation (`.rl`).
    Codegen,
}

/// A source file tagged with its build kind.
///
/// The kind is resolved once, from the file extension, at registration
/// time; an unrecognized extension is rejected eagerly rather than
/// falling through at emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    /// A compiled translation unit with a statically known kind.
    pub fn compiled(path: &str) -> Self {
        SourceFile {
            path: PathBuf::from(path),
            kind: SourceKind::Compiled,
        }
    }

    /// A generator input with a statically known kind.
    pub fn codegen(path: &str) -> Self {
        SourceFile {
            path: PathBuf::from(path),
            kind: SourceKind::Codegen,
        }
    }

    /// Classify a source path by extension.
    pub fn parse(path: &str) -> Result<Self, RegistryError> {
        let kind = match PathBuf::from(path).extension().and_then(|e| e.to_str()) {
            Some("cc") => SourceKind::Compiled,
            Some("rl") => SourceKind::Codegen,
            _ => return Err(RegistryError::UnrecognizedExtension(path.to_string())),
        };
        Ok(SourceFile {
            path: PathBuf::from(path),
            kind,
        })
    }
}

/// Parse a list of source paths.
fn parse_all(paths: &[&str]) -> Result<Vec<SourceFile>, RegistryError> {
    paths.iter().map(|p| SourceFile::parse(p)).collect()
}

/// Named, composable groups of source files.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    groups: BTreeMap<String, Vec<SourceFile>>,
    frozen: bool,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new group from its own source entries.
    pub fn define(&mut self, name: &str, sources: &[&str]) -> Result<(), RegistryError> {
        self.insert(name, parse_all(sources)?)
    }

    /// Define a new group as its own entries followed by the concatenated
    /// contents of previously defined groups.
    ///
    /// Referencing a group that does not exist yet fails here, at
    /// registration time; composition is acyclic by construction.
    pub fn define_composite(
        &mut self,
        name: &str,
        own: &[&str],
        parts: &[&str],
    ) -> Result<(), RegistryError> {
        let mut sources = parse_all(own)?;
        for part in parts {
            sources.extend_from_slice(self.get(part)?);
        }
        self.insert(name, sources)
    }

    fn insert(&mut self, name: &str, sources: Vec<SourceFile>) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::FrozenGroup(name.to_string()));
        }
        if self.groups.contains_key(name) {
            return Err(RegistryError::DuplicateGroup(name.to_string()));
        }
        self.groups.insert(name.to_string(), sources);
        Ok(())
    }

    /// Append sources to an existing group (feature resolution only).
    pub fn append(&mut self, name: &str, sources: Vec<SourceFile>) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::FrozenGroup(name.to_string()));
        }
        self.groups
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownGroup(name.to_string()))?
            .extend(sources);
        Ok(())
    }

    /// Freeze the registry; all appends after this point are rejected.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Look up a group's source list.
    pub fn get(&self, name: &str) -> Result<&[SourceFile], RegistryError> {
        self.groups
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| RegistryError::UnknownGroup(name.to_string()))
    }
}

/// What an active feature contributes to the configuration.
///
/// Feature resolution returns one of these per active feature instead of
/// mutating shared registries in place; the caller merges them in a
/// visible, ordered pass.
#[derive(Debug, Clone, Default)]
pub struct FeatureAdditions {
    /// Sources to append, keyed by module group name.
    pub sources: Vec<(String, Vec<SourceFile>)>,
    /// Preprocessor define tokens (without the `-D` prefix).
    pub defines: Vec<String>,
    /// Linker library tokens (full `-l...` spellings).
    pub libs: Vec<String>,
}

impl FeatureAdditions {
    /// Fold another set of additions into this one, preserving order.
    pub fn merge(&mut self, other: FeatureAdditions) {
        self.sources.extend(other.sources);
        self.defines.extend(other.defines);
        self.libs.extend(other.libs);
    }

    /// Apply the source appends to a module registry.
    pub fn apply_sources(&self, modules: &mut ModuleRegistry) -> Result<(), RegistryError> {
        for (group, sources) in &self.sources {
            modules.append(group, sources.clone())?;
        }
        Ok(())
    }
}

/// A mapping from artifact name to its fully resolved source list.
///
/// Registration captures the group contents by value, so the module
/// registry must be fully resolved (and frozen) first. Insertion order
/// is preserved; it decides default selection and phony-input order.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    artifacts: BTreeMap<String, Vec<SourceFile>>,
    order: Vec<String>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact as entry-point sources plus module groups,
    /// in declaration order.
    pub fn register(
        &mut self,
        name: &str,
        entries: &[&str],
        groups: &[&str],
        modules: &ModuleRegistry,
    ) -> Result<(), RegistryError> {
        if self.artifacts.contains_key(name) {
            return Err(RegistryError::DuplicateArtifact(name.to_string()));
        }

        let mut sources = parse_all(entries)?;
        for group in groups {
            sources.extend_from_slice(modules.get(group)?);
        }

        if !sources.iter().any(|s| s.kind == SourceKind::Compiled) {
            return Err(RegistryError::NoCompiledSources(name.to_string()));
        }

        self.artifacts.insert(name.to_string(), sources);
        self.order.push(name.to_string());
        Ok(())
    }

    /// Registered artifact names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Resolved source list for an artifact.
    pub fn sources(&self, name: &str) -> Result<&[SourceFile], RegistryError> {
        self.artifacts
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| RegistryError::UnknownArtifact(name.to_string()))
    }
}
