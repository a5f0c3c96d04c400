//! Slipway - a build-configuration compiler for C++ projects
//!
//! This crate provides the core library functionality for Slipway,
//! including toolchain probing, feature resolution, source-group
//! composition, and ninja build-graph emission.

pub mod graph;
pub mod ops;
pub mod probe;
pub mod registry;
pub mod util;

pub use graph::{BuildGraph, BuildMode};
pub use probe::{Prober, Tristate};
pub use registry::{ArtifactRegistry, ModuleRegistry, SourceFile, SourceKind};
