//! Typed build-graph model and planning.
//!
//! Planning turns the frozen registries plus a mode/artifact selection
//! into strongly-typed step records; `ninja` renders them as text in a
//! separate pass so construction and formatting test independently.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::registry::{ArtifactRegistry, RegistryError, SourceKind};

pub mod ninja;

/// A named configuration profile: optimization level, sanitizer
/// instrumentation, and associated libraries.
#[derive(Debug, Clone, Serialize)]
pub struct BuildMode {
    pub name: String,
    /// Sanitizer compile flags; dropped entirely under static linking.
    pub sanitize: Vec<String>,
    /// Runtime libraries the sanitizers need at link time.
    pub sanitize_libs: Vec<String>,
    /// Optimization and mode defines.
    pub opt: Vec<String>,
    /// Extra mode-specific link libraries.
    pub libs: Vec<String>,
}

impl BuildMode {
    pub fn has_sanitizers(&self) -> bool {
        !self.sanitize.is_empty()
    }

    /// Remove sanitizer flags and their runtime libraries together;
    /// keeping one without the other produces link failures.
    pub fn strip_sanitizers(&mut self) {
        self.sanitize.clear();
        self.sanitize_libs.clear();
    }
}

fn flags(s: &[&str]) -> Vec<String> {
    s.iter().map(|f| f.to_string()).collect()
}

/// The built-in build modes.
pub fn builtin_modes() -> Vec<BuildMode> {
    vec![
        BuildMode {
            name: "debug".to_string(),
            sanitize: flags(&[
                "-fsanitize=address",
                "-fsanitize=leak",
                "-fsanitize=undefined",
            ]),
            sanitize_libs: flags(&["-lubsan", "-lasan"]),
            opt: flags(&["-O0", "-DDEBUG", "-DDEFAULT_ALLOCATOR"]),
            libs: vec![],
        },
        BuildMode {
            name: "release".to_string(),
            sanitize: vec![],
            sanitize_libs: vec![],
            opt: flags(&["-O2"]),
            libs: vec![],
        },
    ]
}

/// Graph-wide variables shared by every step.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalVars {
    /// Original command-line arguments, shell-quoted, for the
    /// regenerate-self rule.
    pub configure_args: String,
    /// Root of all build outputs.
    pub build_dir: PathBuf,
    /// Path of this configuration tool, the regenerate-self dependency.
    pub self_path: PathBuf,
    pub cxx: PathBuf,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub libs: Vec<String>,
}

/// One generator pass: a codegen source to its generated header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodegenStep {
    pub input: PathBuf,
    /// Build-dir-relative output, e.g. `release/gen/apps/memcached/ascii.hh`.
    pub output: PathBuf,
}

/// One translation unit compiled to an object file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileStep {
    pub source: PathBuf,
    /// Build-dir-relative object path, e.g. `release/net/tcp.o`.
    pub object: PathBuf,
    /// Generated headers that must exist before this unit compiles but
    /// whose timestamps alone never force a recompile.
    pub order_only: Vec<PathBuf>,
}

/// One artifact linked from its objects, in source-list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStep {
    pub artifact: String,
    pub output: PathBuf,
    pub objects: Vec<PathBuf>,
}

/// The aggregate target for a mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhonyStep {
    pub name: String,
    pub inputs: Vec<PathBuf>,
}

/// All steps for one selected mode.
#[derive(Debug, Clone, Serialize)]
pub struct ModeSection {
    pub mode: BuildMode,
    pub phony: PhonyStep,
    pub links: Vec<LinkStep>,
    pub compiles: Vec<CompileStep>,
    pub codegens: Vec<CodegenStep>,
}

/// The complete emission target: every selected mode expanded into
/// dependency-correct steps.
#[derive(Debug, Clone, Serialize)]
pub struct BuildGraph {
    pub vars: GlobalVars,
    pub modes: Vec<ModeSection>,
}

impl BuildGraph {
    /// Expand the selected artifacts into steps for each mode.
    ///
    /// Object and codegen outputs are deduplicated by output path, so a
    /// source shared between artifacts compiles once per mode and a
    /// shared group's generator runs once per mode. Every compile step
    /// order-only-depends on the full codegen output set of its mode; a
    /// conservative stand-in for header-inclusion analysis that must not
    /// be narrowed without one.
    pub fn plan(
        vars: GlobalVars,
        modes: Vec<BuildMode>,
        artifacts: &ArtifactRegistry,
        selection: &[String],
    ) -> Result<Self, RegistryError> {
        let mut sections = Vec::with_capacity(modes.len());

        for mode in modes {
            let mut compiles: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
            let mut codegens: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
            let mut links = Vec::new();

            for name in selection {
                let sources = artifacts.sources(name)?;
                let mut objects = Vec::new();

                for source in sources {
                    match source.kind {
                        SourceKind::Compiled => {
                            let object =
                                Path::new(&mode.name).join(source.path.with_extension("o"));
                            objects.push(object.clone());
                            compiles.insert(object, source.path.clone());
                        }
                        SourceKind::Codegen => {
                            let output = Path::new(&mode.name)
                                .join("gen")
                                .join(source.path.with_extension("hh"));
                            codegens.insert(output, source.path.clone());
                        }
                    }
                }

                links.push(LinkStep {
                    artifact: name.clone(),
                    output: Path::new(&mode.name).join(name),
                    objects,
                });
            }

            let order_only: Vec<PathBuf> = codegens.keys().cloned().collect();
            let compiles = compiles
                .into_iter()
                .map(|(object, source)| CompileStep {
                    source,
                    object,
                    order_only: order_only.clone(),
                })
                .collect();
            let codegens = codegens
                .into_iter()
                .map(|(output, input)| CodegenStep { input, output })
                .collect();
            let phony = PhonyStep {
                name: mode.name.clone(),
                inputs: links.iter().map(|l| l.output.clone()).collect(),
            };

            sections.push(ModeSection {
                mode,
                phony,
                links,
                compiles,
                codegens,
            });
        }

        Ok(BuildGraph {
            vars,
            modes: sections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleRegistry;

    fn test_vars() -> GlobalVars {
        GlobalVars {
            configure_args: String::new(),
            build_dir: PathBuf::from("build"),
            self_path: PathBuf::from("slipway"),
            cxx: PathBuf::from("g++"),
            cxxflags: vec![],
            ldflags: vec![],
            libs: vec![],
        }
    }

    /// Two artifacts sharing a group with a codegen source: the
    /// generator runs once per mode, both compile steps see the header
    /// order-only, and each artifact still links separately.
    #[test]
    fn test_shared_codegen_emitted_once_per_mode() {
        let mut modules = ModuleRegistry::new();
        modules.define("g", &["a.cc", "gen.rl"]).unwrap();
        modules.freeze();

        let mut artifacts = ArtifactRegistry::new();
        artifacts.register("A", &["entry.cc"], &["g"], &modules).unwrap();
        artifacts.register("B", &["entry2.cc"], &["g"], &modules).unwrap();

        let modes: Vec<_> = builtin_modes()
            .into_iter()
            .filter(|m| m.name == "release")
            .collect();
        let graph = BuildGraph::plan(
            test_vars(),
            modes,
            &artifacts,
            &["A".to_string(), "B".to_string()],
        )
        .unwrap();

        assert_eq!(graph.modes.len(), 1);
        let section = &graph.modes[0];

        assert_eq!(section.codegens.len(), 1);
        assert_eq!(section.codegens[0].input, PathBuf::from("gen.rl"));
        assert_eq!(section.codegens[0].output, PathBuf::from("release/gen/gen.hh"));

        // entry.cc, entry2.cc, and the shared a.cc
        assert_eq!(section.compiles.len(), 3);
        for compile in &section.compiles {
            assert_eq!(compile.order_only, vec![PathBuf::from("release/gen/gen.hh")]);
        }

        assert_eq!(section.links.len(), 2);
    }

    #[test]
    fn test_link_objects_in_source_order() {
        let mut modules = ModuleRegistry::new();
        modules.define("g", &["z.cc", "a.cc", "m.cc"]).unwrap();
        modules.freeze();

        let mut artifacts = ArtifactRegistry::new();
        artifacts
            .register("app", &["entry.cc"], &["g"], &modules)
            .unwrap();

        let graph = BuildGraph::plan(
            test_vars(),
            builtin_modes(),
            &artifacts,
            &["app".to_string()],
        )
        .unwrap();

        let objects: Vec<_> = graph.modes[0].links[0]
            .objects
            .iter()
            .map(|o| o.to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            objects,
            ["debug/entry.o", "debug/z.o", "debug/a.o", "debug/m.o"]
        );
    }

    #[test]
    fn test_plan_is_deterministic() {
        let mut modules = ModuleRegistry::new();
        modules.define("g", &["a.cc", "p.rl", "q.rl"]).unwrap();
        modules.freeze();

        let mut artifacts = ArtifactRegistry::new();
        artifacts
            .register("app", &["entry.cc"], &["g"], &modules)
            .unwrap();

        let plan = || {
            BuildGraph::plan(
                test_vars(),
                builtin_modes(),
                &artifacts,
                &["app".to_string()],
            )
            .unwrap()
        };

        let a = serde_json::to_string(&plan()).unwrap();
        let b = serde_json::to_string(&plan()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_strip_sanitizers_drops_both_halves() {
        let mut mode = builtin_modes().remove(0);
        assert!(mode.has_sanitizers());

        mode.strip_sanitizers();
        assert!(!mode.has_sanitizers());
        assert!(mode.sanitize_libs.is_empty());
    }

    #[test]
    fn test_phony_aggregates_selected_artifacts() {
        let mut modules = ModuleRegistry::new();
        modules.define("g", &["a.cc"]).unwrap();
        modules.freeze();

        let mut artifacts = ArtifactRegistry::new();
        artifacts.register("x", &["x.cc"], &["g"], &modules).unwrap();
        artifacts.register("y", &["y.cc"], &["g"], &modules).unwrap();

        let graph = BuildGraph::plan(
            test_vars(),
            builtin_modes(),
            &artifacts,
            &["x".to_string(), "y".to_string()],
        )
        .unwrap();

        let section = &graph.modes[1];
        assert_eq!(section.phony.name, "release");
        assert_eq!(
            section.phony.inputs,
            vec![PathBuf::from("release/x"), PathBuf::from("release/y")]
        );
    }
}
