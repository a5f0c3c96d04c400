//! Ninja serialization of a build graph.
//!
//! Rendering is a pure function of the graph; writing goes through a
//! temp-file-then-rename so a failed run never leaves a truncated file
//! the build executor would accept.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use super::{BuildGraph, ModeSection};
use crate::util::fs::write_atomic;

/// Render the graph as a ninja file named `buildfile` (the name appears
/// in the regenerate-self rule).
pub fn render(graph: &BuildGraph, buildfile: &str) -> String {
    let mut out = String::new();
    let vars = &graph.vars;

    let _ = writeln!(out, "configure_args = {}", vars.configure_args);
    let _ = writeln!(out, "builddir = {}", escape(&vars.build_dir.display().to_string()));
    let _ = writeln!(out, "cxx = {}", escape(&vars.cxx.display().to_string()));
    let _ = writeln!(out, "cxxflags = {}", vars.cxxflags.join(" "));
    let _ = writeln!(out, "ldflags = {}", vars.ldflags.join(" "));
    let _ = writeln!(out, "libs = {}", vars.libs.join(" "));
    out.push_str(
        "rule ragel\n  command = ragel -G2 -o $out $in\n  description = RAGEL $out\n",
    );

    for section in &graph.modes {
        render_mode(&mut out, section);
    }

    let _ = writeln!(out, "rule configure");
    let _ = writeln!(
        out,
        "  command = {} $configure_args",
        escape(&vars.self_path.display().to_string())
    );
    let _ = writeln!(out, "  generator = 1");
    let _ = writeln!(
        out,
        "build {}: configure | {}",
        escape(buildfile),
        escape(&vars.self_path.display().to_string())
    );
    let _ = writeln!(
        out,
        "default {}",
        graph
            .modes
            .iter()
            .map(|s| s.mode.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    );

    out
}

fn render_mode(out: &mut String, section: &ModeSection) {
    let mode = &section.mode;
    let name = &mode.name;

    let mut mode_cxxflags: Vec<&str> = Vec::new();
    mode_cxxflags.extend(mode.sanitize.iter().map(|s| s.as_str()));
    mode_cxxflags.extend(mode.opt.iter().map(|s| s.as_str()));
    let _ = writeln!(
        out,
        "cxxflags_{name} = {} -I $builddir/{name}/gen",
        mode_cxxflags.join(" ")
    );

    let mut mode_libs: Vec<&str> = Vec::new();
    mode_libs.extend(mode.libs.iter().map(|s| s.as_str()));
    mode_libs.extend(mode.sanitize_libs.iter().map(|s| s.as_str()));
    let _ = writeln!(out, "libs_{name} = {}", mode_libs.join(" "));

    let _ = writeln!(out, "rule cxx.{name}");
    let _ = writeln!(
        out,
        "  command = $cxx -MMD -MT $out -MF $out.d $cxxflags $cxxflags_{name} -c -o $out $in"
    );
    let _ = writeln!(out, "  description = CXX $out");
    let _ = writeln!(out, "  depfile = $out.d");
    let _ = writeln!(out, "rule link.{name}");
    let _ = writeln!(
        out,
        "  command = $cxx $cxxflags_{name} $ldflags -o $out $in $libs $libs_{name}"
    );
    let _ = writeln!(out, "  description = LINK $out");

    let _ = writeln!(
        out,
        "build {name}: phony {}",
        section
            .phony
            .inputs
            .iter()
            .map(|p| in_builddir(p))
            .collect::<Vec<_>>()
            .join(" ")
    );

    for link in &section.links {
        let _ = writeln!(
            out,
            "build {}: link.{name} {}",
            in_builddir(&link.output),
            link.objects
                .iter()
                .map(|p| in_builddir(p))
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    for compile in &section.compiles {
        let _ = write!(
            out,
            "build {}: cxx.{name} {}",
            in_builddir(&compile.object),
            escape(&compile.source.display().to_string())
        );
        if !compile.order_only.is_empty() {
            let _ = write!(
                out,
                " || {}",
                compile
                    .order_only
                    .iter()
                    .map(|p| in_builddir(p))
                    .collect::<Vec<_>>()
                    .join(" ")
            );
        }
        out.push('\n');
    }

    for codegen in &section.codegens {
        let _ = writeln!(
            out,
            "build {}: ragel {}",
            in_builddir(&codegen.output),
            escape(&codegen.input.display().to_string())
        );
    }
}

/// Prefix a build-dir-relative path with the `$builddir` variable.
fn in_builddir(path: &Path) -> String {
    format!("$builddir/{}", escape(&path.display().to_string()))
}

/// Escape ninja-significant characters in a path.
fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '$' => escaped.push_str("$$"),
            ' ' => escaped.push_str("$ "),
            ':' => escaped.push_str("$:"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serialize the graph to `path`, atomically.
pub fn write(graph: &BuildGraph, path: &Path) -> Result<()> {
    let buildfile = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "build.ninja".to_string());
    write_atomic(path, &render(graph, &buildfile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{builtin_modes, BuildGraph, GlobalVars};
    use crate::registry::{ArtifactRegistry, ModuleRegistry};
    use std::path::PathBuf;

    fn sample_graph() -> BuildGraph {
        let mut modules = ModuleRegistry::new();
        modules.define("g", &["a.cc", "gen.rl"]).unwrap();
        modules.freeze();

        let mut artifacts = ArtifactRegistry::new();
        artifacts
            .register("apps/demo", &["apps/demo/main.cc"], &["g"], &modules)
            .unwrap();

        let vars = GlobalVars {
            configure_args: "--mode release".to_string(),
            build_dir: PathBuf::from("build"),
            self_path: PathBuf::from("slipway"),
            cxx: PathBuf::from("g++"),
            cxxflags: vec!["-std=gnu++1y".to_string(), "-Wall".to_string()],
            ldflags: vec!["-pthread".to_string()],
            libs: vec!["-lm".to_string()],
        };
        let modes = builtin_modes()
            .into_iter()
            .filter(|m| m.name == "release")
            .collect();
        BuildGraph::plan(vars, modes, &artifacts, &["apps/demo".to_string()]).unwrap()
    }

    #[test]
    fn test_render_header_and_rules() {
        let text = render(&sample_graph(), "build.ninja");

        assert!(text.starts_with("configure_args = --mode release\n"));
        assert!(text.contains("builddir = build\n"));
        assert!(text.contains("cxxflags = -std=gnu++1y -Wall\n"));
        assert!(text.contains("rule ragel\n"));
        assert!(text.contains("rule cxx.release\n"));
        assert!(text.contains("  depfile = $out.d\n"));
        assert!(text.contains("rule link.release\n"));
    }

    #[test]
    fn test_render_steps() {
        let text = render(&sample_graph(), "build.ninja");

        assert!(text.contains("build release: phony $builddir/release/apps/demo\n"));
        assert!(text.contains(
            "build $builddir/release/apps/demo: link.release \
             $builddir/release/apps/demo/main.o $builddir/release/a.o\n"
        ));
        assert!(text.contains(
            "build $builddir/release/a.o: cxx.release a.cc || $builddir/release/gen/gen.hh\n"
        ));
        assert!(text.contains("build $builddir/release/gen/gen.hh: ragel gen.rl\n"));
    }

    #[test]
    fn test_render_regenerate_rule() {
        let text = render(&sample_graph(), "build.ninja");

        assert!(text.contains("rule configure\n"));
        assert!(text.contains("  command = slipway $configure_args\n"));
        assert!(text.contains("  generator = 1\n"));
        assert!(text.contains("build build.ninja: configure | slipway\n"));
        assert!(text.trim_end().ends_with("default release"));
    }

    #[test]
    fn test_mode_flag_composition() {
        let mut modules = ModuleRegistry::new();
        modules.define("g", &["a.cc"]).unwrap();
        modules.freeze();
        let mut artifacts = ArtifactRegistry::new();
        artifacts.register("a", &[], &["g"], &modules).unwrap();

        let vars = GlobalVars {
            configure_args: String::new(),
            build_dir: PathBuf::from("build"),
            self_path: PathBuf::from("slipway"),
            cxx: PathBuf::from("g++"),
            cxxflags: vec![],
            ldflags: vec![],
            libs: vec![],
        };
        let graph =
            BuildGraph::plan(vars, builtin_modes(), &artifacts, &["a".to_string()]).unwrap();
        let text = render(&graph, "build.ninja");

        assert!(text.contains(
            "cxxflags_debug = -fsanitize=address -fsanitize=leak -fsanitize=undefined \
             -O0 -DDEBUG -DDEFAULT_ALLOCATOR -I $builddir/debug/gen\n"
        ));
        assert!(text.contains("libs_debug = -lubsan -lasan\n"));
        assert!(text.contains("cxxflags_release = -O2 -I $builddir/release/gen\n"));
        assert!(text.contains("libs_release = \n"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a b"), "a$ b");
        assert_eq!(escape("a:b"), "a$:b");
        assert_eq!(escape("a$b"), "a$$b");
        assert_eq!(escape("plain/path.o"), "plain/path.o");
    }
}
