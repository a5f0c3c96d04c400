//! The configure operation.
//!
//! One pass, strictly ordered: cheap input validation, shortcut
//! expansion, compiler probes, feature resolution, registry assembly,
//! graph planning, emission. Probes only run once the selection is
//! known to be valid.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::graph::{builtin_modes, ninja, BuildGraph, BuildMode, GlobalVars};
use crate::probe::{apply_tristate, Prober, Tristate};
use crate::registry::{
    defaults, ArtifactRegistry, FeatureAdditions, ModuleRegistry,
};
use crate::util::config::{project_toolchain_config_path, ToolchainConfig};
use crate::util::process::find_cxx_compiler;
use crate::util::fs;

/// Inputs to a configure run, one field per command-line surface item.
#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    /// Mode name or `all`.
    pub mode: String,
    /// Requested artifacts; empty selects every registered artifact.
    pub artifacts: Vec<String>,
    /// Compiler path override.
    pub compiler: Option<PathBuf>,
    /// Extra compiler flags, whitespace-separated.
    pub cflags: String,
    /// Extra linker flags, whitespace-separated.
    pub ldflags: String,
    pub static_link: bool,
    pub pie: bool,
    pub so: bool,
    pub xen: Tristate,
    pub hwloc: Tristate,
    /// OSv shortcut: implies `so`, disables hwloc, adds platform flags.
    pub with_osv: Option<PathBuf>,
    /// DPDK SDK target dir: adds its include/lib paths and libraries.
    pub dpdk_target: Option<PathBuf>,
    pub build_dir: PathBuf,
    pub output: PathBuf,
    /// Print the typed graph as JSON instead of writing the ninja file.
    pub plan: bool,
    /// Shell-quoted original argv, recorded for the regenerate rule.
    pub configure_args: String,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        ConfigureOptions {
            mode: "all".to_string(),
            artifacts: vec![],
            compiler: None,
            cflags: String::new(),
            ldflags: String::new(),
            static_link: false,
            pie: false,
            so: false,
            xen: Tristate::Auto,
            hwloc: Tristate::Auto,
            with_osv: None,
            dpdk_target: None,
            build_dir: PathBuf::from("build"),
            output: PathBuf::from("build.ninja"),
            plan: false,
            configure_args: String::new(),
        }
    }
}

/// Run configuration end to end.
pub fn configure(mut opts: ConfigureOptions) -> Result<()> {
    // Validation first: no subprocess spawns for inputs we can reject
    // by table lookup.
    let known_modes = builtin_modes();
    if opts.mode != "all" && !known_modes.iter().any(|m| m.name == opts.mode) {
        let names: Vec<_> = known_modes.iter().map(|m| m.name.as_str()).collect();
        bail!(
            "unknown mode `{}` (expected one of: {}, all)",
            opts.mode,
            names.join(", ")
        );
    }
    let known_artifacts = defaults::artifact_names();
    for artifact in &opts.artifacts {
        if !known_artifacts.contains(&artifact.as_str()) {
            bail!("unknown artifact `{artifact}`");
        }
    }

    let mut user_cflags: Vec<String> =
        opts.cflags.split_whitespace().map(String::from).collect();
    let mut user_ldflags: Vec<String> =
        opts.ldflags.split_whitespace().map(String::from).collect();
    let mut libs: Vec<String> = defaults::BASE_LIBS.iter().map(|l| l.to_string()).collect();

    // Shortcut expansions, before probing so they can flip tristates.
    if let Some(osv) = opts.with_osv.clone() {
        opts.so = true;
        opts.hwloc = Tristate::Disable;
        user_cflags.extend([
            "-DDEFAULT_ALLOCATOR".to_string(),
            "-fvisibility=default".to_string(),
            "-DHAVE_OSV".to_string(),
            format!("-I{}/include", osv.display()),
        ]);
    }
    if let Some(dpdk) = opts.dpdk_target.clone() {
        user_cflags.extend([
            "-DHAVE_DPDK".to_string(),
            format!("-I{}/include", dpdk.display()),
            "-Wno-error=literal-suffix".to_string(),
            "-Wno-literal-suffix".to_string(),
        ]);
        libs.push(format!("-L{}/lib", dpdk.display()));
        libs.extend(defaults::DPDK_LIBS.iter().map(|l| l.to_string()));
    }

    // Compiler: CLI flag, then project config, then CXX/PATH discovery.
    let config = ToolchainConfig::load_or_default(&project_toolchain_config_path(Path::new(".")));
    let cxx = opts
        .compiler
        .clone()
        .or_else(|| config.toolchain.cxx.clone())
        .or_else(find_cxx_compiler)
        .unwrap_or_else(|| PathBuf::from("g++"));
    user_cflags.splice(0..0, config.toolchain.cxxflags.iter().cloned());
    user_ldflags.splice(0..0, config.toolchain.ldflags.iter().cloned());

    tracing::debug!("configuring with compiler {}", cxx.display());
    let prober = Prober::new(&cxx);

    let warnings: Vec<String> = defaults::CANDIDATE_WARNINGS
        .iter()
        .filter(|w| prober.warning_supported(w))
        .map(|w| w.to_string())
        .collect();

    let dbgflag = prober.debug_flag();
    if dbgflag.is_none() {
        eprintln!("Note: debug information disabled; upgrade your compiler");
    }

    // Feature resolution: each active feature contributes an explicit
    // additions value; merging happens here, in resolution order.
    let mut additions = FeatureAdditions::default();
    for feature in defaults::features() {
        let requested = match feature.name {
            "xen" => opts.xen,
            "hwloc" => opts.hwloc,
            _ => Tristate::Auto,
        };
        let active = apply_tristate(
            requested,
            || prober.has_headers(feature.headers),
            feature.note,
            feature.missing,
        )?;
        tracing::debug!("feature {}: {}", feature.name, active);
        if active {
            additions.merge((feature.additions)());
        }
    }

    // Registry assembly. Base groups take the feature appends, then the
    // composites capture them, then everything freezes for emission.
    let mut modules = ModuleRegistry::new();
    defaults::register_base_groups(&mut modules)?;
    additions.apply_sources(&mut modules)?;
    defaults::register_composites(&mut modules)?;
    modules.freeze();

    let mut artifacts = ArtifactRegistry::new();
    defaults::register_artifacts(&mut artifacts, &modules)?;

    let selection: Vec<String> = if opts.artifacts.is_empty() {
        artifacts.names().map(String::from).collect()
    } else {
        opts.artifacts.clone()
    };

    let mut modes: Vec<BuildMode> = known_modes
        .into_iter()
        .filter(|m| opts.mode == "all" || m.name == opts.mode)
        .collect();
    if opts.static_link {
        for mode in modes.iter_mut().filter(|m| m.has_sanitizers()) {
            eprintln!("Note: --static disables {} mode sanitizers", mode.name);
            mode.strip_sanitizers();
        }
    }

    let (pie_flag, fpie_flag) = if opts.so {
        ("-shared", "-fpic")
    } else if opts.pie {
        ("-pie", "-fpie")
    } else {
        ("", "")
    };

    let mut cxxflags: Vec<String> = vec!["-std=gnu++1y".to_string()];
    cxxflags.extend(dbgflag.map(String::from));
    if !fpie_flag.is_empty() {
        cxxflags.push(fpie_flag.to_string());
    }
    cxxflags.extend(
        ["-Wall", "-Werror", "-fvisibility=hidden", "-pthread", "-I."]
            .map(String::from),
    );
    cxxflags.extend(user_cflags);
    cxxflags.extend(warnings);
    cxxflags.extend(additions.defines.iter().map(|d| format!("-D{d}")));

    let mut ldflags: Vec<String> = Vec::new();
    ldflags.extend(dbgflag.map(String::from));
    ldflags.push("-Wl,--no-as-needed".to_string());
    if opts.static_link {
        ldflags.push("-static".to_string());
    }
    if !pie_flag.is_empty() {
        ldflags.push(pie_flag.to_string());
    }
    ldflags.extend(["-fvisibility=hidden", "-pthread"].map(String::from));
    ldflags.extend(user_ldflags);

    libs.extend(additions.libs.iter().cloned());

    let vars = GlobalVars {
        configure_args: opts.configure_args.clone(),
        build_dir: opts.build_dir.clone(),
        self_path: std::env::current_exe().unwrap_or_else(|_| PathBuf::from("slipway")),
        cxx,
        cxxflags,
        ldflags,
        libs,
    };

    let graph = BuildGraph::plan(vars, modes, &artifacts, &selection)?;

    if opts.plan {
        println!("{}", serde_json::to_string_pretty(&graph)?);
        return Ok(());
    }

    fs::ensure_dir(&opts.build_dir)?;
    ninja::write(&graph, &opts.output)?;
    tracing::debug!("wrote {}", opts.output.display());

    Ok(())
}
