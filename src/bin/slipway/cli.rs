//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use slipway::ops::ConfigureOptions;
use slipway::probe::Tristate;

/// Slipway - configure a build and emit its ninja build graph
#[derive(Parser)]
#[command(name = "slipway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Build mode to configure (or `all`)
    #[arg(long, default_value = "all")]
    pub mode: String,

    /// Artifact to configure; repeatable, defaults to every artifact
    #[arg(long = "with", value_name = "ARTIFACT")]
    pub artifacts: Vec<String>,

    /// C++ compiler path
    #[arg(long, value_name = "PATH", env = "CXX")]
    pub compiler: Option<PathBuf>,

    /// Extra flags for the C++ compiler
    #[arg(long, default_value = "", value_name = "FLAGS")]
    pub cflags: String,

    /// Extra flags for the linker
    #[arg(long, default_value = "", value_name = "FLAGS")]
    pub ldflags: String,

    /// Static link (useful for running on hosts outside the build environment)
    #[arg(long = "static")]
    pub static_link: bool,

    /// Build position-independent executables (PIE)
    #[arg(long)]
    pub pie: bool,

    /// Build shared objects (SO) instead of executables
    #[arg(long)]
    pub so: bool,

    /// Enable Xen support
    #[arg(long = "enable-xen", overrides_with = "disable_xen")]
    pub enable_xen: bool,

    /// Disable Xen support
    #[arg(long = "disable-xen", overrides_with = "enable_xen")]
    pub disable_xen: bool,

    /// Enable hwloc support
    #[arg(long = "enable-hwloc", overrides_with = "disable_hwloc")]
    pub enable_hwloc: bool,

    /// Disable hwloc support
    #[arg(long = "disable-hwloc", overrides_with = "enable_hwloc")]
    pub disable_hwloc: bool,

    /// Shortcut for compiling for OSv
    #[arg(long = "with-osv", value_name = "PATH")]
    pub with_osv: Option<PathBuf>,

    /// Path to DPDK SDK target location (e.g. <DPDK SDK dir>/x86_64-native-linuxapp-gcc)
    #[arg(long = "dpdk-target", value_name = "PATH")]
    pub dpdk_target: Option<PathBuf>,

    /// Output build description file
    #[arg(long, default_value = "build.ninja", value_name = "FILE")]
    pub output: PathBuf,

    /// Directory for build outputs
    #[arg(long = "build-dir", default_value = "build", value_name = "DIR")]
    pub build_dir: PathBuf,

    /// Print the build plan as JSON instead of writing the build file
    #[arg(long)]
    pub plan: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Lower the parsed arguments into configure inputs.
    ///
    /// `configure_args` is the original argv, already quoted, recorded
    /// in the output for the regenerate-self rule.
    pub fn into_options(self, configure_args: String) -> ConfigureOptions {
        ConfigureOptions {
            mode: self.mode,
            artifacts: self.artifacts,
            compiler: self.compiler,
            cflags: self.cflags,
            ldflags: self.ldflags,
            static_link: self.static_link,
            pie: self.pie,
            so: self.so,
            xen: Tristate::from_flags(self.enable_xen, self.disable_xen),
            hwloc: Tristate::from_flags(self.enable_hwloc, self.disable_hwloc),
            with_osv: self.with_osv,
            dpdk_target: self.dpdk_target,
            build_dir: self.build_dir,
            output: self.output,
            plan: self.plan,
            configure_args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tristate_flag_mapping() {
        let cli = Cli::parse_from(["slipway", "--enable-xen", "--disable-hwloc"]);
        let opts = cli.into_options(String::new());

        assert_eq!(opts.xen, Tristate::Enable);
        assert_eq!(opts.hwloc, Tristate::Disable);
    }

    #[test]
    fn test_later_tristate_flag_wins() {
        let cli = Cli::parse_from(["slipway", "--enable-xen", "--disable-xen"]);
        let opts = cli.into_options(String::new());

        assert_eq!(opts.xen, Tristate::Disable);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["slipway"]);
        let opts = cli.into_options(String::new());

        assert_eq!(opts.mode, "all");
        assert!(opts.artifacts.is_empty());
        assert_eq!(opts.xen, Tristate::Auto);
        assert_eq!(opts.output, PathBuf::from("build.ninja"));
    }

    #[test]
    fn test_repeatable_with() {
        let cli = Cli::parse_from([
            "slipway",
            "--with",
            "apps/httpd/httpd",
            "--with",
            "tests/tcp_test",
        ]);

        assert_eq!(cli.artifacts, ["apps/httpd/httpd", "tests/tcp_test"]);
    }
}
