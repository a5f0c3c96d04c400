//! Toolchain probing.
//!
//! A `Prober` answers yes/no questions about the configured compiler by
//! compiling synthetic translation units: does it accept a flag, does a
//! header set compile. Probes are compile-only (`-c` into the null
//! device) and judge solely by exit status; diagnostics are discarded.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::util::ProcessBuilder;

pub mod tristate;

pub use tristate::{apply_tristate, Tristate};

/// Runs compiler probes against a single configured C++ compiler.
#[derive(Debug, Clone)]
pub struct Prober {
    cxx: PathBuf,
    timeout: Duration,
}

impl Prober {
    /// Upper bound on a single probe; a stuck compiler counts as a
    /// failed probe rather than a hung configuration.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(cxx: impl Into<PathBuf>) -> Self {
        Prober {
            cxx: cxx.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the compiler under probe.
    pub fn cxx(&self) -> &Path {
        &self.cxx
    }

    /// Whether `source` compiles (no link) with the given extra flags.
    ///
    /// Spawn failures and timeouts report `false`; a missing compiler is
    /// indistinguishable from one that rejects everything, which is the
    /// right degradation for availability checks.
    pub fn try_compile(&self, source: &str, flags: &[&str]) -> bool {
        match self.try_compile_inner(source, flags) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::debug!("probe failed to run: {:#}", e);
                false
            }
        }
    }

    fn try_compile_inner(&self, source: &str, flags: &[&str]) -> Result<bool> {
        // NamedTempFile removes the unit on every exit path.
        let mut unit = tempfile::Builder::new()
            .prefix("slipway-probe-")
            .suffix(".cc")
            .tempfile()
            .context("failed to create probe translation unit")?;
        unit.write_all(source.as_bytes())
            .context("failed to write probe translation unit")?;
        unit.flush()?;

        let devnull = if cfg!(windows) { "NUL" } else { "/dev/null" };
        let probe = ProcessBuilder::new(&self.cxx)
            .args(["-x", "c++", "-o", devnull, "-c"])
            .arg(unit.path())
            .args(flags);

        tracing::debug!("probe: {}", probe.display_command());

        let status = probe.status_timeout(self.timeout)?;
        match status {
            Some(status) => Ok(status.success()),
            None => {
                tracing::debug!("probe timed out after {:?}", self.timeout);
                Ok(false)
            }
        }
    }

    /// Whether the compiler recognizes a warning flag.
    ///
    /// Probed with the `-Wno-` prefix rewritten to `-W`: gcc silently
    /// accepts unknown `-Wno-*` spellings but rejects the enable form.
    pub fn warning_supported(&self, warning: &str) -> bool {
        let adjusted = enable_spelling(warning);
        self.try_compile("", &[&adjusted])
    }

    /// Whether `-g` works together with the required language standard.
    ///
    /// Returns `None` on compilers too old to combine the two; the
    /// caller decides how loudly to report that.
    pub fn debug_flag(&self) -> Option<&'static str> {
        const SRC_WITH_AUTO: &str = "\
template <typename T>
struct x { auto f() {} };

x<int> a;
";
        if self.try_compile(SRC_WITH_AUTO, &["-g", "-std=gnu++1y"]) {
            Some("-g")
        } else {
            None
        }
    }

    /// Whether all given headers compile when included together.
    ///
    /// This is an availability proxy, not a full dependency check: no
    /// functions are called, only headers included.
    pub fn has_headers(&self, headers: &[&str]) -> bool {
        let source: String = headers
            .iter()
            .map(|h| format!("#include <{h}>\n"))
            .collect();
        self.try_compile(&source, &[])
    }
}

/// Rewrite a `-Wno-` suppression to its enable spelling.
fn enable_spelling(warning: &str) -> String {
    match warning.strip_prefix("-Wno-") {
        Some(rest) => format!("-W{rest}"),
        None => warning.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_spelling() {
        assert_eq!(enable_spelling("-Wno-mismatched-tags"), "-Wmismatched-tags");
        assert_eq!(enable_spelling("-Wall"), "-Wall");
    }

    #[cfg(unix)]
    #[test]
    fn test_try_compile_reports_exit_status() {
        // `true` and `false` accept any arguments, which makes them
        // convenient stand-ins for an accepting/rejecting compiler.
        assert!(Prober::new("true").try_compile("int x;", &[]));
        assert!(!Prober::new("false").try_compile("int x;", &[]));
    }

    #[test]
    fn test_missing_compiler_is_probe_failure() {
        let prober = Prober::new("/nonexistent/slipway-test-cxx");
        assert!(!prober.try_compile("", &[]));
        assert!(!prober.has_headers(&["hwloc.h"]));
        assert_eq!(prober.debug_flag(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_timeout_is_failure() {
        use std::os::unix::fs::PermissionsExt;

        // A "compiler" that hangs regardless of its arguments.
        let dir = tempfile::TempDir::new().unwrap();
        let stub = dir.path().join("cxx");
        std::fs::write(&stub, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let prober = Prober::new(&stub).with_timeout(Duration::from_millis(50));
        assert!(!prober.try_compile("", &[]));
    }
}
