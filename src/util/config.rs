//! Configuration file support for Slipway.
//!
//! Toolchain overrides live in `.slipway/toolchain.toml` relative to the
//! project root. Command-line flags always take precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Toolchain configuration for compiler overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Toolchain settings
    pub toolchain: ToolchainSettings,
}

/// Toolchain settings for C++ compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the C++ compiler (e.g., /usr/bin/clang++)
    pub cxx: Option<PathBuf>,

    /// Additional C++ compiler flags
    #[serde(default)]
    pub cxxflags: Vec<String>,

    /// Additional linker flags
    #[serde(default)]
    pub ldflags: Vec<String>,
}

impl ToolchainConfig {
    /// Load toolchain configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read toolchain config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse toolchain config: {}", path.display()))
    }

    /// Load toolchain configuration, falling back to defaults if the file
    /// is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(
                    "failed to load toolchain config from {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            })
        } else {
            Self::default()
        }
    }
}

/// Path to the project toolchain config for a given project root.
pub fn project_toolchain_config_path(root: &Path) -> PathBuf {
    root.join(".slipway").join("toolchain.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toolchain_config() {
        let config: ToolchainConfig = toml::from_str(
            r#"
            [toolchain]
            cxx = "/usr/bin/clang++"
            cxxflags = ["-fcolor-diagnostics"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.toolchain.cxx,
            Some(PathBuf::from("/usr/bin/clang++"))
        );
        assert_eq!(config.toolchain.cxxflags, vec!["-fcolor-diagnostics"]);
        assert!(config.toolchain.ldflags.is_empty());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = ToolchainConfig::load_or_default(Path::new("/nonexistent/toolchain.toml"));
        assert!(config.toolchain.cxx.is_none());
    }
}
