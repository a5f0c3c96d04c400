//! Tri-state feature resolution.
//!
//! A feature switch has three user-visible states: explicitly enabled,
//! explicitly disabled, or left to auto-detection. The asymmetry in
//! `apply_tristate` is deliberate: an explicit request is a hard
//! contract, an unspecified default is a best-effort enhancement.

use thiserror::Error;

/// A user-settable feature switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tristate {
    /// `--enable-<feature>`: required, probe failure is fatal.
    Enable,
    /// `--disable-<feature>`: off, probe never runs.
    Disable,
    /// Neither flag given: probe decides, failure degrades silently.
    #[default]
    Auto,
}

impl Tristate {
    /// Combine a `--enable-x` / `--disable-x` flag pair. The later flag
    /// wins when both are present, which clap models via overrides.
    pub fn from_flags(enable: bool, disable: bool) -> Self {
        match (enable, disable) {
            (_, true) => Tristate::Disable,
            (true, false) => Tristate::Enable,
            (false, false) => Tristate::Auto,
        }
    }
}

/// An explicitly requested feature whose probe failed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MissingRequirement(pub String);

/// Decide whether a feature is active.
///
/// `Disable` returns false without probing. Otherwise the probe runs:
/// success activates the feature; failure is fatal for `Enable` (the
/// `missing` message becomes the error) and prints `note` for `Auto`.
pub fn apply_tristate(
    requested: Tristate,
    probe: impl FnOnce() -> bool,
    note: &str,
    missing: &str,
) -> Result<bool, MissingRequirement> {
    if requested == Tristate::Disable {
        return Ok(false);
    }
    if probe() {
        return Ok(true);
    }
    match requested {
        Tristate::Enable => Err(MissingRequirement(missing.to_string())),
        Tristate::Auto => {
            eprintln!("{note}");
            Ok(false)
        }
        Tristate::Disable => unreachable!(),
    }
}
