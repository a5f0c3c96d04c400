//! High-level operations.

pub mod configure;

pub use configure::{configure, ConfigureOptions};
