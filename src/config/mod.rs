//! # Configuration Module
//!
//! This module centralizes the simulator's configuration. Constants are
//! grouped with their interdependencies documented and enforced through
//! compile-time assertions; runtime settings are loaded once at startup
//! and are immutable for the duration of a run.
//!
//! ## Module Organization
//!
//! - [`constants`]: default values and layout constants with dependency
//!   documentation
//! - [`settings`]: [`SimConfig`], the validated runtime configuration
//!   parsed from the `KEY value` config-file format

pub mod constants;
pub mod settings;

pub use constants::*;
pub use settings::SimConfig;
