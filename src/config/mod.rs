// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod loader;
pub mod registry;

pub use loader::{
    load_global_config, load_run_config, ConfigError, GlobalConfig, RunFileConfig,
    RuntimeConfig,
};
pub use registry::{GraphRegistry, RegistryEntry, UnitRegistry};
