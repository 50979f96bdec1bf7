// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! YAML configuration loading.
//!
//! Two shapes are recognised. The *run configuration* describes one
//! pipeline execution and is what the CLI consumes:
//!
//! ```yaml
//! graph: forecast.graphs.nowcast
//! scheduler: processes
//! num_workers: 4
//! common_params:
//!   model: unified
//! cache:
//!   enabled: true
//!   dir: /var/cache/skein
//! ```
//!
//! The *global configuration* (referenced through `config_path`) carries
//! process-wide defaults: run-wide common parameters and the cache
//! settings.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::values::ParamMap;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Cache-related runtime settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// Process-wide configuration: common parameters and runtime settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GlobalConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub common_params: ParamMap,
}

/// One pipeline run, as described by a configuration file.
#[derive(Debug, Deserialize)]
pub struct RunFileConfig {
    /// Dotted-path reference into the graph registry.
    pub graph: String,
    #[serde(default)]
    pub graph_params: ParamMap,
    #[serde(default = "default_scheduler")]
    pub scheduler: String,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub profiler_path: Option<PathBuf>,
    #[serde(default)]
    pub common_params: ParamMap,
    /// Optional path to a [`GlobalConfig`] file.
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    /// Cache settings inline in the run config; overridden by
    /// `config_path` contents when both are present.
    #[serde(default)]
    pub cache: Option<CacheSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_scheduler() -> String {
    "processes".to_string()
}

fn default_num_workers() -> usize {
    1
}

pub fn load_global_config(path: &Path) -> Result<GlobalConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_run_config(path: &Path) -> Result<RunFileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
