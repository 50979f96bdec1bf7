// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod cache;         // artifact store + skip filter
pub mod config;        // config loading + registries
pub mod descriptor;    // call descriptors
pub mod engine;        // schedulers + node executor
pub mod errors;        // error taxonomy
pub mod graph;         // graph model + plan compiler
pub mod observability; // structured log messages
pub mod runner;        // run coordinator
pub mod traits;        // unit + scheduler seams
pub mod units;         // built-in unit library
pub mod utils;         // timing + memory sampling
pub mod values;        // node values + control tokens
