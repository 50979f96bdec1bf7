// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod dataflow;
pub mod factory;
pub mod node_executor;
pub mod worker_pool;

pub use dataflow::{DataflowScheduler, DataflowVariant};
pub use factory::{build_scheduler, SchedulerKind};
pub use node_executor::execute_node;
pub use worker_pool::WorkerPoolScheduler;
