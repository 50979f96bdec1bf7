// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod execution;
mod graph;

pub use execution::{
    InitArityError, TaskExecutionError, UnitCallError, UnitError, UnitInitError,
};
pub use graph::{GraphValidationError, SchedulerConfigError};

/// Boxed cause attached to wrapped unit failures.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;
