// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod scheduler;
pub mod unit;

pub use scheduler::{RunContext, Scheduler};
pub use unit::{Unit, UnitBuilder};
