// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod engine;
pub mod unit;

/// A log message that knows its level and structured fields.
pub trait StructuredLog: std::fmt::Display {
    fn log(&self);
}
