// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured log messages for engine and unit lifecycle events.
//!
//! Message types are plain structs with a `Display` implementation plus a
//! [`messages::StructuredLog`] impl that emits the record through
//! `tracing` with structured fields. This keeps log strings out of the
//! execution code and gives every event one canonical shape.

pub mod messages;
