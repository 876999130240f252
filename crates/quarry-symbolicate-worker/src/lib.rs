// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Detached symbolication worker for the Quarry crash reporting backend.
//!
//! The worker has no database access: it talks to the server's task queue
//! over HTTP, runs the external symbolication tool on a local toolchain, and
//! posts results back. Delivery is at-least-once. The todo list carries no
//! lease, so multiple worker instances may process the same crash id, and
//! submissions are idempotent overwrites.

pub mod client;
pub mod error;
pub mod runner;

pub use client::{Credentials, TaskQueueClient};
pub use error::{Result, WorkerError};
pub use runner::{CycleSummary, Runner};
