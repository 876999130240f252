// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the symbolication worker.

use thiserror::Error;

/// Errors that can occur while processing the todo list.
///
/// Everything here is non-fatal per item; only a failure to fetch the todo
/// list itself aborts a run.
#[derive(Debug, Error)]
pub enum WorkerError {
	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("symbolication tool exited with status {code:?}")]
	ToolFailed { code: Option<i32> },

	#[error("symbolication tool timed out")]
	ToolTimeout,

	#[error("symbolication tool produced no output")]
	EmptyOutput,

	#[error("server rejected the symbolicated log")]
	Rejected,
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
