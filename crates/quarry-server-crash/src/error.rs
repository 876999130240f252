// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for crash store operations.

use quarry_crash_core::{CrashGroupId, CrashReportId};
use thiserror::Error;

/// Errors that can occur in crash store and pipeline operations.
#[derive(Debug, Error)]
pub enum CrashStoreError {
	/// A required scoping parameter (bundle identifier or version) was empty.
	#[error("invalid scope: {0}")]
	InvalidScope(String),

	/// The referenced crash report does not exist.
	#[error("unknown crash: {0}")]
	UnknownCrash(CrashReportId),

	/// The referenced crash group does not exist.
	#[error("group not found: {0}")]
	GroupNotFound(CrashGroupId),

	/// A symbolication submission was rejected before touching the store.
	#[error("invalid submission: {0}")]
	InvalidSubmission(String),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("invalid datetime: {0}")]
	InvalidDateTime(String),

	#[error("parse error: {0}")]
	Parse(String),
}

/// Result type for crash store operations.
pub type Result<T> = std::result::Result<T, CrashStoreError>;
