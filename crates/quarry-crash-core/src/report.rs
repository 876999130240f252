// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash report records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CrashGroupId, CrashReportId};

/// One submitted occurrence of an application failure.
///
/// A report belongs to at most one [`crate::CrashGroup`] at a time; group
/// membership is mutable because an administrator may re-run grouping for a
/// (bundle, version) scope. The `log` field holds the raw crash log as
/// uploaded, and is overwritten with the symbolicated text when the worker
/// submits a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashReport {
	pub id: CrashReportId,
	pub bundle_identifier: String,
	pub application_name: String,
	pub version: String,
	pub timestamp: DateTime<Utc>,
	pub system_version: String,
	pub platform: String,
	pub jailbreak: bool,
	pub user_id: String,
	pub username: String,
	pub contact: String,
	pub description: String,
	pub log: String,
	pub group_id: CrashGroupId,
}

/// A crash report as produced by the ingestion boundary, before the store
/// has assigned an id. Ingestion always starts ungrouped with an empty
/// symbolication ledger (= pending).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCrashReport {
	pub bundle_identifier: String,
	pub application_name: String,
	pub version: String,
	pub timestamp: Option<DateTime<Utc>>,
	pub system_version: String,
	pub platform: String,
	pub jailbreak: bool,
	pub user_id: String,
	pub username: String,
	pub contact: String,
	pub description: String,
	pub log: String,
}
