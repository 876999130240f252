// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Quarry crash reporting system.
//!
//! This crate provides shared types for the crash reporting backend: crash
//! reports, crash groups, failure signatures, and the symbolication ledger
//! state. It is used by the server-side implementation
//! (`quarry-server-crash`, `quarry-server`) and by the detached
//! symbolication worker (`quarry-symbolicate-worker`).
//!
//! # Overview
//!
//! The crash reporting system supports:
//! - Crash log ingestion from client devices (server-assigned monotonic ids)
//! - Grouping of reports by failure signature (location/exception/reason)
//! - Administrator-triggered re-grouping of a (bundle, version) scope
//! - A pull-based symbolication task queue consumed by a remote worker
//! - A sparse per-crash symbolication ledger (pending/needs-review/finalized)

pub mod group;
pub mod report;
pub mod signature;
pub mod state;

pub use group::{CrashGroup, CrashSignature};
pub use report::{CrashReport, NewCrashReport};
pub use signature::{AppleHeaderSignature, SignatureStrategy};
pub use state::{ParseStateError, SymbolicationState};

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Crash report ID (server-assigned, monotonic).
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct CrashReportId(pub i64);

impl fmt::Display for CrashReportId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for CrashReportId {
	type Err = ParseIntError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(s.parse()?))
	}
}

/// Crash group ID. `0` means "not yet grouped".
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct CrashGroupId(pub i64);

impl CrashGroupId {
	/// Sentinel for a report that has not been assigned to any group.
	pub const UNGROUPED: CrashGroupId = CrashGroupId(0);

	pub fn is_ungrouped(self) -> bool {
		self == Self::UNGROUPED
	}
}

impl fmt::Display for CrashGroupId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for CrashGroupId {
	type Err = ParseIntError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(s.parse()?))
	}
}
