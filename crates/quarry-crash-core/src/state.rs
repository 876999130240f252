// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Symbolication ledger state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-crash symbolication progress.
///
/// The ledger is sparse: a crash with no ledger row is `Pending`. The
/// pipeline itself only ever drives `Pending`/`NeedsReview` to `NeedsReview`
/// (a successful symbolication submission); `Finalized` is an explicit
/// administrative transition and is never inferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolicationState {
	/// Never symbolicated; absent ledger row.
	#[default]
	Pending,
	/// Symbolicated at least once; eligible for re-processing.
	NeedsReview,
	/// No further pipeline action; set externally.
	Finalized,
}

impl SymbolicationState {
	/// Whether a worker should pick this crash up.
	pub fn is_actionable(self) -> bool {
		matches!(self, Self::Pending | Self::NeedsReview)
	}
}

impl fmt::Display for SymbolicationState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Pending => "pending",
			Self::NeedsReview => "needs_review",
			Self::Finalized => "finalized",
		};
		write!(f, "{s}")
	}
}

/// Error for an unrecognized ledger state string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown symbolication state: {0}")]
pub struct ParseStateError(pub String);

impl FromStr for SymbolicationState {
	type Err = ParseStateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"needs_review" => Ok(Self::NeedsReview),
			"finalized" => Ok(Self::Finalized),
			other => Err(ParseStateError(other.to_string())),
		}
	}
}
