// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Symbolication ledger: per-crash progress tracking.

use std::sync::Arc;

use tracing::{info, instrument};

use quarry_crash_core::{CrashReportId, SymbolicationState};

use crate::error::Result;
use crate::repository::CrashRepository;

/// Tracks symbolication progress per crash report.
///
/// The ledger is sparse: a crash with no entry is `Pending`. The single
/// pipeline-driven transition is `Pending`/`NeedsReview` → `NeedsReview` via
/// [`mark_symbolicated`](Self::mark_symbolicated), which also overwrites the
/// report's log as one atomic unit. `Finalized` is only ever reached through
/// the explicit [`finalize`](Self::finalize) operation.
pub struct SymbolicationLedger<R> {
	repo: Arc<R>,
}

impl<R> Clone for SymbolicationLedger<R> {
	fn clone(&self) -> Self {
		Self {
			repo: Arc::clone(&self.repo),
		}
	}
}

impl<R: CrashRepository> SymbolicationLedger<R> {
	pub fn new(repo: Arc<R>) -> Self {
		Self { repo }
	}

	/// Record a successful symbolication: overwrite the stored log and
	/// advance the ledger to `NeedsReview`. Atomic: a failure leaves both
	/// the log and the ledger state unchanged.
	#[instrument(skip(self, new_log), fields(crash_id = %crash_id))]
	pub async fn mark_symbolicated(&self, crash_id: CrashReportId, new_log: &str) -> Result<()> {
		self.repo.mark_symbolicated(crash_id, new_log).await?;
		info!(crash_id = %crash_id, "crash symbolicated");
		Ok(())
	}

	/// Current state for a crash; `Pending` when no entry exists.
	pub async fn query_state(&self, crash_id: CrashReportId) -> Result<SymbolicationState> {
		self.repo.ledger_state(crash_id).await
	}

	/// Crash ids in `Pending` or `NeedsReview` state, in id order.
	/// Recomputed from current store state on every call.
	pub async fn pending(&self) -> Result<Vec<CrashReportId>> {
		self.repo.todo_crash_ids().await
	}

	/// The external administrative transition to `Finalized`.
	#[instrument(skip(self), fields(crash_id = %crash_id))]
	pub async fn finalize(&self, crash_id: CrashReportId) -> Result<()> {
		self.repo.finalize_symbolication(crash_id).await?;
		info!(crash_id = %crash_id, "crash symbolication finalized");
		Ok(())
	}
}
