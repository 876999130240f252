// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pull-based symbolication task queue.
//!
//! The coordination point between the ledger and a remote worker that has no
//! database access. Delivery is at-least-once: the todo list is a snapshot
//! with no lease or reservation, so overlapping workers may download and
//! submit the same crash id more than once. Submission is therefore an
//! unconditional overwrite rather than a compare-and-swap, which makes it
//! idempotent.

use std::sync::Arc;

use tracing::{instrument, warn};

use quarry_crash_core::CrashReportId;

use crate::error::{CrashStoreError, Result};
use crate::ledger::SymbolicationLedger;
use crate::repository::CrashRepository;

/// Serves the worker-facing todo list, crash downloads, and result uploads.
pub struct TaskQueue<R> {
	repo: Arc<R>,
	ledger: SymbolicationLedger<R>,
}

impl<R> Clone for TaskQueue<R> {
	fn clone(&self) -> Self {
		Self {
			repo: Arc::clone(&self.repo),
			ledger: self.ledger.clone(),
		}
	}
}

impl<R: CrashRepository> TaskQueue<R> {
	pub fn new(repo: Arc<R>) -> Self {
		let ledger = SymbolicationLedger::new(Arc::clone(&repo));
		Self { repo, ledger }
	}

	/// Snapshot of every crash id awaiting (re-)symbolication, in id order.
	/// No reservation is taken; concurrent callers may receive overlapping
	/// lists.
	pub async fn todo_list(&self) -> Result<Vec<CrashReportId>> {
		self.ledger.pending().await
	}

	/// The crash's currently persisted log text: raw, or the result of a
	/// previous symbolication pass.
	#[instrument(skip(self), fields(crash_id = %crash_id))]
	pub async fn crash_data(&self, crash_id: CrashReportId) -> Result<String> {
		let report = self
			.repo
			.get_report(crash_id)
			.await?
			.ok_or(CrashStoreError::UnknownCrash(crash_id))?;
		Ok(report.log)
	}

	/// Accept a symbolicated log for a crash. An empty log is rejected
	/// before any state is touched. Applying the same submission twice
	/// leaves the store exactly as one application would.
	#[instrument(skip(self, symbolicated_log), fields(crash_id = %crash_id))]
	pub async fn submit_result(
		&self,
		crash_id: CrashReportId,
		symbolicated_log: &str,
	) -> Result<()> {
		if symbolicated_log.is_empty() {
			warn!(crash_id = %crash_id, "rejecting empty symbolication result");
			return Err(CrashStoreError::InvalidSubmission(
				"log must not be empty".to_string(),
			));
		}

		self.ledger.mark_symbolicated(crash_id, symbolicated_log).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::repository::tests::{create_test_repo, sample_report};
	use quarry_crash_core::SymbolicationState;

	async fn queue() -> TaskQueue<crate::SqliteCrashRepository> {
		TaskQueue::new(Arc::new(create_test_repo().await))
	}

	#[tokio::test]
	async fn todo_list_reflects_ledger_states() {
		let queue = queue().await;
		let a = queue
			.repo
			.insert_report(&sample_report("com.app", "1.0", "LOG A"))
			.await
			.unwrap();
		let b = queue
			.repo
			.insert_report(&sample_report("com.app", "1.0", "LOG B"))
			.await
			.unwrap();
		let c = queue
			.repo
			.insert_report(&sample_report("com.app", "1.0", "LOG C"))
			.await
			.unwrap();

		queue.submit_result(b, "GOOD B").await.unwrap();
		queue.repo.finalize_symbolication(c).await.unwrap();

		// Pending and needs-review stay on the list; finalized drops off.
		assert_eq!(queue.todo_list().await.unwrap(), vec![a, b]);
	}

	#[tokio::test]
	async fn crash_data_returns_latest_persisted_log() {
		let queue = queue().await;
		let id = queue
			.repo
			.insert_report(&sample_report("com.app", "1.0", "BAD LOG"))
			.await
			.unwrap();

		assert_eq!(queue.crash_data(id).await.unwrap(), "BAD LOG");

		queue.submit_result(id, "GOOD LOG").await.unwrap();
		assert_eq!(queue.crash_data(id).await.unwrap(), "GOOD LOG");
	}

	#[tokio::test]
	async fn crash_data_unknown_id_is_not_found() {
		let queue = queue().await;
		let err = queue.crash_data(CrashReportId(42)).await.unwrap_err();
		assert!(matches!(err, CrashStoreError::UnknownCrash(_)));
	}

	#[tokio::test]
	async fn submit_result_is_idempotent() {
		let queue = queue().await;
		let id = queue
			.repo
			.insert_report(&sample_report("com.app", "1.0", "BAD LOG"))
			.await
			.unwrap();

		queue.submit_result(id, "GOOD LOG").await.unwrap();
		queue.submit_result(id, "GOOD LOG").await.unwrap();

		let report = queue.repo.get_report(id).await.unwrap().unwrap();
		assert_eq!(report.log, "GOOD LOG");
		assert_eq!(
			queue.repo.ledger_state(id).await.unwrap(),
			SymbolicationState::NeedsReview
		);
	}

	#[tokio::test]
	async fn empty_submission_is_rejected_without_state_change() {
		let queue = queue().await;
		let id = queue
			.repo
			.insert_report(&sample_report("com.app", "1.0", "BAD LOG"))
			.await
			.unwrap();

		let err = queue.submit_result(id, "").await.unwrap_err();
		assert!(matches!(err, CrashStoreError::InvalidSubmission(_)));

		let report = queue.repo.get_report(id).await.unwrap().unwrap();
		assert_eq!(report.log, "BAD LOG");
		assert_eq!(
			queue.repo.ledger_state(id).await.unwrap(),
			SymbolicationState::Pending
		);
	}

	#[tokio::test]
	async fn concurrent_submissions_last_write_wins() {
		let queue = queue().await;
		let id = queue
			.repo
			.insert_report(&sample_report("com.app", "1.0", "BAD LOG"))
			.await
			.unwrap();

		queue.submit_result(id, "FIRST PASS").await.unwrap();
		queue.submit_result(id, "SECOND PASS").await.unwrap();

		assert_eq!(queue.crash_data(id).await.unwrap(), "SECOND PASS");
	}
}
