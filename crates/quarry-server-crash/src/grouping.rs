// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grouping engine: assigns crash reports to groups by failure signature.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use quarry_crash_core::{CrashGroupId, CrashReport, SignatureStrategy};

use crate::error::Result;
use crate::repository::{CrashRepository, ReportScope};

/// Outcome of a batch re-group run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegroupSummary {
	/// Reports whose signature was re-derived.
	pub examined: u64,
	/// Reports that ended up in a different group than before.
	pub moved: u64,
	/// Groups created because no existing signature matched.
	pub groups_created: u64,
}

/// Assigns and re-assigns crash reports to groups.
///
/// Signature derivation is pluggable; group lookup and creation are
/// delegated to the repository, which serializes the find-or-create step so
/// two concurrent assignments with an identical new signature cannot
/// interleave inside one store transaction. A race that still slips two
/// groups past each other is left for the administrator to resolve; no
/// automatic merge is attempted.
pub struct GroupingEngine<R> {
	repo: Arc<R>,
	strategy: Arc<dyn SignatureStrategy>,
}

impl<R: CrashRepository> GroupingEngine<R> {
	pub fn new(repo: Arc<R>, strategy: Arc<dyn SignatureStrategy>) -> Self {
		Self { repo, strategy }
	}

	/// Assign `report` to the group matching its signature, creating the
	/// group if none exists for the (bundle, version) scope.
	#[instrument(skip(self, report), fields(crash_id = %report.id))]
	pub async fn assign_group(&self, report: &CrashReport) -> Result<CrashGroupId> {
		ReportScope::new(&report.bundle_identifier, &report.version).validate()?;

		let signature = self.strategy.derive(&report.log);
		let assignment = self
			.repo
			.assign_report_to_group(
				report.id,
				&report.bundle_identifier,
				&report.version,
				&signature,
			)
			.await?;

		debug!(
			crash_id = %report.id,
			group_id = %assignment.group_id,
			created = assignment.created,
			"assigned crash report to group"
		);

		Ok(assignment.group_id)
	}

	/// Re-derive the signature of every report in scope from its persisted
	/// log and re-run assignment. Idempotent: a second run with no
	/// intervening writes reassigns nothing.
	#[instrument(skip(self), fields(bundle = %bundle_identifier, version = %version))]
	pub async fn regroup_batch(
		&self,
		bundle_identifier: &str,
		version: &str,
		group_id: Option<CrashGroupId>,
	) -> Result<RegroupSummary> {
		let mut scope = ReportScope::new(bundle_identifier, version);
		if let Some(group_id) = group_id {
			scope = scope.with_group(group_id);
		}
		scope.validate()?;

		let reports = self.repo.list_reports(&scope).await?;
		let mut summary = RegroupSummary::default();

		for report in &reports {
			let signature = self.strategy.derive(&report.log);
			let assignment = self
				.repo
				.assign_report_to_group(report.id, bundle_identifier, version, &signature)
				.await?;

			summary.examined += 1;
			if assignment.moved() {
				summary.moved += 1;
			}
			if assignment.created {
				summary.groups_created += 1;
			}
		}

		info!(
			examined = summary.examined,
			moved = summary.moved,
			groups_created = summary.groups_created,
			"regroup batch finished"
		);

		Ok(summary)
	}
}
