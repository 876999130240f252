// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Repository layer for crash database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use quarry_crash_core::{
	CrashGroup, CrashGroupId, CrashReport, CrashReportId, CrashSignature, NewCrashReport,
	SymbolicationState,
};

use crate::error::{CrashStoreError, Result};

/// Scope filter for report queries and batch re-grouping.
///
/// Bundle identifier and version are always required; `group_id` optionally
/// narrows the match to members of one existing group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportScope {
	pub bundle_identifier: String,
	pub version: String,
	pub group_id: Option<CrashGroupId>,
}

impl ReportScope {
	pub fn new(bundle_identifier: impl Into<String>, version: impl Into<String>) -> Self {
		Self {
			bundle_identifier: bundle_identifier.into(),
			version: version.into(),
			group_id: None,
		}
	}

	pub fn with_group(mut self, group_id: CrashGroupId) -> Self {
		self.group_id = Some(group_id);
		self
	}

	/// Empty bundle identifier or version is a caller error, not a query
	/// that matches nothing.
	pub fn validate(&self) -> Result<()> {
		if self.bundle_identifier.is_empty() {
			return Err(CrashStoreError::InvalidScope(
				"bundle identifier must not be empty".to_string(),
			));
		}
		if self.version.is_empty() {
			return Err(CrashStoreError::InvalidScope(
				"version must not be empty".to_string(),
			));
		}
		Ok(())
	}
}

/// Outcome of pointing a report at a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupAssignment {
	/// The group the report now belongs to.
	pub group_id: CrashGroupId,
	/// Whether the group was created by this assignment.
	pub created: bool,
	/// The group the report belonged to before (possibly `UNGROUPED`).
	pub previous: CrashGroupId,
}

impl GroupAssignment {
	pub fn moved(&self) -> bool {
		self.group_id != self.previous
	}
}

/// Repository trait for crash operations.
#[async_trait]
pub trait CrashRepository: Send + Sync {
	// Report operations
	async fn insert_report(&self, report: &NewCrashReport) -> Result<CrashReportId>;
	async fn get_report(&self, id: CrashReportId) -> Result<Option<CrashReport>>;
	async fn list_reports(&self, scope: &ReportScope) -> Result<Vec<CrashReport>>;

	// Group operations
	async fn get_group(&self, id: CrashGroupId) -> Result<Option<CrashGroup>>;
	async fn list_groups(&self, bundle_identifier: &str, version: &str) -> Result<Vec<CrashGroup>>;
	async fn update_group_description(&self, id: CrashGroupId, description: &str) -> Result<()>;

	/// Find-or-create the group matching `signature` within the report's
	/// (bundle, version) scope and point the report at it, as one atomic
	/// unit. The signature fields of an existing group are never rewritten.
	async fn assign_report_to_group(
		&self,
		id: CrashReportId,
		bundle_identifier: &str,
		version: &str,
		signature: &CrashSignature,
	) -> Result<GroupAssignment>;

	// Symbolication ledger operations
	/// Overwrite the report's log and advance the ledger to `NeedsReview`,
	/// atomically. Neither mutation is observable without the other.
	async fn mark_symbolicated(&self, id: CrashReportId, log: &str) -> Result<()>;
	async fn ledger_state(&self, id: CrashReportId) -> Result<SymbolicationState>;
	/// External administrative transition to `Finalized`.
	async fn finalize_symbolication(&self, id: CrashReportId) -> Result<()>;
	/// Every crash id currently in `Pending` or `NeedsReview` state, in id
	/// order. Recomputed from store state on each call.
	async fn todo_crash_ids(&self) -> Result<Vec<CrashReportId>>;
}

/// SQLite implementation of the crash repository.
#[derive(Clone)]
pub struct SqliteCrashRepository {
	pool: SqlitePool,
}

impl SqliteCrashRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl CrashRepository for SqliteCrashRepository {
	#[instrument(skip(self, report), fields(bundle = %report.bundle_identifier, version = %report.version))]
	async fn insert_report(&self, report: &NewCrashReport) -> Result<CrashReportId> {
		let timestamp = report.timestamp.unwrap_or_else(Utc::now);

		let result = sqlx::query(
			r#"
			INSERT INTO crash_reports (
				bundle_identifier, application_name, version, timestamp,
				system_version, platform, jailbreak,
				user_id, username, contact, description, log, group_id
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
			"#,
		)
		.bind(&report.bundle_identifier)
		.bind(&report.application_name)
		.bind(&report.version)
		.bind(timestamp.to_rfc3339())
		.bind(&report.system_version)
		.bind(&report.platform)
		.bind(report.jailbreak as i32)
		.bind(&report.user_id)
		.bind(&report.username)
		.bind(&report.contact)
		.bind(&report.description)
		.bind(&report.log)
		.execute(&self.pool)
		.await?;

		Ok(CrashReportId(result.last_insert_rowid()))
	}

	#[instrument(skip(self), fields(crash_id = %id))]
	async fn get_report(&self, id: CrashReportId) -> Result<Option<CrashReport>> {
		let row = sqlx::query_as::<_, ReportRow>(
			r#"
			SELECT id, bundle_identifier, application_name, version, timestamp,
				   system_version, platform, jailbreak,
				   user_id, username, contact, description, log, group_id
			FROM crash_reports
			WHERE id = ?
			"#,
		)
		.bind(id.0)
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self), fields(bundle = %scope.bundle_identifier, version = %scope.version))]
	async fn list_reports(&self, scope: &ReportScope) -> Result<Vec<CrashReport>> {
		let rows = if let Some(group_id) = scope.group_id {
			sqlx::query_as::<_, ReportRow>(
				r#"
				SELECT id, bundle_identifier, application_name, version, timestamp,
					   system_version, platform, jailbreak,
					   user_id, username, contact, description, log, group_id
				FROM crash_reports
				WHERE bundle_identifier = ? AND version = ? AND group_id = ?
				ORDER BY system_version DESC, timestamp DESC
				"#,
			)
			.bind(&scope.bundle_identifier)
			.bind(&scope.version)
			.bind(group_id.0)
			.fetch_all(&self.pool)
			.await?
		} else {
			sqlx::query_as::<_, ReportRow>(
				r#"
				SELECT id, bundle_identifier, application_name, version, timestamp,
					   system_version, platform, jailbreak,
					   user_id, username, contact, description, log, group_id
				FROM crash_reports
				WHERE bundle_identifier = ? AND version = ?
				ORDER BY system_version DESC, timestamp DESC
				"#,
			)
			.bind(&scope.bundle_identifier)
			.bind(&scope.version)
			.fetch_all(&self.pool)
			.await?
		};

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(group_id = %id))]
	async fn get_group(&self, id: CrashGroupId) -> Result<Option<CrashGroup>> {
		let row = sqlx::query_as::<_, GroupRow>(
			r#"
			SELECT id, bundle_identifier, version, location, exception, reason, description
			FROM crash_groups
			WHERE id = ?
			"#,
		)
		.bind(id.0)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(Into::into))
	}

	#[instrument(skip(self), fields(bundle = %bundle_identifier, version = %version))]
	async fn list_groups(&self, bundle_identifier: &str, version: &str) -> Result<Vec<CrashGroup>> {
		let rows = sqlx::query_as::<_, GroupRow>(
			r#"
			SELECT id, bundle_identifier, version, location, exception, reason, description
			FROM crash_groups
			WHERE bundle_identifier = ? AND version = ?
			ORDER BY id
			"#,
		)
		.bind(bundle_identifier)
		.bind(version)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.into_iter().map(Into::into).collect())
	}

	#[instrument(skip(self, description), fields(group_id = %id))]
	async fn update_group_description(&self, id: CrashGroupId, description: &str) -> Result<()> {
		let result = sqlx::query("UPDATE crash_groups SET description = ? WHERE id = ?")
			.bind(description)
			.bind(id.0)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(CrashStoreError::GroupNotFound(id));
		}

		Ok(())
	}

	#[instrument(skip(self, signature), fields(crash_id = %id, bundle = %bundle_identifier, version = %version))]
	async fn assign_report_to_group(
		&self,
		id: CrashReportId,
		bundle_identifier: &str,
		version: &str,
		signature: &CrashSignature,
	) -> Result<GroupAssignment> {
		let mut tx = self.pool.begin().await?;

		let previous: Option<i64> =
			sqlx::query_scalar("SELECT group_id FROM crash_reports WHERE id = ?")
				.bind(id.0)
				.fetch_optional(&mut *tx)
				.await?;
		let previous = CrashGroupId(previous.ok_or(CrashStoreError::UnknownCrash(id))?);

		let existing: Option<i64> = sqlx::query_scalar(
			r#"
			SELECT id FROM crash_groups
			WHERE bundle_identifier = ? AND version = ?
			  AND location = ? AND exception = ? AND reason = ?
			ORDER BY id
			LIMIT 1
			"#,
		)
		.bind(bundle_identifier)
		.bind(version)
		.bind(&signature.location)
		.bind(&signature.exception)
		.bind(&signature.reason)
		.fetch_optional(&mut *tx)
		.await?;

		let (group_id, created) = match existing {
			Some(group_id) => (CrashGroupId(group_id), false),
			None => {
				let result = sqlx::query(
					r#"
					INSERT INTO crash_groups (
						bundle_identifier, version, location, exception, reason, description
					)
					VALUES (?, ?, ?, ?, ?, '')
					"#,
				)
				.bind(bundle_identifier)
				.bind(version)
				.bind(&signature.location)
				.bind(&signature.exception)
				.bind(&signature.reason)
				.execute(&mut *tx)
				.await?;

				(CrashGroupId(result.last_insert_rowid()), true)
			}
		};

		sqlx::query("UPDATE crash_reports SET group_id = ? WHERE id = ?")
			.bind(group_id.0)
			.bind(id.0)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		Ok(GroupAssignment {
			group_id,
			created,
			previous,
		})
	}

	#[instrument(skip(self, log), fields(crash_id = %id, log_len = log.len()))]
	async fn mark_symbolicated(&self, id: CrashReportId, log: &str) -> Result<()> {
		let mut tx = self.pool.begin().await?;

		let result = sqlx::query("UPDATE crash_reports SET log = ? WHERE id = ?")
			.bind(log)
			.bind(id.0)
			.execute(&mut *tx)
			.await?;

		if result.rows_affected() == 0 {
			return Err(CrashStoreError::UnknownCrash(id));
		}

		sqlx::query(
			r#"
			INSERT INTO symbolication_ledger (crash_id, state, updated_at)
			VALUES (?, ?, ?)
			ON CONFLICT (crash_id) DO UPDATE SET
				state = excluded.state,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(id.0)
		.bind(SymbolicationState::NeedsReview.to_string())
		.bind(Utc::now().to_rfc3339())
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(())
	}

	#[instrument(skip(self), fields(crash_id = %id))]
	async fn ledger_state(&self, id: CrashReportId) -> Result<SymbolicationState> {
		let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM crash_reports WHERE id = ?")
			.bind(id.0)
			.fetch_optional(&self.pool)
			.await?;
		if exists.is_none() {
			return Err(CrashStoreError::UnknownCrash(id));
		}

		let state: Option<String> =
			sqlx::query_scalar("SELECT state FROM symbolication_ledger WHERE crash_id = ?")
				.bind(id.0)
				.fetch_optional(&self.pool)
				.await?;

		match state {
			None => Ok(SymbolicationState::Pending),
			Some(raw) => raw
				.parse()
				.map_err(|_| CrashStoreError::Parse(format!("invalid ledger state: {raw}"))),
		}
	}

	#[instrument(skip(self), fields(crash_id = %id))]
	async fn finalize_symbolication(&self, id: CrashReportId) -> Result<()> {
		let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM crash_reports WHERE id = ?")
			.bind(id.0)
			.fetch_optional(&self.pool)
			.await?;
		if exists.is_none() {
			return Err(CrashStoreError::UnknownCrash(id));
		}

		sqlx::query(
			r#"
			INSERT INTO symbolication_ledger (crash_id, state, updated_at)
			VALUES (?, ?, ?)
			ON CONFLICT (crash_id) DO UPDATE SET
				state = excluded.state,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(id.0)
		.bind(SymbolicationState::Finalized.to_string())
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self))]
	async fn todo_crash_ids(&self) -> Result<Vec<CrashReportId>> {
		let ids: Vec<i64> = sqlx::query_scalar(
			r#"
			SELECT c.id
			FROM crash_reports c
			LEFT JOIN symbolication_ledger l ON l.crash_id = c.id
			WHERE l.state IS NULL OR l.state IN ('pending', 'needs_review')
			ORDER BY c.id
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		Ok(ids.into_iter().map(CrashReportId).collect())
	}
}

// ============================================================================
// Row types for SQLite
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
	id: i64,
	bundle_identifier: String,
	application_name: String,
	version: String,
	timestamp: String,
	system_version: String,
	platform: String,
	jailbreak: i32,
	user_id: String,
	username: String,
	contact: String,
	description: String,
	log: String,
	group_id: i64,
}

impl TryFrom<ReportRow> for CrashReport {
	type Error = CrashStoreError;

	fn try_from(row: ReportRow) -> Result<Self> {
		Ok(CrashReport {
			id: CrashReportId(row.id),
			bundle_identifier: row.bundle_identifier,
			application_name: row.application_name,
			version: row.version,
			timestamp: parse_datetime(&row.timestamp)?,
			system_version: row.system_version,
			platform: row.platform,
			jailbreak: row.jailbreak != 0,
			user_id: row.user_id,
			username: row.username,
			contact: row.contact,
			description: row.description,
			log: row.log,
			group_id: CrashGroupId(row.group_id),
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
	id: i64,
	bundle_identifier: String,
	version: String,
	location: String,
	exception: String,
	reason: String,
	description: String,
}

impl From<GroupRow> for CrashGroup {
	fn from(row: GroupRow) -> Self {
		CrashGroup {
			id: CrashGroupId(row.id),
			bundle_identifier: row.bundle_identifier,
			version: row.version,
			location: row.location,
			exception: row.exception,
			reason: row.reason,
			description: row.description,
		}
	}
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|_| CrashStoreError::InvalidDateTime(s.to_string()))
}
