// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin JSON endpoints: listings, re-grouping, group annotation, and the
//! external finalize transition. The admin UI is the only consumer.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quarry_crash_core::{
	CrashGroup, CrashGroupId, CrashReport, CrashReportId, SymbolicationState,
};
use quarry_server_crash::{CrashRepository, CrashStoreError, RegroupSummary, ReportScope};

use crate::error::ServerError;
use crate::AppState;

pub fn router() -> Router<AppState> {
	Router::new()
		.route("/crashes", get(list_crashes))
		.route("/crashes/regroup", post(regroup))
		.route("/crashes/{id}/finalize", post(finalize))
		.route("/groups", get(list_groups))
		.route("/groups/{id}/description", put(update_description))
}

/// Query parameters shared with the original admin pages.
#[derive(Debug, Deserialize)]
struct ScopeParams {
	#[serde(default)]
	bundleidentifier: String,
	#[serde(default)]
	version: String,
	#[serde(default)]
	groupid: Option<i64>,
}

impl ScopeParams {
	fn to_scope(&self) -> Result<ReportScope, CrashStoreError> {
		let mut scope = ReportScope::new(&self.bundleidentifier, &self.version);
		if let Some(groupid) = self.groupid {
			scope = scope.with_group(CrashGroupId(groupid));
		}
		scope.validate()?;
		Ok(scope)
	}
}

/// One row of the crash listing; the log itself is only served through the
/// task queue download endpoint.
#[derive(Debug, Serialize)]
struct CrashListEntry {
	id: CrashReportId,
	timestamp: DateTime<Utc>,
	system_version: String,
	platform: String,
	jailbreak: bool,
	user_id: String,
	username: String,
	contact: String,
	group_id: CrashGroupId,
	symbolication: SymbolicationState,
}

impl CrashListEntry {
	fn from_report(report: CrashReport, symbolication: SymbolicationState) -> Self {
		Self {
			id: report.id,
			timestamp: report.timestamp,
			system_version: report.system_version,
			platform: report.platform,
			jailbreak: report.jailbreak,
			user_id: report.user_id,
			username: report.username,
			contact: report.contact,
			group_id: report.group_id,
			symbolication,
		}
	}
}

async fn list_crashes(
	State(state): State<AppState>,
	Query(params): Query<ScopeParams>,
) -> Result<Json<Vec<CrashListEntry>>, ServerError> {
	let scope = params.to_scope()?;
	let reports = state.repo.list_reports(&scope).await?;

	let mut entries = Vec::with_capacity(reports.len());
	for report in reports {
		let symbolication = state.ledger.query_state(report.id).await?;
		entries.push(CrashListEntry::from_report(report, symbolication));
	}

	Ok(Json(entries))
}

async fn list_groups(
	State(state): State<AppState>,
	Query(params): Query<ScopeParams>,
) -> Result<Json<Vec<CrashGroup>>, ServerError> {
	params.to_scope()?;
	let groups = state
		.repo
		.list_groups(&params.bundleidentifier, &params.version)
		.await?;
	Ok(Json(groups))
}

async fn regroup(
	State(state): State<AppState>,
	Query(params): Query<ScopeParams>,
) -> Result<Json<RegroupSummary>, ServerError> {
	let summary = state
		.engine
		.regroup_batch(
			&params.bundleidentifier,
			&params.version,
			params.groupid.map(CrashGroupId),
		)
		.await?;
	Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct DescriptionBody {
	description: String,
}

async fn update_description(
	State(state): State<AppState>,
	Path(id): Path<i64>,
	Json(body): Json<DescriptionBody>,
) -> Result<StatusCode, ServerError> {
	state
		.repo
		.update_group_description(CrashGroupId(id), &body.description)
		.await?;
	Ok(StatusCode::NO_CONTENT)
}

async fn finalize(
	State(state): State<AppState>,
	Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
	state.ledger.finalize(CrashReportId(id)).await?;
	Ok(StatusCode::NO_CONTENT)
}
