// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end worker cycle against a real server router.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quarry_crash_core::{CrashReportId, NewCrashReport, SymbolicationState};
use quarry_server::{create_app_state, create_router, AppState};
use quarry_server_crash::CrashRepository;
use quarry_symbolicate_worker::{Runner, TaskQueueClient};

async fn spawn_server() -> (AppState, String) {
	// One connection: every pooled connection to `:memory:` would otherwise
	// see its own empty database.
	let pool = sqlx::sqlite::SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap();
	quarry_server::db::run_migrations(&pool).await.unwrap();
	let state = create_app_state(pool);
	let router = create_router(state.clone(), None);

	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, router).await.unwrap();
	});

	(state, format!("http://{addr}"))
}

async fn ingest(state: &AppState, log: &str) -> CrashReportId {
	state
		.repo
		.insert_report(&NewCrashReport {
			bundle_identifier: "com.app".to_string(),
			version: "1.0".to_string(),
			log: log.to_string(),
			..NewCrashReport::default()
		})
		.await
		.unwrap()
}

fn stub_tool(dir: &Path, script: &str) -> PathBuf {
	let path = dir.join("stub-symbolicate");
	std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
	std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
	path
}

fn runner(base_url: &str, tool: PathBuf) -> Runner {
	let client = TaskQueueClient::new(base_url, None, Duration::from_secs(5)).unwrap();
	Runner::new(client, tool, Duration::from_secs(5))
}

#[tokio::test]
async fn cycle_symbolicates_and_skips_empty_logs() {
	let (state, base_url) = spawn_server().await;

	// Crash with an empty log is skipped; crash with a raw log is processed.
	let empty = ingest(&state, "").await;
	let raw = ingest(&state, "BAD LOG").await;

	let dir = tempfile::tempdir().unwrap();
	let tool = stub_tool(dir.path(), "printf 'GOOD LOG' > \"$2\"");

	let summary = runner(&base_url, tool).run_cycle().await.unwrap();
	assert_eq!(summary.symbolicated, 1);
	assert_eq!(summary.skipped, 1);
	assert_eq!(summary.failed, 0);

	let report = state.repo.get_report(raw).await.unwrap().unwrap();
	assert_eq!(report.log, "GOOD LOG");
	assert_eq!(
		state.repo.ledger_state(raw).await.unwrap(),
		SymbolicationState::NeedsReview
	);

	// The skipped crash was never touched.
	let untouched = state.repo.get_report(empty).await.unwrap().unwrap();
	assert_eq!(untouched.log, "");
	assert_eq!(
		state.repo.ledger_state(empty).await.unwrap(),
		SymbolicationState::Pending
	);
}

#[tokio::test]
async fn one_failing_item_does_not_abort_the_batch() {
	let (state, base_url) = spawn_server().await;

	ingest(&state, "FIRST LOG").await;
	ingest(&state, "SECOND LOG").await;

	let dir = tempfile::tempdir().unwrap();
	// Fails on the first input it sees, succeeds afterwards.
	let tool = stub_tool(
		dir.path(),
		"if grep -q FIRST \"$3\"; then exit 1; fi\nprintf 'GOOD LOG' > \"$2\"",
	);

	let summary = runner(&base_url, tool).run_cycle().await.unwrap();
	assert_eq!(summary.symbolicated, 1);
	assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn empty_todo_list_is_nothing_to_do() {
	let (_state, base_url) = spawn_server().await;

	let dir = tempfile::tempdir().unwrap();
	let tool = stub_tool(dir.path(), "exit 1");

	let summary = runner(&base_url, tool).run_cycle().await.unwrap();
	assert_eq!(summary, quarry_symbolicate_worker::CycleSummary::default());
}

#[tokio::test]
async fn unreachable_todo_endpoint_is_fatal() {
	let dir = tempfile::tempdir().unwrap();
	let tool = stub_tool(dir.path(), "exit 0");

	// Nothing is listening on this port.
	let result = runner("http://127.0.0.1:9", tool).run_cycle().await;
	assert!(result.is_err());
}
