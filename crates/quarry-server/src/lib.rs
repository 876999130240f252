// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP server for the Quarry crash reporting backend.
//!
//! Exposes two surfaces over one router:
//!
//! - the worker-facing symbolication task queue (plain-text wire contract,
//!   see [`routes::symbolicate`])
//! - the admin JSON surface (listings, re-grouping, group annotation,
//!   finalize; see [`routes::admin`])
//!
//! Both sit behind the same optional basic-auth middleware.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::middleware;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use quarry_crash_core::AppleHeaderSignature;
use quarry_server_crash::{GroupingEngine, SqliteCrashRepository, SymbolicationLedger, TaskQueue};

pub use config::{BasicAuthConfig, ServerConfig};
pub use error::ServerError;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
	pub repo: Arc<SqliteCrashRepository>,
	pub engine: Arc<GroupingEngine<SqliteCrashRepository>>,
	pub ledger: SymbolicationLedger<SqliteCrashRepository>,
	pub queue: TaskQueue<SqliteCrashRepository>,
}

/// Build the application state from a database pool.
pub fn create_app_state(pool: SqlitePool) -> AppState {
	let repo = Arc::new(SqliteCrashRepository::new(pool));
	let engine = Arc::new(GroupingEngine::new(
		Arc::clone(&repo),
		Arc::new(AppleHeaderSignature),
	));
	let ledger = SymbolicationLedger::new(Arc::clone(&repo));
	let queue = TaskQueue::new(Arc::clone(&repo));

	AppState {
		repo,
		engine,
		ledger,
		queue,
	}
}

/// Build the router with both surfaces behind the optional auth layer.
pub fn create_router(state: AppState, auth: Option<BasicAuthConfig>) -> Router {
	Router::new()
		.nest("/api/symbolicate", routes::symbolicate::router())
		.nest("/api", routes::admin::router())
		.layer(middleware::from_fn_with_state(auth, auth::require_basic_auth))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::Body;
	use axum::http::{header, Request, StatusCode};
	use quarry_crash_core::{CrashReportId, NewCrashReport};
	use quarry_server_crash::CrashRepository;
	use tower::util::ServiceExt;

	async fn test_state() -> AppState {
		// One connection: every pooled connection to `:memory:` would
		// otherwise see its own empty database.
		let pool = sqlx::sqlite::SqlitePoolOptions::new()
			.max_connections(1)
			.connect("sqlite::memory:")
			.await
			.unwrap();
		db::run_migrations(&pool).await.unwrap();
		create_app_state(pool)
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

	async fn body_string(response: axum::response::Response) -> String {
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		String::from_utf8(bytes.to_vec()).unwrap()
	}

	fn update_request(body: &str) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri("/api/symbolicate/update")
			.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
			.body(Body::from(body.to_string()))
			.unwrap()
	}

	#[tokio::test]
	async fn todo_endpoint_returns_comma_separated_ids() {
		let state = test_state().await;
		let a = ingest(&state, "LOG A").await;
		let b = ingest(&state, "LOG B").await;
		let router = create_router(state, None);

		let response = router
			.oneshot(
				Request::builder()
					.uri("/api/symbolicate/todo")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_string(response).await, format!("{a},{b}"));
	}

	#[tokio::test]
	async fn empty_todo_list_is_an_empty_body() {
		let state = test_state().await;
		let router = create_router(state, None);

		let response = router
			.oneshot(
				Request::builder()
					.uri("/api/symbolicate/todo")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_string(response).await, "");
	}

	#[tokio::test]
	async fn crash_data_serves_raw_log_and_404s_unknown_ids() {
		let state = test_state().await;
		let id = ingest(&state, "BAD LOG").await;
		let router = create_router(state, None);

		let response = router
			.clone()
			.oneshot(
				Request::builder()
					.uri(format!("/api/symbolicate/crash/{id}"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_string(response).await, "BAD LOG");

		let response = router
			.oneshot(
				Request::builder()
					.uri("/api/symbolicate/crash/999")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
		assert_eq!(body_string(response).await, "");
	}

	#[tokio::test]
	async fn update_stores_log_and_answers_success_token() {
		let state = test_state().await;
		let id = ingest(&state, "BAD LOG").await;
		let router = create_router(state.clone(), None);

		let response = router
			.oneshot(update_request(&format!("id={id}&log=GOOD+LOG")))
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		let body = body_string(response).await;
		assert!(body.trim_end().ends_with("success"));

		let report = state.repo.get_report(id).await.unwrap().unwrap();
		assert_eq!(report.log, "GOOD LOG");
	}

	#[tokio::test]
	async fn update_ignores_unknown_form_fields() {
		let state = test_state().await;
		let id = ingest(&state, "BAD LOG").await;
		let router = create_router(state, None);

		let response = router
			.oneshot(update_request(&format!(
				"id={id}&log=GOOD&comment=ignored&admin=1"
			)))
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		assert!(body_string(response).await.ends_with("success"));
	}

	#[tokio::test]
	async fn update_rejects_empty_fields_without_mutating() {
		let state = test_state().await;
		let id = ingest(&state, "BAD LOG").await;
		let router = create_router(state.clone(), None);

		let response = router
			.clone()
			.oneshot(update_request(&format!("id={id}&log=")))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(body_string(response).await, "error");

		let response = router
			.oneshot(update_request("id=&log=GOOD"))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(body_string(response).await, "error");

		let report = state.repo.get_report(id).await.unwrap().unwrap();
		assert_eq!(report.log, "BAD LOG");
	}

	#[tokio::test]
	async fn configured_credentials_guard_every_route() {
		let state = test_state().await;
		let auth = Some(BasicAuthConfig {
			username: "admin".to_string(),
			password: "secret".to_string(),
		});
		let router = create_router(state, auth);

		let response = router
			.clone()
			.oneshot(
				Request::builder()
					.uri("/api/symbolicate/todo")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
		assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

		// "admin:secret"
		let response = router
			.oneshot(
				Request::builder()
					.uri("/api/symbolicate/todo")
					.header(header::AUTHORIZATION, "Basic YWRtaW46c2VjcmV0")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
	}

	#[tokio::test]
	async fn regroup_rejects_missing_scope() {
		let state = test_state().await;
		let router = create_router(state, None);

		let response = router
			.oneshot(
				Request::builder()
					.method("POST")
					.uri("/api/crashes/regroup?bundleidentifier=&version=1.0")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn regroup_empty_match_set_reports_zero_reassignments() {
		let state = test_state().await;
		let router = create_router(state, None);

		let response = router
			.oneshot(
				Request::builder()
					.method("POST")
					.uri("/api/crashes/regroup?bundleidentifier=com.app&version=9.9&groupid=5")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		let body = body_string(response).await;
		let summary: serde_json::Value = serde_json::from_str(&body).unwrap();
		assert_eq!(summary["examined"], 0);
		assert_eq!(summary["moved"], 0);
	}

	#[tokio::test]
	async fn group_description_is_admin_editable() {
		let state = test_state().await;
		let id = ingest(&state, "LOG").await;
		let report = state.repo.get_report(id).await.unwrap().unwrap();
		let group_id = state.engine.assign_group(&report).await.unwrap();
		let router = create_router(state.clone(), None);

		let response = router
			.oneshot(
				Request::builder()
					.method("PUT")
					.uri(format!("/api/groups/{group_id}/description"))
					.header(header::CONTENT_TYPE, "application/json")
					.body(Body::from(r#"{"description":"known null deref"}"#))
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::NO_CONTENT);

		let group = state.repo.get_group(group_id).await.unwrap().unwrap();
		assert_eq!(group.description, "known null deref");
	}

	#[tokio::test]
	async fn finalize_drops_crash_from_todo_list() {
		let state = test_state().await;
		let id = ingest(&state, "LOG").await;
		let router = create_router(state, None);

		let response = router
			.clone()
			.oneshot(
				Request::builder()
					.method("POST")
					.uri(format!("/api/crashes/{id}/finalize"))
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::NO_CONTENT);

		let response = router
			.oneshot(
				Request::builder()
					.uri("/api/symbolicate/todo")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(body_string(response).await, "");
	}
}
