// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Worker-facing task queue endpoints.
//!
//! This is a wire contract shared with deployed symbolication workers and
//! must stay stable:
//!
//! - `GET /api/symbolicate/todo` - plain-text comma-separated crash ids;
//!   empty body means nothing to do
//! - `GET /api/symbolicate/crash/{id}` - raw log bytes; 404 with an empty
//!   body for an unknown id
//! - `POST /api/symbolicate/update` - form fields `id` and `log`; the
//!   response body ends with the literal token `success` on success and
//!   `error` otherwise. Unknown form fields are ignored.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{error, warn};

use quarry_crash_core::CrashReportId;
use quarry_server_crash::CrashStoreError;

use crate::AppState;

pub fn router() -> Router<AppState> {
	Router::new()
		.route("/todo", get(todo_list))
		.route("/crash/{id}", get(crash_data))
		.route("/update", post(submit_result))
}

async fn todo_list(State(state): State<AppState>) -> Response {
	match state.queue.todo_list().await {
		Ok(ids) => {
			let body = ids
				.iter()
				.map(ToString::to_string)
				.collect::<Vec<_>>()
				.join(",");
			(StatusCode::OK, body).into_response()
		}
		Err(err) => {
			error!(error = %err, "failed to compute todo list");
			(StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response()
		}
	}
}

async fn crash_data(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
	match state.queue.crash_data(CrashReportId(id)).await {
		Ok(log) => (StatusCode::OK, log).into_response(),
		Err(CrashStoreError::UnknownCrash(_)) => {
			(StatusCode::NOT_FOUND, String::new()).into_response()
		}
		Err(err) => {
			error!(crash_id = id, error = %err, "failed to load crash data");
			(StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response()
		}
	}
}

/// Only `id` and `log` are read; any other posted field is ignored.
#[derive(Debug, Deserialize)]
struct UpdateForm {
	#[serde(default)]
	id: String,
	#[serde(default)]
	log: String,
}

async fn submit_result(State(state): State<AppState>, Form(form): Form<UpdateForm>) -> Response {
	let Ok(id) = form.id.parse::<CrashReportId>() else {
		warn!(id = %form.id, "symbolication update with missing or malformed id");
		return (StatusCode::BAD_REQUEST, "error").into_response();
	};

	match state.queue.submit_result(id, &form.log).await {
		Ok(()) => (StatusCode::OK, "success").into_response(),
		Err(CrashStoreError::InvalidSubmission(_)) => {
			(StatusCode::BAD_REQUEST, "error").into_response()
		}
		Err(CrashStoreError::UnknownCrash(_)) => {
			(StatusCode::NOT_FOUND, "error").into_response()
		}
		Err(err) => {
			error!(crash_id = %id, error = %err, "failed to store symbolication result");
			(StatusCode::INTERNAL_SERVER_ERROR, "error").into_response()
		}
	}
}
