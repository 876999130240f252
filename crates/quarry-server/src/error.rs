// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP error mapping for the admin surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use quarry_server_crash::CrashStoreError;

/// Errors surfaced by admin request handlers.
///
/// Storage failures terminate the request with a 500; no partial response
/// body is ever produced.
#[derive(Debug, Error)]
pub enum ServerError {
	#[error(transparent)]
	Store(#[from] CrashStoreError),
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let Self::Store(err) = self;

		let (status, code) = match &err {
			CrashStoreError::InvalidScope(_) | CrashStoreError::InvalidSubmission(_) => {
				(StatusCode::BAD_REQUEST, "invalid_request")
			}
			CrashStoreError::UnknownCrash(_) | CrashStoreError::GroupNotFound(_) => {
				(StatusCode::NOT_FOUND, "not_found")
			}
			CrashStoreError::Database(_)
			| CrashStoreError::InvalidDateTime(_)
			| CrashStoreError::Parse(_) => {
				tracing::error!(error = %err, "crash store failure");
				(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
			}
		};

		let body = Json(serde_json::json!({
			"error": code,
			"message": err.to_string(),
		}));

		(status, body).into_response()
	}
}
