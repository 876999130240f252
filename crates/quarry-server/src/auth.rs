// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Optional transport-level basic authentication.
//!
//! When credentials are configured, every route (the admin surface and the
//! worker-facing task queue alike) requires them. Without configured
//! credentials the middleware is a pass-through.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;

use crate::config::BasicAuthConfig;

pub async fn require_basic_auth(
	State(expected): State<Option<BasicAuthConfig>>,
	request: Request,
	next: Next,
) -> Response {
	let Some(expected) = expected else {
		return next.run(request).await;
	};

	let authorized = request
		.headers()
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(decode_basic)
		.map(|(username, password)| {
			username == expected.username && password == expected.password
		})
		.unwrap_or(false);

	if !authorized {
		return (
			StatusCode::UNAUTHORIZED,
			[(header::WWW_AUTHENTICATE, "Basic realm=\"quarry\"")],
			String::new(),
		)
			.into_response();
	}

	next.run(request).await
}

fn decode_basic(header_value: &str) -> Option<(String, String)> {
	let encoded = header_value.strip_prefix("Basic ")?;
	let decoded = base64::engine::general_purpose::STANDARD
		.decode(encoded)
		.ok()?;
	let decoded = String::from_utf8(decoded).ok()?;
	let (username, password) = decoded.split_once(':')?;
	Some((username.to_string(), password.to_string()))
}
