// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client for the server's symbolication task queue.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use quarry_crash_core::CrashReportId;

use crate::error::Result;

/// Basic-auth credentials attached to every request when configured.
#[derive(Debug, Clone)]
pub struct Credentials {
	pub username: String,
	pub password: String,
}

/// Client for the task queue endpoints exposed by `quarry-server`.
pub struct TaskQueueClient {
	http: Client,
	base_url: String,
	credentials: Option<Credentials>,
}

impl TaskQueueClient {
	pub fn new(
		base_url: impl Into<String>,
		credentials: Option<Credentials>,
		request_timeout: Duration,
	) -> Result<Self> {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		let http = Client::builder().timeout(request_timeout).build()?;

		Ok(Self {
			http,
			base_url,
			credentials,
		})
	}

	fn get(&self, path: &str) -> reqwest::RequestBuilder {
		let request = self.http.get(format!("{}{}", self.base_url, path));
		self.authorize(request)
	}

	fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match &self.credentials {
			Some(credentials) => {
				request.basic_auth(&credentials.username, Some(&credentials.password))
			}
			None => request,
		}
	}

	/// Fetch the todo list. An empty body means nothing to do.
	pub async fn todo_list(&self) -> Result<Vec<CrashReportId>> {
		let body = self
			.get("/api/symbolicate/todo")
			.send()
			.await?
			.error_for_status()?
			.text()
			.await?;

		Ok(parse_todo_list(&body))
	}

	/// Download the crash's currently persisted log text.
	pub async fn crash_data(&self, id: CrashReportId) -> Result<String> {
		let body = self
			.get(&format!("/api/symbolicate/crash/{id}"))
			.send()
			.await?
			.error_for_status()?
			.text()
			.await?;

		debug!(crash_id = %id, bytes = body.len(), "downloaded crash data");
		Ok(body)
	}

	/// Upload a symbolicated log. Returns whether the server acknowledged
	/// with the success marker.
	pub async fn submit(&self, id: CrashReportId, log: &str) -> Result<bool> {
		let request = self
			.http
			.post(format!("{}/api/symbolicate/update", self.base_url))
			.form(&[("id", id.to_string().as_str()), ("log", log)]);

		let response = self.authorize(request).send().await?;
		let body = response.text().await?;

		Ok(is_success_marker(&body))
	}
}

/// Parse the comma-separated todo list body. Malformed entries are dropped
/// with a warning rather than failing the whole list.
pub fn parse_todo_list(body: &str) -> Vec<CrashReportId> {
	body.split(',')
		.map(str::trim)
		.filter(|entry| !entry.is_empty())
		.filter_map(|entry| match entry.parse::<CrashReportId>() {
			Ok(id) => Some(id),
			Err(_) => {
				warn!(entry, "skipping malformed todo list entry");
				None
			}
		})
		.collect()
}

/// The server signals acceptance with the literal trailing token `success`.
pub fn is_success_marker(body: &str) -> bool {
	body.trim_end().ends_with("success")
}
