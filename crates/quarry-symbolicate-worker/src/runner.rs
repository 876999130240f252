// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The symbolication loop: poll, download, run the tool, upload.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, instrument, warn};

use quarry_crash_core::CrashReportId;

use crate::client::TaskQueueClient;
use crate::error::{Result, WorkerError};

/// Tally of one run over the todo list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
	pub symbolicated: usize,
	pub skipped: usize,
	pub failed: usize,
}

/// Outcome of one crash id. One item failing never aborts the batch.
#[derive(Debug)]
enum ItemOutcome {
	Symbolicated,
	Skipped(String),
	Failed(String),
}

/// Processes the server's todo list with an external symbolication tool.
///
/// The tool is invoked as `tool -o <output> <input>` and is treated as an
/// opaque black box: exit 0 plus a non-empty output file is success,
/// anything else is a per-item failure.
pub struct Runner {
	client: TaskQueueClient,
	tool: PathBuf,
	tool_timeout: Duration,
}

impl Runner {
	pub fn new(client: TaskQueueClient, tool: PathBuf, tool_timeout: Duration) -> Self {
		Self {
			client,
			tool,
			tool_timeout,
		}
	}

	/// Run one cycle over the todo list. Only todo-list retrieval failure is
	/// fatal; nothing is retried within a run.
	#[instrument(skip(self))]
	pub async fn run_cycle(&self) -> Result<CycleSummary> {
		let todo = self.client.todo_list().await?;
		if todo.is_empty() {
			info!("nothing to do");
			return Ok(CycleSummary::default());
		}

		info!(count = todo.len(), "received todo list");

		let mut summary = CycleSummary::default();
		for id in todo {
			match self.process_crash(id).await {
				ItemOutcome::Symbolicated => {
					info!(crash_id = %id, "symbolicated");
					summary.symbolicated += 1;
				}
				ItemOutcome::Skipped(reason) => {
					info!(crash_id = %id, reason, "skipped");
					summary.skipped += 1;
				}
				ItemOutcome::Failed(reason) => {
					warn!(crash_id = %id, reason, "failed");
					summary.failed += 1;
				}
			}
		}

		info!(
			symbolicated = summary.symbolicated,
			skipped = summary.skipped,
			failed = summary.failed,
			"cycle finished"
		);

		Ok(summary)
	}

	async fn process_crash(&self, id: CrashReportId) -> ItemOutcome {
		let log = match self.client.crash_data(id).await {
			Ok(log) => log,
			Err(err) => return ItemOutcome::Skipped(format!("download failed: {err}")),
		};
		if log.is_empty() {
			return ItemOutcome::Skipped("empty crash data".to_string());
		}

		match self.symbolicate_and_submit(id, &log).await {
			Ok(()) => ItemOutcome::Symbolicated,
			Err(err) => ItemOutcome::Failed(err.to_string()),
		}
	}

	async fn symbolicate_and_submit(&self, id: CrashReportId, log: &str) -> Result<()> {
		// Scoped workdir: removed on every exit path, including panics and
		// tool failures.
		let workdir = tempfile::tempdir()?;
		let input = workdir.path().join(format!("{id}.crash"));
		let output = workdir.path().join(format!("result_{id}.crash"));

		tokio::fs::write(&input, log).await?;

		let symbolicated = run_tool(&self.tool, &input, &output, self.tool_timeout).await?;

		if !self.client.submit(id, &symbolicated).await? {
			return Err(WorkerError::Rejected);
		}

		Ok(())
	}
}

/// Invoke the external tool through an explicit argument list, never a
/// shell, and read back its output file. A stuck tool is killed after the
/// timeout.
async fn run_tool(
	tool: &Path,
	input: &Path,
	output: &Path,
	timeout: Duration,
) -> Result<String> {
	let mut child = Command::new(tool)
		.arg("-o")
		.arg(output)
		.arg(input)
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.kill_on_drop(true)
		.spawn()?;

	let status = match tokio::time::timeout(timeout, child.wait()).await {
		Ok(status) => status?,
		Err(_) => {
			let _ = child.start_kill();
			return Err(WorkerError::ToolTimeout);
		}
	};

	if !status.success() {
		return Err(WorkerError::ToolFailed {
			code: status.code(),
		});
	}

	let symbolicated = tokio::fs::read_to_string(output)
		.await
		.unwrap_or_default();
	if symbolicated.is_empty() {
		return Err(WorkerError::EmptyOutput);
	}

	Ok(symbolicated)
}
