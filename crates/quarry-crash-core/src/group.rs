// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash groups and failure signatures.

use serde::{Deserialize, Serialize};

use crate::CrashGroupId;

/// The stable fields that identify a crash site.
///
/// Two reports with an equal signature inside the same (bundle, version)
/// scope land in the same group. Derivation from a log is delegated to a
/// [`crate::SignatureStrategy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrashSignature {
	/// Where the crash happened, e.g. the first frame of the crashed thread.
	pub location: String,
	/// Exception class, e.g. `EXC_BAD_ACCESS (SIGSEGV)`.
	pub exception: String,
	/// Free-text reason line, e.g. exception codes or the uncaught-exception
	/// reason reported by the runtime.
	pub reason: String,
}

impl CrashSignature {
	pub fn new(
		location: impl Into<String>,
		exception: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Self {
			location: location.into(),
			exception: exception.into(),
			reason: reason.into(),
		}
	}
}

/// A cluster of crash reports sharing a failure signature.
///
/// The signature fields are copied from the first member at creation time and
/// never rewritten by later insertions; `description` is the only
/// administrator-editable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashGroup {
	pub id: CrashGroupId,
	pub bundle_identifier: String,
	pub version: String,
	pub location: String,
	pub exception: String,
	pub reason: String,
	pub description: String,
}

impl CrashGroup {
	/// The signature this group was created with.
	pub fn signature(&self) -> CrashSignature {
		CrashSignature {
			location: self.location.clone(),
			exception: self.exception.clone(),
			reason: self.reason.clone(),
		}
	}
}
