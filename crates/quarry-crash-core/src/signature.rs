// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Failure signature derivation from raw crash logs.
//!
//! The only contract a strategy must uphold is determinism: the same log
//! text always yields the same signature. The default strategy reads the
//! stable header fields of an Apple-style crash log; deployments with other
//! log formats plug in their own implementation.

use crate::CrashSignature;

/// Derives a [`CrashSignature`] from raw crash log text.
pub trait SignatureStrategy: Send + Sync {
	/// Derive the signature. Must be a pure function of `log`.
	fn derive(&self, log: &str) -> CrashSignature;
}

/// Default strategy for Apple-style crash logs.
///
/// Reads three stable fields:
/// - `exception` from the `Exception Type:` header line
/// - `reason` from `Application Specific Information:` when present,
///   otherwise from the `Exception Codes:` header line
/// - `location` from the first frame below the `Thread N Crashed:` marker
///   (symbol text after the frame index, image name, and address columns)
///
/// Fields that cannot be found are left empty; an empty signature is still a
/// valid grouping key.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppleHeaderSignature;

impl SignatureStrategy for AppleHeaderSignature {
	fn derive(&self, log: &str) -> CrashSignature {
		let mut exception = String::new();
		let mut codes = String::new();
		let mut app_specific = String::new();
		let mut location = String::new();

		let mut lines = log.lines();
		while let Some(line) = lines.next() {
			if let Some(value) = header_value(line, "Exception Type:") {
				if exception.is_empty() {
					exception = value.to_string();
				}
			} else if let Some(value) = header_value(line, "Exception Codes:") {
				if codes.is_empty() {
					codes = value.to_string();
				}
			} else if line.starts_with("Application Specific Information:") {
				// The reason text follows on the next non-empty line.
				for follow in lines.by_ref() {
					let follow = follow.trim();
					if !follow.is_empty() {
						app_specific = follow.to_string();
						break;
					}
				}
			} else if is_crashed_thread_marker(line) && location.is_empty() {
				for frame in lines.by_ref() {
					if frame.trim().is_empty() {
						break;
					}
					if let Some(symbol) = frame_symbol(frame) {
						location = symbol;
						break;
					}
				}
			}
		}

		let reason = if app_specific.is_empty() {
			codes
		} else {
			app_specific
		};

		CrashSignature {
			location,
			exception,
			reason,
		}
	}
}

fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
	line.strip_prefix(key).map(str::trim)
}

/// Matches `Thread 0 Crashed:` and the variant with a thread name, e.g.
/// `Thread 0 Crashed:: Dispatch queue: com.apple.main-thread`.
fn is_crashed_thread_marker(line: &str) -> bool {
	let Some(rest) = line.strip_prefix("Thread ") else {
		return false;
	};
	let Some((digits, tail)) = rest.split_once(' ') else {
		return false;
	};
	!digits.is_empty()
		&& digits.chars().all(|c| c.is_ascii_digit())
		&& tail.starts_with("Crashed:")
}

/// Extracts the symbol text from a backtrace frame line.
///
/// Frame lines have the shape
/// `0   ImageName    0x00003a99 -[Crasher crash] + 23`; the symbol is
/// everything after the frame index, image name, and address columns.
fn frame_symbol(frame: &str) -> Option<String> {
	let mut parts = frame.split_whitespace();
	let index = parts.next()?;
	if index.chars().any(|c| !c.is_ascii_digit()) {
		return None;
	}
	let _image = parts.next()?;
	let address = parts.next()?;
	if !address.starts_with("0x") {
		return None;
	}
	let symbol = parts.collect::<Vec<_>>().join(" ");
	if symbol.is_empty() {
		None
	} else {
		Some(symbol)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// Golden fixture: abbreviated Apple crash log with a signal crash.
	const SIGSEGV_LOG: &str = "\
Incident Identifier: 12E5A3E4-B825-4C36-A2D1-66D84EFC0302
Hardware Model:      iPhone3,1
Process:         Quarry [1234]
Identifier:      net.hockeyapp.quarry
Version:         1.0
OS Version:      iPhone OS 7.0.4 (11B554a)

Exception Type:  EXC_BAD_ACCESS (SIGSEGV)
Exception Codes: KERN_INVALID_ADDRESS at 0x00000000
Crashed Thread:  0

Thread 0 Crashed:
0   Quarry                        \t0x00003a99 -[CrashViewController doCrash] + 41
1   UIKit                         \t0x32f42045 -[UIApplication sendAction:to:from:forEvent:] + 72

Thread 1:
0   libsystem_kernel.dylib        \t0x3a7dceb4 mach_msg_trap + 20
";

	// Golden fixture: uncaught exception with application specific info.
	const NSEXCEPTION_LOG: &str = "\
Process:         Quarry [4321]
Identifier:      net.hockeyapp.quarry
Version:         1.1

Exception Type:  EXC_CRASH (SIGABRT)
Exception Codes: 0x0000000000000000, 0x0000000000000000
Crashed Thread:  0

Application Specific Information:
*** Terminating app due to uncaught exception 'NSRangeException', reason: 'index 9 beyond bounds'

Thread 0 Crashed:: Dispatch queue: com.apple.main-thread
0   CoreFoundation                \t0x2e33ff4b __exceptionPreprocess + 130
1   libobjc.A.dylib               \t0x38ad86af objc_exception_throw + 38
";

	#[test]
	fn derives_signal_crash_signature() {
		let sig = AppleHeaderSignature.derive(SIGSEGV_LOG);
		assert_eq!(sig.exception, "EXC_BAD_ACCESS (SIGSEGV)");
		assert_eq!(sig.reason, "KERN_INVALID_ADDRESS at 0x00000000");
		assert_eq!(sig.location, "-[CrashViewController doCrash] + 41");
	}

	#[test]
	fn app_specific_information_wins_over_exception_codes() {
		let sig = AppleHeaderSignature.derive(NSEXCEPTION_LOG);
		assert_eq!(sig.exception, "EXC_CRASH (SIGABRT)");
		assert_eq!(
			sig.reason,
			"*** Terminating app due to uncaught exception 'NSRangeException', reason: 'index 9 beyond bounds'"
		);
		assert_eq!(sig.location, "__exceptionPreprocess + 130");
	}

	#[test]
	fn same_log_same_signature() {
		let first = AppleHeaderSignature.derive(SIGSEGV_LOG);
		let second = AppleHeaderSignature.derive(SIGSEGV_LOG);
		assert_eq!(first, second);
	}

	#[test]
	fn unparseable_log_yields_empty_signature() {
		let sig = AppleHeaderSignature.derive("not a crash log at all");
		assert_eq!(sig, CrashSignature::default());
	}

	#[test]
	fn crashed_thread_marker_variants() {
		assert!(is_crashed_thread_marker("Thread 0 Crashed:"));
		assert!(is_crashed_thread_marker(
			"Thread 3 Crashed:: Dispatch queue: com.apple.main-thread"
		));
		assert!(!is_crashed_thread_marker("Thread 1:"));
		assert!(!is_crashed_thread_marker("Thread Crashed:"));
	}
}
