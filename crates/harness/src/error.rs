//! Error types for the harness.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::content::Phase;
use crate::scenario::PhaseKind;
use crate::types::SessionId;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the harness and its collaborators.
///
/// Content mismatches (wrong codec, short recording, wrong color) are not
/// errors; they are accumulated in a [`ScenarioReport`](crate::ScenarioReport).
#[derive(Debug, Error)]
pub enum Error {
	/// Browser or pipeline never reached the started state. Aborts the scenario.
	#[error("setup failure in {phase} phase: {reason}")]
	SetupFailure {
		phase: PhaseKind,
		reason: String,
		/// The started state was not reached within the wait bound.
		timed_out: bool,
	},

	/// Stop was requested but the server never reported the session terminated.
	#[error("Timeout waiting onSessionTerminated for {session} after {}ms", waited.as_millis())]
	TerminationTimeout { session: SessionId, waited: Duration },

	/// Releasing pipeline resources failed.
	#[error("resource teardown failed for {session}: {reason}")]
	ResourceTeardown { session: SessionId, reason: String },

	/// Lifecycle callback arrived in a state that does not accept it.
	#[error("{session} cannot handle {event} while {phase}")]
	InvalidTransition {
		session: SessionId,
		phase: Phase,
		event: &'static str,
	},

	/// No content handler is registered for the requested path.
	#[error("no content handler registered for path '{0}'")]
	UnknownPath(String),

	/// Session is not (or no longer) tracked by the content service.
	#[error("unknown session: {0}")]
	UnknownSession(SessionId),

	/// Browser automation backend failure.
	#[error("browser error: {0}")]
	Browser(String),

	/// Media pipeline failure.
	#[error("pipeline error: {0}")]
	Pipeline(String),

	/// Artifact could not be probed.
	#[error("probe failed for {}: {reason}", path.display())]
	Probe { path: PathBuf, reason: String },

	/// Invalid scenario configuration.
	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true for errors that abort a scenario run.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Error::SetupFailure { .. } | Error::TerminationTimeout { .. })
	}

	/// Returns true if this error came from an expired wait.
	pub fn is_timeout(&self) -> bool {
		match self {
			Error::TerminationTimeout { .. } => true,
			Error::SetupFailure { timed_out, .. } => *timed_out,
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn setup_and_termination_failures_are_fatal() {
		let setup = Error::SetupFailure {
			phase: PhaseKind::Record,
			reason: "Timeout waiting playing event".into(),
			timed_out: true,
		};
		let term = Error::TerminationTimeout {
			session: SessionId(3),
			waited: Duration::from_millis(250),
		};
		assert!(setup.is_fatal());
		assert!(setup.is_timeout());
		assert!(term.is_fatal());
		assert_eq!(term.to_string(), "Timeout waiting onSessionTerminated for session-3 after 250ms");
	}

	#[test]
	fn setup_timeout_is_flagged_not_parsed() {
		let refused = Error::SetupFailure {
			phase: PhaseKind::Playback,
			reason: "Timeout-named path refused".into(),
			timed_out: false,
		};
		let silent = Error::SetupFailure {
			phase: PhaseKind::Playback,
			reason: "no playing event".into(),
			timed_out: true,
		};
		assert!(refused.is_fatal());
		assert!(!refused.is_timeout());
		assert!(silent.is_timeout());
	}

	#[test]
	fn teardown_errors_are_not_fatal() {
		let err = Error::ResourceTeardown {
			session: SessionId(1),
			reason: "release failed".into(),
		};
		assert!(!err.is_fatal());
		assert!(!err.is_timeout());
	}
}
