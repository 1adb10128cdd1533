//! Server-side content sessions.
//!
//! [`ContentService`] plays the part of the media server's content runtime: it
//! maps registered paths to [`ContentHandler`]s, tracks one state record per
//! session and dispatches the request, started and terminated transitions.

mod handler;
mod service;

use std::fmt;

pub use handler::{ContentHandler, ContentSession, PlayerHandler, RecorderHandler, SessionResources};
pub use service::{ContentService, SessionTicket, Termination};

/// Lifecycle state of one content session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Content request received; resources are being (or have been) built.
	Requested,
	/// Transport is live and the media action is running.
	Started,
	/// Terminated callback ran and resources were released.
	Terminated,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Phase::Requested => "requested",
			Phase::Started => "started",
			Phase::Terminated => "terminated",
		})
	}
}

/// Codes passed to [`ContentHandler::on_session_terminated`].
pub mod termination {
	/// Client closed the session.
	pub const NORMAL: i32 = 0;
	/// Served media reached end of stream.
	pub const END_OF_STREAM: i32 = 1;
	/// The content request failed before the session started.
	pub const REQUEST_FAILED: i32 = 2;
	/// The harness gave up waiting and tore the session down itself.
	pub const FORCED: i32 = 3;
	/// The started callback failed; the media action never ran.
	pub const START_FAILED: i32 = 4;
}
