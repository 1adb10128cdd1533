use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of the recording round trip a browser or handler plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	/// Sends camera/microphone media over WebRTC; the server records it.
	Recorder,
	/// Fetches the recording over HTTP and renders it.
	Player,
}

impl Role {
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Recorder => "recorder",
			Role::Player => "player",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Identifier assigned by [`ContentService`](crate::ContentService) to each content request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "session-{}", self.0)
	}
}
