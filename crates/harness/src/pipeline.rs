//! Media pipeline collaborator interface.
//!
//! The media server is driven through these traits only. A pipeline owns a set
//! of endpoints; content handlers connect them into a per-session topology and
//! start/stop the one that carries the session's media action.

use std::fmt;
use std::sync::Arc;

use crate::BoxFut;
use crate::error::Result;

/// Handle to an endpoint inside one [`MediaPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId(pub u64);

impl fmt::Display for EndpointId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "endpoint-{}", self.0)
	}
}

/// Endpoint flavors the harness builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointKind {
	/// Bidirectional WebRTC endpoint facing the browser.
	WebRtc,
	/// Writes incoming media to `uri`.
	Recorder { uri: String },
	/// Reads media from `uri`.
	Player { uri: String },
	/// Serves incoming media over HTTP GET.
	HttpGet { terminate_on_eos: bool },
}

impl EndpointKind {
	pub fn name(&self) -> &'static str {
		match self {
			EndpointKind::WebRtc => "WebRtcEndpoint",
			EndpointKind::Recorder { .. } => "RecorderEndpoint",
			EndpointKind::Player { .. } => "PlayerEndpoint",
			EndpointKind::HttpGet { .. } => "HttpGetEndpoint",
		}
	}
}

/// A media pipeline on the server.
pub trait MediaPipeline: Send + Sync {
	/// Server-assigned pipeline identifier, used in logs.
	fn id(&self) -> &str;

	fn create_endpoint(&self, kind: EndpointKind) -> BoxFut<'_, Result<EndpointId>>;

	/// Routes media from `source` into `sink`. A WebRTC endpoint may be
	/// connected to itself for loopback.
	fn connect(&self, source: EndpointId, sink: EndpointId) -> BoxFut<'_, Result<()>>;

	/// Starts the endpoint's media action: record for recorders, play for players.
	fn start(&self, endpoint: EndpointId) -> BoxFut<'_, Result<()>>;

	/// Stops the endpoint's media action. Stopping a recorder finalizes its file.
	fn stop(&self, endpoint: EndpointId) -> BoxFut<'_, Result<()>>;

	/// Releases the pipeline and every endpoint in it.
	fn release(&self) -> BoxFut<'_, Result<()>>;
}

/// Creates pipelines on the media server.
pub trait PipelineFactory: Send + Sync {
	fn create(&self) -> BoxFut<'_, Result<Arc<dyn MediaPipeline>>>;
}
