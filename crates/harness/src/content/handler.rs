//! Per-role content handlers: the resource topology each role builds and the
//! media action it starts and stops.

use std::fmt;
use std::sync::Arc;

use crate::BoxFut;
use crate::error::Result;
use crate::pipeline::{EndpointId, EndpointKind, MediaPipeline, PipelineFactory};
use crate::types::{Role, SessionId};

/// Request-scoped context handed to [`ContentHandler::on_content_request`].
///
/// Pipelines registered with [`release_on_terminate`](Self::release_on_terminate)
/// are released by the service when the session terminates, including when the
/// request itself fails halfway through construction.
pub struct ContentSession {
	id: SessionId,
	path: String,
	factory: Arc<dyn PipelineFactory>,
	release_on_terminate: Vec<Arc<dyn MediaPipeline>>,
	served: Option<EndpointId>,
}

impl ContentSession {
	pub(crate) fn new(id: SessionId, path: &str, factory: Arc<dyn PipelineFactory>) -> Self {
		Self {
			id,
			path: path.to_string(),
			factory,
			release_on_terminate: Vec::new(),
			served: None,
		}
	}

	pub fn id(&self) -> SessionId {
		self.id
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn pipeline_factory(&self) -> &dyn PipelineFactory {
		self.factory.as_ref()
	}

	/// Schedules `pipeline` for release when this session terminates.
	pub fn release_on_terminate(&mut self, pipeline: Arc<dyn MediaPipeline>) {
		self.release_on_terminate.push(pipeline);
	}

	/// Starts content negotiation with the client on `endpoint`.
	pub fn start(&mut self, endpoint: EndpointId) {
		tracing::debug!(session = %self.id, %endpoint, "negotiating content on endpoint");
		self.served = Some(endpoint);
	}

	/// Endpoint negotiated with the client, once [`start`](Self::start) ran.
	pub fn served_endpoint(&self) -> Option<EndpointId> {
		self.served
	}

	pub(crate) fn into_release_list(self) -> Vec<Arc<dyn MediaPipeline>> {
		self.release_on_terminate
	}
}

/// Resources built for one session, owned by that session's state.
#[derive(Clone)]
pub struct SessionResources {
	pub pipeline: Arc<dyn MediaPipeline>,
	/// Endpoint whose start/stop is the role's media action.
	pub action: EndpointId,
}

impl fmt::Debug for SessionResources {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionResources")
			.field("pipeline", &self.pipeline.id())
			.field("action", &self.action)
			.finish()
	}
}

/// Lifecycle callbacks for one registered content path.
///
/// Handlers are stateless with respect to sessions: whatever
/// [`on_content_request`](Self::on_content_request) builds is returned as
/// [`SessionResources`] and handed back on the later transitions.
pub trait ContentHandler: Send + Sync {
	fn role(&self) -> Role;

	/// Builds the session's pipeline topology and starts negotiation.
	fn on_content_request<'a>(&'a self, session: &'a mut ContentSession) -> BoxFut<'a, Result<SessionResources>>;

	/// Transport is live: start the media action.
	fn on_content_started<'a>(&'a self, resources: &'a SessionResources) -> BoxFut<'a, Result<()>>;

	/// Session ended. `resources` is `None` when the request failed before
	/// building them.
	fn on_session_terminated<'a>(&'a self, resources: Option<&'a SessionResources>, code: i32, reason: &'a str) -> BoxFut<'a, Result<()>>;
}

/// Records the browser's WebRTC stream: `WebRtcEndpoint` looped back to the
/// browser and fanned out into a `RecorderEndpoint`.
#[derive(Debug, Clone)]
pub struct RecorderHandler {
	recording_uri: String,
}

impl RecorderHandler {
	pub fn new(recording_uri: impl Into<String>) -> Self {
		Self {
			recording_uri: recording_uri.into(),
		}
	}
}

impl ContentHandler for RecorderHandler {
	fn role(&self) -> Role {
		Role::Recorder
	}

	fn on_content_request<'a>(&'a self, session: &'a mut ContentSession) -> BoxFut<'a, Result<SessionResources>> {
		Box::pin(async move {
			let pipeline = session.pipeline_factory().create().await?;
			session.release_on_terminate(Arc::clone(&pipeline));

			let webrtc = pipeline.create_endpoint(EndpointKind::WebRtc).await?;
			let recorder = pipeline
				.create_endpoint(EndpointKind::Recorder {
					uri: self.recording_uri.clone(),
				})
				.await?;
			pipeline.connect(webrtc, webrtc).await?;
			pipeline.connect(webrtc, recorder).await?;
			session.start(webrtc);

			Ok(SessionResources { pipeline, action: recorder })
		})
	}

	fn on_content_started<'a>(&'a self, resources: &'a SessionResources) -> BoxFut<'a, Result<()>> {
		Box::pin(async move {
			tracing::info!(pipeline = resources.pipeline.id(), uri = %self.recording_uri, "recording started");
			resources.pipeline.start(resources.action).await
		})
	}

	fn on_session_terminated<'a>(&'a self, resources: Option<&'a SessionResources>, code: i32, reason: &'a str) -> BoxFut<'a, Result<()>> {
		Box::pin(async move {
			let Some(resources) = resources else {
				return Ok(());
			};
			tracing::info!(pipeline = resources.pipeline.id(), code, reason, "recording stopped");
			resources.pipeline.stop(resources.action).await
		})
	}
}

/// Plays a recording back over HTTP: `PlayerEndpoint` into an
/// `HttpGetEndpoint` that ends the session at end of stream.
#[derive(Debug, Clone)]
pub struct PlayerHandler {
	media_uri: String,
}

impl PlayerHandler {
	pub fn new(media_uri: impl Into<String>) -> Self {
		Self { media_uri: media_uri.into() }
	}
}

impl ContentHandler for PlayerHandler {
	fn role(&self) -> Role {
		Role::Player
	}

	fn on_content_request<'a>(&'a self, session: &'a mut ContentSession) -> BoxFut<'a, Result<SessionResources>> {
		Box::pin(async move {
			let pipeline = session.pipeline_factory().create().await?;
			session.release_on_terminate(Arc::clone(&pipeline));

			let player = pipeline
				.create_endpoint(EndpointKind::Player {
					uri: self.media_uri.clone(),
				})
				.await?;
			let http = pipeline.create_endpoint(EndpointKind::HttpGet { terminate_on_eos: true }).await?;
			pipeline.connect(player, http).await?;
			session.start(http);

			Ok(SessionResources { pipeline, action: player })
		})
	}

	fn on_content_started<'a>(&'a self, resources: &'a SessionResources) -> BoxFut<'a, Result<()>> {
		Box::pin(async move {
			tracing::info!(pipeline = resources.pipeline.id(), uri = %self.media_uri, "playback started");
			resources.pipeline.start(resources.action).await
		})
	}

	fn on_session_terminated<'a>(&'a self, resources: Option<&'a SessionResources>, code: i32, reason: &'a str) -> BoxFut<'a, Result<()>> {
		Box::pin(async move {
			let Some(resources) = resources else {
				return Ok(());
			};
			tracing::info!(pipeline = resources.pipeline.id(), code, reason, "playback stopped");
			resources.pipeline.stop(resources.action).await
		})
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;

	/// Pipeline that journals every call it receives.
	#[derive(Default)]
	struct JournalPipeline {
		journal: Mutex<Vec<String>>,
		kinds: Mutex<Vec<EndpointKind>>,
	}

	impl JournalPipeline {
		fn log(&self) -> Vec<String> {
			self.journal.lock().clone()
		}

		fn kind(&self, id: EndpointId) -> EndpointKind {
			self.kinds.lock()[id.0 as usize].clone()
		}
	}

	impl MediaPipeline for JournalPipeline {
		fn id(&self) -> &str {
			"journal"
		}

		fn create_endpoint(&self, kind: EndpointKind) -> BoxFut<'_, Result<EndpointId>> {
			let mut kinds = self.kinds.lock();
			let id = EndpointId(kinds.len() as u64);
			self.journal.lock().push(format!("create {}", kind.name()));
			kinds.push(kind);
			Box::pin(async move { Ok(id) })
		}

		fn connect(&self, source: EndpointId, sink: EndpointId) -> BoxFut<'_, Result<()>> {
			self.journal.lock().push(format!("connect {} -> {}", source.0, sink.0));
			Box::pin(async { Ok(()) })
		}

		fn start(&self, endpoint: EndpointId) -> BoxFut<'_, Result<()>> {
			self.journal.lock().push(format!("start {}", endpoint.0));
			Box::pin(async { Ok(()) })
		}

		fn stop(&self, endpoint: EndpointId) -> BoxFut<'_, Result<()>> {
			self.journal.lock().push(format!("stop {}", endpoint.0));
			Box::pin(async { Ok(()) })
		}

		fn release(&self) -> BoxFut<'_, Result<()>> {
			self.journal.lock().push("release".to_string());
			Box::pin(async { Ok(()) })
		}
	}

	struct JournalFactory(Arc<JournalPipeline>);

	impl PipelineFactory for JournalFactory {
		fn create(&self) -> BoxFut<'_, Result<Arc<dyn MediaPipeline>>> {
			let pipeline: Arc<dyn MediaPipeline> = self.0.clone();
			Box::pin(async move { Ok(pipeline) })
		}
	}

	fn session(path: &str) -> (ContentSession, Arc<JournalPipeline>) {
		let pipeline = Arc::new(JournalPipeline::default());
		let factory = Arc::new(JournalFactory(Arc::clone(&pipeline)));
		(ContentSession::new(SessionId(1), path, factory), pipeline)
	}

	#[tokio::test]
	async fn recorder_loops_webrtc_back_and_records_it() {
		let handler = RecorderHandler::new("file:///tmp/rec.webm");
		let (mut session, pipeline) = session("/rec");

		let resources = handler.on_content_request(&mut session).await.unwrap();

		assert_eq!(
			pipeline.log(),
			vec!["create WebRtcEndpoint", "create RecorderEndpoint", "connect 0 -> 0", "connect 0 -> 1"]
		);
		assert_eq!(session.served_endpoint(), Some(EndpointId(0)));
		assert_eq!(resources.action, EndpointId(1));
		assert_eq!(
			pipeline.kind(resources.action),
			EndpointKind::Recorder {
				uri: "file:///tmp/rec.webm".into()
			}
		);
		assert_eq!(session.into_release_list().len(), 1);

		handler.on_content_started(&resources).await.unwrap();
		handler.on_session_terminated(Some(&resources), 0, "browser closed").await.unwrap();
		assert_eq!(&pipeline.log()[4..], ["start 1", "stop 1"]);
	}

	#[tokio::test]
	async fn player_serves_the_recording_over_http_get() {
		let handler = PlayerHandler::new("file:///tmp/rec.webm");
		let (mut session, pipeline) = session("/play");

		let resources = handler.on_content_request(&mut session).await.unwrap();

		assert_eq!(pipeline.log(), vec!["create PlayerEndpoint", "create HttpGetEndpoint", "connect 0 -> 1"]);
		assert_eq!(session.served_endpoint(), Some(EndpointId(1)));
		assert_eq!(pipeline.kind(EndpointId(1)), EndpointKind::HttpGet { terminate_on_eos: true });
		assert_eq!(resources.action, EndpointId(0));
		assert_eq!(
			pipeline.kind(resources.action),
			EndpointKind::Player {
				uri: "file:///tmp/rec.webm".into()
			}
		);

		handler.on_content_started(&resources).await.unwrap();
		handler.on_session_terminated(Some(&resources), 1, "end of stream").await.unwrap();
		assert_eq!(&pipeline.log()[3..], ["start 0", "stop 0"]);
	}

	#[tokio::test]
	async fn termination_without_resources_touches_nothing() {
		let recorder = RecorderHandler::new("file:///tmp/rec.webm");
		let player = PlayerHandler::new("file:///tmp/rec.webm");
		let (mut session, pipeline) = session("/rec");
		recorder.on_content_request(&mut session).await.unwrap();
		let built = pipeline.log();

		recorder.on_session_terminated(None, 2, "request failed").await.unwrap();
		player.on_session_terminated(None, 2, "request failed").await.unwrap();

		assert_eq!(pipeline.log(), built);
		assert!(!pipeline.log().iter().any(|op| op.starts_with("stop") || op == "release"));
	}

	#[test]
	fn roles_follow_the_handler() {
		assert_eq!(RecorderHandler::new("x").role(), Role::Recorder);
		assert_eq!(PlayerHandler::new("x").role(), Role::Player);
	}
}
