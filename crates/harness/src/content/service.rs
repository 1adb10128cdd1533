use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tracing::{debug, info, warn};

use super::handler::{ContentHandler, ContentSession, PlayerHandler, RecorderHandler, SessionResources};
use super::{Phase, termination};
use crate::config::ScenarioConfig;
use crate::error::{Error, Result};
use crate::latch::TerminationLatch;
use crate::pipeline::{MediaPipeline, PipelineFactory};
use crate::types::{Role, SessionId};

/// Handle on a session given to whoever drives the client side.
///
/// Carries the session's own [`TerminationLatch`], created fresh for the
/// request that produced this ticket.
#[derive(Debug, Clone)]
pub struct SessionTicket {
	pub id: SessionId,
	pub path: String,
	pub role: Role,
	pub latch: TerminationLatch,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
	pub session: SessionId,
	pub code: i32,
	pub reason: String,
}

struct SessionState {
	id: SessionId,
	path: String,
	handler: Arc<dyn ContentHandler>,
	phase: Phase,
	resources: Option<SessionResources>,
	release_on_terminate: Vec<Arc<dyn MediaPipeline>>,
	latch: TerminationLatch,
}

type SessionSlot = Arc<AsyncMutex<SessionState>>;

/// Content runtime: routes lifecycle callbacks to per-path handlers.
///
/// Transitions for one session are serialized on that session's lock, which
/// the request transition takes before the session becomes visible. A
/// started callback racing the request therefore waits for it to finish.
pub struct ContentService {
	factory: Arc<dyn PipelineFactory>,
	handlers: HashMap<String, Arc<dyn ContentHandler>>,
	sessions: Mutex<HashMap<SessionId, SessionSlot>>,
	terminations: Mutex<Vec<Termination>>,
	announce: broadcast::Sender<SessionTicket>,
	next_id: AtomicU64,
}

impl ContentService {
	pub fn new(factory: Arc<dyn PipelineFactory>) -> Self {
		let (announce, _) = broadcast::channel(32);
		Self {
			factory,
			handlers: HashMap::new(),
			sessions: Mutex::new(HashMap::new()),
			terminations: Mutex::new(Vec::new()),
			announce,
			next_id: AtomicU64::new(1),
		}
	}

	/// Service with the recorder and player handlers registered on the
	/// configured paths, both pointing at the configured recording.
	///
	/// # Errors
	///
	/// [`Error::Config`] when the recording path cannot be expressed as a
	/// `file://` URI.
	pub fn for_config(config: &ScenarioConfig, factory: Arc<dyn PipelineFactory>) -> Result<Self> {
		let uri = config.recording_uri()?;
		Ok(Self::new(factory)
			.register(config.recorder_path.clone(), Arc::new(RecorderHandler::new(uri.clone())))
			.register(config.player_path.clone(), Arc::new(PlayerHandler::new(uri))))
	}

	/// Binds `handler` to `path`, replacing any previous binding.
	pub fn register(mut self, path: impl Into<String>, handler: Arc<dyn ContentHandler>) -> Self {
		self.handlers.insert(path.into(), handler);
		self
	}

	pub fn is_registered(&self, path: &str) -> bool {
		self.handlers.contains_key(path)
	}

	/// Receives a ticket for every session created after this call.
	pub fn subscribe_sessions(&self) -> broadcast::Receiver<SessionTicket> {
		self.announce.subscribe()
	}

	/// Number of sessions not yet terminated.
	pub fn active_sessions(&self) -> usize {
		self.sessions.lock().len()
	}

	/// Terminations observed so far, oldest first.
	pub fn terminations(&self) -> Vec<Termination> {
		self.terminations.lock().clone()
	}

	/// Current phase of a live session; `None` once it has been terminated.
	pub async fn phase(&self, id: SessionId) -> Option<Phase> {
		let slot = self.slot(id)?;
		let state = slot.lock().await;
		Some(state.phase)
	}

	/// Request transition: creates the session and builds its resources.
	///
	/// On handler failure the session is terminated on the spot (releasing
	/// whatever was registered for release) and the error is returned; the
	/// session never starts.
	pub async fn content_request(&self, path: &str) -> Result<SessionTicket> {
		let handler = self.handlers.get(path).cloned().ok_or_else(|| Error::UnknownPath(path.to_string()))?;
		let id = SessionId(self.next_id.fetch_add(1, Ordering::SeqCst));
		let ticket = SessionTicket {
			id,
			path: path.to_string(),
			role: handler.role(),
			latch: TerminationLatch::new(),
		};

		let slot: SessionSlot = Arc::new(AsyncMutex::new(SessionState {
			id,
			path: path.to_string(),
			handler: Arc::clone(&handler),
			phase: Phase::Requested,
			resources: None,
			release_on_terminate: Vec::new(),
			latch: ticket.latch.clone(),
		}));
		let mut state = slot.lock().await;
		self.sessions.lock().insert(id, Arc::clone(&slot));
		let _ = self.announce.send(ticket.clone());
		info!(session = %id, path, role = %ticket.role, "content request");

		let mut session = ContentSession::new(id, path, Arc::clone(&self.factory));
		let outcome = handler.on_content_request(&mut session).await;
		state.release_on_terminate = session.into_release_list();

		match outcome {
			Ok(resources) => {
				debug!(session = %id, ?resources, "session resources built");
				state.resources = Some(resources);
				Ok(ticket)
			}
			Err(err) => {
				warn!(session = %id, path, error = %err, "content request failed");
				let reason = err.to_string();
				self.terminate_locked(&mut state, termination::REQUEST_FAILED, &reason).await;
				drop(state);
				self.sessions.lock().remove(&id);
				Err(err)
			}
		}
	}

	/// Started transition: transport is live, run the handler's media action.
	///
	/// The handler runs at most once per session. When it fails, the session is
	/// terminated on the spot with [`termination::START_FAILED`] and the error
	/// is returned.
	///
	/// # Errors
	///
	/// [`Error::InvalidTransition`] unless the session finished its request
	/// transition and has not started yet.
	pub async fn content_started(&self, id: SessionId) -> Result<()> {
		let slot = self.slot(id).ok_or(Error::UnknownSession(id))?;
		let mut state = slot.lock().await;

		let resources = match (&state.phase, &state.resources) {
			(Phase::Requested, Some(resources)) => resources.clone(),
			_ => {
				return Err(Error::InvalidTransition {
					session: id,
					phase: state.phase,
					event: "content started",
				});
			}
		};

		let handler = Arc::clone(&state.handler);
		if let Err(err) = handler.on_content_started(&resources).await {
			warn!(session = %id, path = %state.path, error = %err, "content start failed");
			let reason = err.to_string();
			self.terminate_locked(&mut state, termination::START_FAILED, &reason).await;
			drop(state);
			self.sessions.lock().remove(&id);
			return Err(err);
		}
		state.phase = Phase::Started;
		info!(session = %id, path = %state.path, "content started");
		Ok(())
	}

	/// Terminated transition. Idempotent: only the first call for a session
	/// runs the handler, releases resources and raises the latch.
	///
	/// Teardown problems are logged and never returned.
	pub async fn session_terminated(&self, id: SessionId, code: i32, reason: &str) -> Result<()> {
		let Some(slot) = self.slot(id) else {
			debug!(session = %id, code, "terminate for a session that is already gone");
			return Ok(());
		};

		let mut state = slot.lock().await;
		if state.phase == Phase::Terminated {
			debug!(session = %id, code, "session already terminated");
			return Ok(());
		}
		self.terminate_locked(&mut state, code, reason).await;
		drop(state);
		self.sessions.lock().remove(&id);
		Ok(())
	}

	/// Tears a session down from the harness side after the server failed to.
	pub async fn force_terminate(&self, id: SessionId, reason: &str) -> Result<()> {
		warn!(session = %id, reason, "forcing session termination");
		self.session_terminated(id, termination::FORCED, reason).await
	}

	fn slot(&self, id: SessionId) -> Option<SessionSlot> {
		self.sessions.lock().get(&id).cloned()
	}

	async fn terminate_locked(&self, state: &mut SessionState, code: i32, reason: &str) {
		let handler = Arc::clone(&state.handler);
		if let Err(err) = handler.on_session_terminated(state.resources.as_ref(), code, reason).await {
			warn!(session = %state.id, error = %err, "terminate handler failed");
		}

		for pipeline in state.release_on_terminate.drain(..) {
			if let Err(err) = pipeline.release().await {
				let err = Error::ResourceTeardown {
					session: state.id,
					reason: err.to_string(),
				};
				warn!(pipeline = pipeline.id(), error = %err, "pipeline release failed");
			}
		}

		state.resources = None;
		state.phase = Phase::Terminated;
		self.terminations.lock().push(Termination {
			session: state.id,
			code,
			reason: reason.to_string(),
		});
		state.latch.signal();
		info!(session = %state.id, path = %state.path, code, reason, "session terminated");
	}
}
