use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::manifest::Manifest;
use super::server::LoopbackServer;
use crate::browser::{BrowserBackend, BrowserPage, LaunchSpec};
use crate::color::Rgb;
use crate::content::{ContentService, termination};
use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::types::{Role, SessionId};
use crate::{BoxFut, EVENT_ENDED, EVENT_PLAYING};

/// Misbehavior injected into loopback browsers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
	/// The page never reports `playing`.
	pub suppress_playing: bool,
	/// The page never reports `ended`; the server still ends the session at
	/// end of stream.
	pub suppress_ended: bool,
	/// Closing the page never reaches the server, and end of stream does not
	/// end the session.
	pub suppress_termination: bool,
}

/// [`BrowserBackend`] talking to an in-process [`ContentService`].
pub struct LoopbackBrowser {
	service: Arc<ContentService>,
	server: LoopbackServer,
	faults: Faults,
}

impl LoopbackBrowser {
	pub fn new(service: Arc<ContentService>, server: LoopbackServer) -> Self {
		Self {
			service,
			server,
			faults: Faults::default(),
		}
	}

	pub fn with_faults(mut self, faults: Faults) -> Self {
		self.faults = faults;
		self
	}

	async fn open(&self, spec: &LaunchSpec, events: EventSink) -> Result<LoopbackPage> {
		let path = spec.url.path();
		let ticket = self
			.service
			.content_request(path)
			.await
			.map_err(|e| Error::Browser(format!("content request on {path} failed: {e}")))?;

		self.service
			.content_started(ticket.id)
			.await
			.map_err(|e| Error::Browser(format!("content on {path} did not start: {e}")))?;

		let media = match spec.role {
			Role::Player => self.server.now_playing(),
			Role::Recorder => None,
		};
		info!(session = %ticket.id, role = %spec.role, url = %spec.url, headless = spec.headless, "loopback page loaded");

		let (cancel_tx, cancel_rx) = oneshot::channel();
		tokio::spawn(drive_page(
			events,
			Arc::clone(&self.service),
			ticket.id,
			media.as_ref().map(Manifest::duration),
			self.faults,
			cancel_rx,
		));

		Ok(LoopbackPage {
			service: Arc::clone(&self.service),
			session: ticket.id,
			launched: Instant::now(),
			color: media.as_ref().map_or(self.server.options().source_color, |m| m.color),
			media,
			suppress_termination: self.faults.suppress_termination,
			cancel: Some(cancel_tx),
		})
	}
}

impl BrowserBackend for LoopbackBrowser {
	fn launch<'a>(&'a self, spec: &'a LaunchSpec, events: EventSink) -> BoxFut<'a, Result<Box<dyn BrowserPage>>> {
		Box::pin(async move {
			let page = self.open(spec, events).await?;
			Ok(Box::new(page) as Box<dyn BrowserPage>)
		})
	}
}

/// Media events of one page: `playing` right away, then for players `ended`
/// and an end-of-stream termination once the media has run out.
async fn drive_page(
	events: EventSink,
	service: Arc<ContentService>,
	session: SessionId,
	media_duration: Option<Duration>,
	faults: Faults,
	cancel: oneshot::Receiver<()>,
) {
	if !faults.suppress_playing {
		events.emit(EVENT_PLAYING);
	}
	let Some(duration) = media_duration else {
		return;
	};

	tokio::select! {
		_ = tokio::time::sleep(duration) => {}
		_ = cancel => {
			debug!(%session, "page closed before end of stream");
			return;
		}
	}

	if !faults.suppress_ended {
		events.emit(EVENT_ENDED);
	}
	if faults.suppress_termination {
		return;
	}
	if let Err(err) = service.session_terminated(session, termination::END_OF_STREAM, "end of stream").await {
		warn!(%session, error = %err, "end of stream termination failed");
	}
}

struct LoopbackPage {
	service: Arc<ContentService>,
	session: SessionId,
	launched: Instant,
	media: Option<Manifest>,
	color: Rgb,
	suppress_termination: bool,
	cancel: Option<oneshot::Sender<()>>,
}

impl BrowserPage for LoopbackPage {
	fn current_time(&self) -> BoxFut<'_, Result<Duration>> {
		let elapsed = self.launched.elapsed();
		let position = match &self.media {
			Some(media) => elapsed.min(media.duration()),
			None => elapsed,
		};
		Box::pin(async move { Ok(position) })
	}

	fn sample_color(&self) -> BoxFut<'_, Result<Rgb>> {
		let color = self.color;
		Box::pin(async move { Ok(color) })
	}

	fn close(&mut self) -> BoxFut<'_, Result<()>> {
		self.cancel.take();
		Box::pin(async move {
			if self.suppress_termination {
				debug!(session = %self.session, "termination suppressed");
				return Ok(());
			}
			self.service
				.session_terminated(self.session, termination::NORMAL, "browser closed")
				.await
				.map_err(|e| Error::Browser(e.to_string()))
		})
	}

	fn force_close(&mut self) {
		self.cancel.take();
		if self.suppress_termination {
			return;
		}
		let Ok(handle) = tokio::runtime::Handle::try_current() else {
			warn!(session = %self.session, "no runtime to deliver forced close");
			return;
		};
		let service = Arc::clone(&self.service);
		let session = self.session;
		handle.spawn(async move {
			if let Err(err) = service.session_terminated(session, termination::NORMAL, "browser force-closed").await {
				warn!(%session, error = %err, "forced close termination failed");
			}
		});
	}
}
