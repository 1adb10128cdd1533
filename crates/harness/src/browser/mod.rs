//! Browser automation collaborator interface and the session client built on it.

mod client;

use std::time::Duration;

use url::Url;

pub use client::{BrowserSessionClient, ClientBuilder};

use crate::BoxFut;
use crate::color::Rgb;
use crate::error::Result;
use crate::events::EventSink;
use crate::types::Role;

/// What to launch: which client page, pointed at which content URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
	/// Selects the client page: WebRTC loopback sender or HTTP video player.
	pub role: Role,
	pub url: Url,
	pub headless: bool,
}

/// Launches browser instances.
pub trait BrowserBackend: Send + Sync {
	/// Launches a browser, loads the client page for `spec` and starts it.
	///
	/// Media events observed by the page (`playing`, `ended`, ...) are
	/// delivered through `events` from the backend's own task.
	fn launch<'a>(&'a self, spec: &'a LaunchSpec, events: EventSink) -> BoxFut<'a, Result<Box<dyn BrowserPage>>>;
}

/// A running client page.
pub trait BrowserPage: Send + Sync {
	/// `currentTime` of the page's video element.
	fn current_time(&self) -> BoxFut<'_, Result<Duration>>;

	/// Color sampled from the center of the rendered video.
	fn sample_color(&self) -> BoxFut<'_, Result<Rgb>>;

	/// Stops the client and closes the browser, which ends the remote session.
	fn close(&mut self) -> BoxFut<'_, Result<()>>;

	/// Best-effort synchronous release, used when a client is dropped
	/// without [`close`](Self::close).
	fn force_close(&mut self);
}
