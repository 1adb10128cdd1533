use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use super::{BrowserBackend, BrowserPage, LaunchSpec};
use crate::color::Rgb;
use crate::config::{DEFAULT_TIMEOUT_MS, ScenarioConfig};
use crate::error::{Error, Result};
use crate::events::{EventSink, EventWaiter};
use crate::types::Role;

/// Builder for [`BrowserSessionClient`].
pub struct ClientBuilder {
	backend: Arc<dyn BrowserBackend>,
	role: Role,
	base_url: String,
	timeout: Duration,
	headless: bool,
}

impl ClientBuilder {
	pub fn role(mut self, role: Role) -> Self {
		self.role = role;
		self
	}

	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	/// Default bound for [`BrowserSessionClient::wait_for_event`].
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn headless(mut self, headless: bool) -> Self {
		self.headless = headless;
		self
	}

	/// Takes base URL, timeout and headless mode from `config`.
	pub fn config(self, config: &ScenarioConfig) -> Self {
		self.base_url(config.base_url.clone()).timeout(config.timeout()).headless(config.headless)
	}

	pub fn build(self) -> BrowserSessionClient {
		BrowserSessionClient {
			backend: self.backend,
			role: self.role,
			base_url: self.base_url,
			timeout: self.timeout,
			headless: self.headless,
			target: None,
			events: Arc::new(EventWaiter::new()),
			page: None,
		}
	}
}

/// One browser-driven interaction with a content path.
///
/// The browser is released on every exit path: [`stop`](Self::stop) closes it
/// gracefully, and dropping a still-running client force-closes it.
///
/// # Example
///
/// ```ignore
/// let mut client = BrowserSessionClient::builder(backend).role(Role::Recorder).build();
/// client.set_target("/webrtcRecorder");
/// client.subscribe(["playing"]);
/// client.start().await?;
/// assert!(client.wait_for_event("playing").await, "Timeout waiting playing event");
/// client.stop().await?;
/// ```
pub struct BrowserSessionClient {
	backend: Arc<dyn BrowserBackend>,
	role: Role,
	base_url: String,
	timeout: Duration,
	headless: bool,
	target: Option<String>,
	events: Arc<EventWaiter>,
	page: Option<Box<dyn BrowserPage>>,
}

impl BrowserSessionClient {
	pub fn builder(backend: Arc<dyn BrowserBackend>) -> ClientBuilder {
		ClientBuilder {
			backend,
			role: Role::Recorder,
			base_url: "http://localhost:8080".to_string(),
			timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
			headless: true,
		}
	}

	pub fn role(&self) -> Role {
		self.role
	}

	/// Default bound applied to event waits; callers reuse it for the
	/// termination wait after [`stop`](Self::stop).
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	pub fn is_running(&self) -> bool {
		self.page.is_some()
	}

	/// Sets the content path the client page connects to.
	pub fn set_target(&mut self, path: impl Into<String>) {
		self.target = Some(path.into());
	}

	/// Adds event names the client reports. Must precede [`start`](Self::start)
	/// for events fired early in the page's life.
	pub fn subscribe<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.events.subscribe(names);
	}

	/// Resolved content URL, once a target is set.
	pub fn url(&self) -> Result<Url> {
		let target = self.target.as_deref().ok_or_else(|| Error::Browser("no target path set".into()))?;
		let base = Url::parse(&self.base_url).map_err(|e| Error::Config(format!("baseUrl '{}': {e}", self.base_url)))?;
		base.join(target).map_err(|e| Error::Config(format!("target '{target}': {e}")))
	}

	/// Launches the browser and loads the client page.
	pub async fn start(&mut self) -> Result<()> {
		if self.page.is_some() {
			return Err(Error::Browser("client already started".into()));
		}
		let spec = LaunchSpec {
			role: self.role,
			url: self.url()?,
			headless: self.headless,
		};
		info!(role = %self.role, url = %spec.url, "starting browser client");
		let page = self.backend.launch(&spec, EventSink::new(Arc::clone(&self.events))).await?;
		self.page = Some(page);
		Ok(())
	}

	/// Waits for `name` with the client's default timeout.
	pub async fn wait_for_event(&self, name: &str) -> bool {
		self.wait_for_event_within(name, self.timeout).await
	}

	/// Waits up to `timeout` for `name`. Returns `false` on timeout.
	pub async fn wait_for_event_within(&self, name: &str, timeout: Duration) -> bool {
		let observed = self.events.wait(name, timeout).await;
		debug!(role = %self.role, event = name, observed, "browser event wait finished");
		observed
	}

	/// Current playback position reported by the page.
	pub async fn current_playback_position(&self) -> Result<Duration> {
		self.page()?.current_time().await
	}

	/// Color currently rendered by the page's video.
	pub async fn sample_color(&self) -> Result<Rgb> {
		self.page()?.sample_color().await
	}

	/// Closes the browser. A no-op when not running.
	///
	/// Closing ends the remote content session asynchronously; wait on the
	/// session's [`TerminationLatch`](crate::TerminationLatch) to observe it.
	pub async fn stop(&mut self) -> Result<()> {
		let Some(mut page) = self.page.take() else {
			return Ok(());
		};
		info!(role = %self.role, "stopping browser client");
		page.close().await
	}

	fn page(&self) -> Result<&dyn BrowserPage> {
		self.page.as_deref().ok_or_else(|| Error::Browser("client not started".into()))
	}
}

impl Drop for BrowserSessionClient {
	fn drop(&mut self) {
		if let Some(mut page) = self.page.take() {
			warn!(role = %self.role, "browser client dropped while running; forcing close");
			page.force_close();
		}
	}
}

impl std::fmt::Debug for BrowserSessionClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BrowserSessionClient")
			.field("role", &self.role)
			.field("target", &self.target)
			.field("running", &self.page.is_some())
			.finish()
	}
}
