use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info};
use url::Url;

use super::manifest::Manifest;
use crate::BoxFut;
use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::pipeline::{EndpointId, EndpointKind, MediaPipeline, PipelineFactory};

/// What the loopback server "receives" from browsers and how it misbehaves.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerOptions {
	/// Format names written into recordings.
	pub video_codec: String,
	pub audio_codec: String,
	/// Color of the browser's outgoing video.
	pub source_color: Rgb,
	/// Creating a recorder endpoint fails.
	pub fail_recorder_endpoint: bool,
}

impl Default for ServerOptions {
	fn default() -> Self {
		Self {
			video_codec: "VP8".to_string(),
			audio_codec: "Vorbis".to_string(),
			source_color: Rgb::new(0, 135, 0),
			fail_recorder_endpoint: false,
		}
	}
}

struct Shared {
	options: ServerOptions,
	next_pipeline: AtomicU64,
	created: AtomicUsize,
	released: AtomicUsize,
	now_playing: Mutex<Option<Manifest>>,
}

/// In-process [`PipelineFactory`]. Clones share state.
#[derive(Clone)]
pub struct LoopbackServer {
	shared: Arc<Shared>,
}

impl LoopbackServer {
	pub fn new(options: ServerOptions) -> Self {
		Self {
			shared: Arc::new(Shared {
				options,
				next_pipeline: AtomicU64::new(1),
				created: AtomicUsize::new(0),
				released: AtomicUsize::new(0),
				now_playing: Mutex::new(None),
			}),
		}
	}

	pub fn options(&self) -> &ServerOptions {
		&self.shared.options
	}

	pub fn pipelines_created(&self) -> usize {
		self.shared.created.load(Ordering::SeqCst)
	}

	pub fn pipelines_released(&self) -> usize {
		self.shared.released.load(Ordering::SeqCst)
	}

	/// Media loaded by the most recently started player endpoint.
	pub fn now_playing(&self) -> Option<Manifest> {
		self.shared.now_playing.lock().clone()
	}
}

impl Default for LoopbackServer {
	fn default() -> Self {
		Self::new(ServerOptions::default())
	}
}

impl std::fmt::Debug for LoopbackServer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LoopbackServer")
			.field("options", &self.shared.options)
			.field("created", &self.pipelines_created())
			.field("released", &self.pipelines_released())
			.finish()
	}
}

impl PipelineFactory for LoopbackServer {
	fn create(&self) -> BoxFut<'_, Result<Arc<dyn MediaPipeline>>> {
		Box::pin(async move {
			let n = self.shared.next_pipeline.fetch_add(1, Ordering::SeqCst);
			self.shared.created.fetch_add(1, Ordering::SeqCst);
			let pipeline = LoopbackPipeline {
				id: format!("loopback-pipeline-{n}"),
				shared: Arc::clone(&self.shared),
				endpoints: Mutex::new(HashMap::new()),
				next_endpoint: AtomicU64::new(1),
				released: AtomicBool::new(false),
			};
			debug!(pipeline = %pipeline.id, "pipeline created");
			Ok(Arc::new(pipeline) as Arc<dyn MediaPipeline>)
		})
	}
}

struct Endpoint {
	kind: EndpointKind,
	sinks: Vec<EndpointId>,
	started_at: Option<Instant>,
}

struct LoopbackPipeline {
	id: String,
	shared: Arc<Shared>,
	endpoints: Mutex<HashMap<EndpointId, Endpoint>>,
	next_endpoint: AtomicU64,
	released: AtomicBool,
}

impl LoopbackPipeline {
	fn ensure_live(&self) -> Result<()> {
		if self.released.load(Ordering::SeqCst) {
			return Err(Error::Pipeline(format!("{} already released", self.id)));
		}
		Ok(())
	}

	fn unknown(&self, endpoint: EndpointId) -> Error {
		Error::Pipeline(format!("{endpoint} not found in {}", self.id))
	}

	fn recording(&self) -> Manifest {
		let options = &self.shared.options;
		Manifest {
			video_codec: options.video_codec.clone(),
			audio_codec: options.audio_codec.clone(),
			duration_ms: 0,
			color: options.source_color,
		}
	}
}

/// Filesystem path behind a `file://` media URI; other strings are taken as
/// paths verbatim.
fn media_path(uri: &str) -> PathBuf {
	Url::parse(uri)
		.ok()
		.filter(|url| url.scheme() == "file")
		.and_then(|url| url.to_file_path().ok())
		.unwrap_or_else(|| PathBuf::from(uri))
}

impl MediaPipeline for LoopbackPipeline {
	fn id(&self) -> &str {
		&self.id
	}

	fn create_endpoint(&self, kind: EndpointKind) -> BoxFut<'_, Result<EndpointId>> {
		Box::pin(async move {
			self.ensure_live()?;
			if matches!(kind, EndpointKind::Recorder { .. }) && self.shared.options.fail_recorder_endpoint {
				return Err(Error::Pipeline(format!("{} construction failed in {}", kind.name(), self.id)));
			}
			let id = EndpointId(self.next_endpoint.fetch_add(1, Ordering::SeqCst));
			debug!(pipeline = %self.id, endpoint = %id, kind = kind.name(), "endpoint created");
			self.endpoints.lock().insert(
				id,
				Endpoint {
					kind,
					sinks: Vec::new(),
					started_at: None,
				},
			);
			Ok(id)
		})
	}

	fn connect(&self, source: EndpointId, sink: EndpointId) -> BoxFut<'_, Result<()>> {
		Box::pin(async move {
			self.ensure_live()?;
			let mut endpoints = self.endpoints.lock();
			if !endpoints.contains_key(&sink) {
				return Err(self.unknown(sink));
			}
			let endpoint = endpoints.get_mut(&source).ok_or_else(|| self.unknown(source))?;
			endpoint.sinks.push(sink);
			debug!(pipeline = %self.id, %source, %sink, fan_out = endpoint.sinks.len(), "endpoints connected");
			Ok(())
		})
	}

	fn start(&self, endpoint: EndpointId) -> BoxFut<'_, Result<()>> {
		Box::pin(async move {
			self.ensure_live()?;
			let kind = {
				let mut endpoints = self.endpoints.lock();
				let entry = endpoints.get_mut(&endpoint).ok_or_else(|| self.unknown(endpoint))?;
				entry.started_at = Some(Instant::now());
				entry.kind.clone()
			};

			if let EndpointKind::Player { uri } = kind {
				let path = media_path(&uri);
				let media = Manifest::read(&path)
					.await
					.map_err(|e| Error::Pipeline(format!("cannot play {uri}: {e}")))?;
				info!(pipeline = %self.id, uri, duration_ms = media.duration_ms, "player loaded media");
				*self.shared.now_playing.lock() = Some(media);
			}
			Ok(())
		})
	}

	fn stop(&self, endpoint: EndpointId) -> BoxFut<'_, Result<()>> {
		Box::pin(async move {
			self.ensure_live()?;
			let (kind, started_at) = {
				let mut endpoints = self.endpoints.lock();
				let entry = endpoints.get_mut(&endpoint).ok_or_else(|| self.unknown(endpoint))?;
				(entry.kind.clone(), entry.started_at.take())
			};

			let (EndpointKind::Recorder { uri }, Some(started_at)) = (kind, started_at) else {
				return Ok(());
			};
			let mut recording = self.recording();
			recording.duration_ms = started_at.elapsed().as_millis() as u64;
			recording.write(&media_path(&uri)).await?;
			info!(pipeline = %self.id, uri, duration_ms = recording.duration_ms, "recording finalized");
			Ok(())
		})
	}

	fn release(&self) -> BoxFut<'_, Result<()>> {
		Box::pin(async move {
			if self.released.swap(true, Ordering::SeqCst) {
				return Ok(());
			}
			self.endpoints.lock().clear();
			self.shared.released.fetch_add(1, Ordering::SeqCst);
			debug!(pipeline = %self.id, "pipeline released");
			Ok(())
		})
	}
}
