//! rtc-harness: end-to-end record/playback validation for WebRTC media servers.
//!
//! The harness drives a browser through a recording session against a media
//! server, inspects the recording it produced, then plays the recording back in
//! a second browser session and validates duration and picture content.
//!
//! The media server, the browser and the media prober are collaborators behind
//! traits ([`PipelineFactory`], [`BrowserBackend`], [`ArtifactProber`]); the
//! crate owns the orchestration between them:
//!
//! - [`EventWaiter`] - timeout-bounded waits on named browser events
//! - [`TerminationLatch`] - one-shot signal raised when a server session ends
//! - [`BrowserSessionClient`] - scoped lifecycle around one browser interaction
//! - [`ContentService`] - per-session state machine dispatching to a [`ContentHandler`]
//! - [`ArtifactValidator`] - codec, duration and color checks
//! - [`ScenarioRunner`] - the record, inspect, playback sequence
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rtc_harness::loopback::{LoopbackBrowser, LoopbackServer, ManifestProber};
//! use rtc_harness::{ContentService, ScenarioConfig, ScenarioRunner};
//!
//! let config = ScenarioConfig::default();
//! let server = LoopbackServer::default();
//! let service = Arc::new(ContentService::for_config(&config, Arc::new(server.clone()))?);
//! let browser = Arc::new(LoopbackBrowser::new(Arc::clone(&service), server));
//!
//! let runner = ScenarioRunner::new(config, browser, service, Arc::new(ManifestProber));
//! let report = runner.run().await?;
//! assert!(report.passed(), "{report}");
//! ```

pub mod artifact;
pub mod browser;
pub mod color;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod latch;
pub mod loopback;
pub mod pipeline;
pub mod report;
pub mod scenario;
pub mod types;

use std::future::Future;
use std::pin::Pin;

pub use artifact::{ArtifactProber, ArtifactValidator, FfprobeProber, MediaInfo, StreamInfo, StreamKind};
pub use browser::{BrowserBackend, BrowserPage, BrowserSessionClient, ClientBuilder, LaunchSpec};
pub use color::Rgb;
pub use config::{Expectations, ScenarioConfig};
pub use content::{ContentHandler, ContentService, ContentSession, Phase, PlayerHandler, RecorderHandler, SessionResources, SessionTicket};
pub use error::{Error, Result};
pub use events::{EventSink, EventWaiter};
pub use latch::TerminationLatch;
pub use pipeline::{EndpointId, EndpointKind, MediaPipeline, PipelineFactory};
pub use report::{Check, Mismatch, PhaseRecord, ScenarioReport};
pub use scenario::{PhaseKind, PhaseSpec, Scenario, ScenarioRunner};
pub use types::{Role, SessionId};

/// Boxed `Send` future returned by collaborator traits so they stay object safe.
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Browser event fired when media starts rendering.
pub const EVENT_PLAYING: &str = "playing";

/// Browser event fired when playback reaches end of stream.
pub const EVENT_ENDED: &str = "ended";
