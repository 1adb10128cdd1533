//! The record, inspect, playback scenario.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::artifact::{ArtifactProber, ArtifactValidator};
use crate::browser::{BrowserBackend, BrowserSessionClient};
use crate::config::ScenarioConfig;
use crate::content::{ContentService, SessionTicket};
use crate::error::{Error, Result};
use crate::report::{Check, Mismatch, PhaseRecord, ScenarioReport};
use crate::types::Role;
use crate::{EVENT_ENDED, EVENT_PLAYING};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseKind {
	Record,
	Inspect,
	Playback,
}

impl fmt::Display for PhaseKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			PhaseKind::Record => "record",
			PhaseKind::Inspect => "inspect",
			PhaseKind::Playback => "playback",
		})
	}
}

/// One step of a [`Scenario`].
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseSpec {
	/// Stream from a recorder client for the configured record time.
	Record { path: String, events: Vec<String> },
	/// Check the recording's codecs.
	Inspect { artifact: PathBuf },
	/// Play the recording back and check duration and color.
	Playback { path: String, events: Vec<String> },
}

impl PhaseSpec {
	pub fn kind(&self) -> PhaseKind {
		match self {
			PhaseSpec::Record { .. } => PhaseKind::Record,
			PhaseSpec::Inspect { .. } => PhaseKind::Inspect,
			PhaseSpec::Playback { .. } => PhaseKind::Playback,
		}
	}

	/// Browser role driving this phase, if it uses a browser.
	pub fn role(&self) -> Option<Role> {
		match self {
			PhaseSpec::Record { .. } => Some(Role::Recorder),
			PhaseSpec::Inspect { .. } => None,
			PhaseSpec::Playback { .. } => Some(Role::Player),
		}
	}
}

/// Ordered phases of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
	pub phases: Vec<PhaseSpec>,
}

impl Scenario {
	/// Record from the recorder path, inspect the artifact, play it back from
	/// the player path.
	pub fn record_and_playback(config: &ScenarioConfig) -> Self {
		Self {
			phases: vec![
				PhaseSpec::Record {
					path: config.recorder_path.clone(),
					events: vec![EVENT_PLAYING.to_string()],
				},
				PhaseSpec::Inspect {
					artifact: config.recording_path.clone(),
				},
				PhaseSpec::Playback {
					path: config.player_path.clone(),
					events: vec![EVENT_PLAYING.to_string(), EVENT_ENDED.to_string()],
				},
			],
		}
	}
}

/// Runs a [`Scenario`] phase by phase.
///
/// A phase starts only after the previous one finished, including the
/// termination of its server session, so the recording is closed before it is
/// inspected or played.
pub struct ScenarioRunner {
	config: ScenarioConfig,
	browser: Arc<dyn BrowserBackend>,
	service: Arc<ContentService>,
	validator: ArtifactValidator,
}

impl ScenarioRunner {
	pub fn new(config: ScenarioConfig, browser: Arc<dyn BrowserBackend>, service: Arc<ContentService>, prober: Arc<dyn ArtifactProber>) -> Self {
		Self {
			config,
			browser,
			service,
			validator: ArtifactValidator::new(prober),
		}
	}

	pub fn config(&self) -> &ScenarioConfig {
		&self.config
	}

	/// Runs [`Scenario::record_and_playback`] for this runner's config.
	pub async fn run(&self) -> Result<ScenarioReport> {
		self.run_scenario(&Scenario::record_and_playback(&self.config)).await
	}

	/// Runs `scenario`.
	///
	/// # Errors
	///
	/// [`Error::SetupFailure`] and [`Error::TerminationTimeout`] abort the run;
	/// later phases do not execute. Content mismatches never abort and are
	/// returned in the report.
	pub async fn run_scenario(&self, scenario: &Scenario) -> Result<ScenarioReport> {
		let mut report = ScenarioReport::default();

		for phase in &scenario.phases {
			let kind = phase.kind();
			let started = Instant::now();
			info!(phase = %kind, "phase starting");

			match phase {
				PhaseSpec::Record { path, events } => self.record(path, events).await?,
				PhaseSpec::Inspect { artifact } => {
					for mismatch in self.validator.check_codecs(artifact, &self.config.expect).await {
						report.record(mismatch);
					}
				}
				PhaseSpec::Playback { path, events } => self.playback(path, events, &mut report).await?,
			}

			let elapsed_ms = started.elapsed().as_millis() as u64;
			info!(phase = %kind, elapsed_ms, "phase finished");
			report.phases.push(PhaseRecord { kind, elapsed_ms });
		}

		Ok(report)
	}

	async fn record(&self, path: &str, events: &[String]) -> Result<()> {
		let mut client = self.client(Role::Recorder, path, events);
		let ticket = self.start_session(&mut client, PhaseKind::Record, path).await?;

		info!(session = %ticket.id, record_ms = self.config.record_ms, "recording");
		tokio::time::sleep(self.config.record_duration()).await;

		self.finish(client, &ticket).await
	}

	async fn playback(&self, path: &str, events: &[String], report: &mut ScenarioReport) -> Result<()> {
		let mut client = self.client(Role::Player, path, events);
		let ticket = self.start_session(&mut client, PhaseKind::Playback, path).await?;
		let expect = &self.config.expect;

		if !client.wait_for_event(EVENT_ENDED).await {
			report.record(Mismatch::new(Check::PlaybackEnded, "ended event", "Timeout waiting ended event"));
		}

		match client.current_playback_position().await {
			Ok(position) => {
				if let Some(mismatch) = ArtifactValidator::check_duration(position, self.config.expected_duration(), expect.duration_tolerance) {
					report.record(mismatch);
				}
			}
			Err(err) => report.record(Mismatch::new(
				Check::PlaybackDuration,
				format!("{}ms", self.config.expected_duration().as_millis()),
				format!("unavailable: {err}"),
			)),
		}

		match client.sample_color().await {
			Ok(color) => {
				if let Some(mismatch) = ArtifactValidator::check_color(color, expect.color, expect.color_threshold) {
					report.record(mismatch);
				}
			}
			Err(err) => report.record(Mismatch::new(Check::Color, expect.color.to_string(), format!("unavailable: {err}"))),
		}

		self.finish(client, &ticket).await
	}

	fn client(&self, role: Role, path: &str, events: &[String]) -> BrowserSessionClient {
		let mut client = BrowserSessionClient::builder(Arc::clone(&self.browser)).role(role).config(&self.config).build();
		client.set_target(path);
		client.subscribe(events.iter().cloned());
		client
	}

	/// Starts `client` and waits until it plays, returning the server session
	/// it opened on `path`.
	async fn start_session(&self, client: &mut BrowserSessionClient, phase: PhaseKind, path: &str) -> Result<SessionTicket> {
		let mut sessions = self.service.subscribe_sessions();

		client.start().await.map_err(|e| Error::SetupFailure {
			phase,
			reason: e.to_string(),
			timed_out: false,
		})?;

		if !client.wait_for_event(EVENT_PLAYING).await {
			return Err(Error::SetupFailure {
				phase,
				reason: "Timeout waiting playing event".to_string(),
				timed_out: true,
			});
		}

		next_session_on(&mut sessions, path, client.timeout()).await.ok_or_else(|| Error::SetupFailure {
			phase,
			reason: format!("no content session was opened on {path}"),
			timed_out: true,
		})
	}

	/// Stops the client and waits for its server session to terminate,
	/// forcing the termination when the server never reports it.
	async fn finish(&self, mut client: BrowserSessionClient, ticket: &SessionTicket) -> Result<()> {
		let waited = client.timeout();
		if let Err(err) = client.stop().await {
			warn!(session = %ticket.id, error = %err, "browser stop failed");
		}

		if ticket.latch.wait(waited).await {
			return Ok(());
		}

		warn!(session = %ticket.id, waited_ms = waited.as_millis() as u64, "Timeout waiting onSessionTerminated");
		if let Err(err) = self.service.force_terminate(ticket.id, "termination timeout").await {
			warn!(session = %ticket.id, error = %err, "forced termination failed");
		}
		Err(Error::TerminationTimeout {
			session: ticket.id,
			waited,
		})
	}
}

async fn next_session_on(sessions: &mut broadcast::Receiver<SessionTicket>, path: &str, timeout: Duration) -> Option<SessionTicket> {
	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		match tokio::time::timeout_at(deadline, sessions.recv()).await {
			Ok(Ok(ticket)) if ticket.path == path => return Some(ticket),
			Ok(Ok(_)) => continue,
			Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
				warn!(dropped = n, "session announcements lagged");
			}
			Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return None,
		}
	}
}
