//! Scenario configuration and the expected-value table.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{Error, Result};

pub const DEFAULT_RECORDER_PATH: &str = "/webrtcRecorder";
pub const DEFAULT_PLAYER_PATH: &str = "/webrtcRecorderPlayer";
pub const DEFAULT_RECORDING_PATH: &str = "/tmp/webrtc";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_RECORD_MS: u64 = 5_000;
pub const DEFAULT_COLOR_THRESHOLD: f64 = 60.0;

/// Values the recording and its playback are checked against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Expectations {
	/// Format name of the first video stream, compared exactly.
	pub video_codec: String,
	/// Format name of the first audio stream, compared exactly.
	pub audio_codec: String,
	/// Expected play time; defaults to the record duration.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
	/// Allowed relative deviation of the play time (0.10 = ±10%).
	pub duration_tolerance: f64,
	/// Color the source renders and the playback must resemble.
	pub color: Rgb,
	/// Maximum Euclidean RGB distance still considered similar.
	pub color_threshold: f64,
}

impl Default for Expectations {
	fn default() -> Self {
		Self {
			video_codec: "VP8".to_string(),
			audio_codec: "Vorbis".to_string(),
			duration_ms: None,
			duration_tolerance: 0.10,
			color: Rgb::new(0, 135, 0),
			color_threshold: DEFAULT_COLOR_THRESHOLD,
		}
	}
}

/// Everything a scenario run needs besides its collaborators.
///
/// Loaded from camelCase JSON; absent fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioConfig {
	/// Origin the content paths are resolved against.
	pub base_url: String,
	pub recorder_path: String,
	pub player_path: String,
	/// Where the recorder writes and the player reads the artifact.
	pub recording_path: PathBuf,
	/// How long the recorder session streams before it is stopped.
	pub record_ms: u64,
	/// Bound on every browser-event and termination wait.
	pub timeout_ms: u64,
	pub headless: bool,
	pub expect: Expectations,
}

impl Default for ScenarioConfig {
	fn default() -> Self {
		Self {
			base_url: "http://localhost:8080".to_string(),
			recorder_path: DEFAULT_RECORDER_PATH.to_string(),
			player_path: DEFAULT_PLAYER_PATH.to_string(),
			recording_path: PathBuf::from(DEFAULT_RECORDING_PATH),
			record_ms: DEFAULT_RECORD_MS,
			timeout_ms: DEFAULT_TIMEOUT_MS,
			headless: true,
			expect: Expectations::default(),
		}
	}
}

impl ScenarioConfig {
	/// Reads a JSON config file and validates it.
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		for (name, path) in [("recorderPath", &self.recorder_path), ("playerPath", &self.player_path)] {
			if !path.starts_with('/') {
				return Err(Error::Config(format!("{name} must start with '/': '{path}'")));
			}
		}
		if self.recorder_path == self.player_path {
			return Err(Error::Config("recorderPath and playerPath must differ".into()));
		}
		if !self.recording_path.is_absolute() {
			return Err(Error::Config(format!(
				"recordingPath must be absolute: '{}'",
				self.recording_path.display()
			)));
		}
		if self.timeout_ms == 0 {
			return Err(Error::Config("timeoutMs must be positive".into()));
		}
		if self.record_ms == 0 {
			return Err(Error::Config("recordMs must be positive".into()));
		}
		if !(0.0..1.0).contains(&self.expect.duration_tolerance) {
			return Err(Error::Config(format!(
				"expect.durationTolerance must be in [0, 1): {}",
				self.expect.duration_tolerance
			)));
		}
		if self.expect.color_threshold <= 0.0 {
			return Err(Error::Config("expect.colorThreshold must be positive".into()));
		}
		url::Url::parse(&self.base_url).map_err(|e| Error::Config(format!("baseUrl '{}': {e}", self.base_url)))?;
		Ok(())
	}

	/// `file://` URI handed to the recorder and player endpoints. Characters
	/// with URL meaning (`#`, `?`, `%`, spaces) are percent-encoded so the URI
	/// resolves back to exactly `recording_path`.
	pub fn recording_uri(&self) -> Result<String> {
		url::Url::from_file_path(&self.recording_path)
			.map(String::from)
			.map_err(|()| Error::Config(format!("recordingPath must be absolute: '{}'", self.recording_path.display())))
	}

	pub fn record_duration(&self) -> Duration {
		Duration::from_millis(self.record_ms)
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}

	pub fn expected_duration(&self) -> Duration {
		Duration::from_millis(self.expect.duration_ms.unwrap_or(self.record_ms))
	}
}
