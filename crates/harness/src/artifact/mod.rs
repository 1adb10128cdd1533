//! Recording inspection: the prober collaborator and the checks run on its output.

mod ffprobe;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use ffprobe::{FfprobeProber, format_name, parse_ffprobe_json};

use crate::BoxFut;
use crate::color::Rgb;
use crate::config::Expectations;
use crate::error::Result;
use crate::report::{Check, Mismatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
	Video,
	Audio,
}

impl fmt::Display for StreamKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			StreamKind::Video => "video",
			StreamKind::Audio => "audio",
		})
	}
}

/// One stream of a probed container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
	pub kind: StreamKind,
	/// Format name, e.g. `VP8` or `Vorbis`.
	pub format: String,
}

/// What a prober reports about a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
	pub streams: Vec<StreamInfo>,
	pub duration: Option<Duration>,
}

impl MediaInfo {
	/// Format name of the `index`-th stream of `kind`.
	pub fn format(&self, kind: StreamKind, index: usize) -> Option<&str> {
		self.streams
			.iter()
			.filter(|s| s.kind == kind)
			.nth(index)
			.map(|s| s.format.as_str())
	}
}

/// Opens a media file and reports its streams.
pub trait ArtifactProber: Send + Sync {
	fn probe<'a>(&'a self, path: &'a Path) -> BoxFut<'a, Result<MediaInfo>>;
}

/// Checks a recording and its playback against [`Expectations`].
///
/// Every check reports through [`Mismatch`] values instead of failing, so one
/// run surfaces all deviations at once.
#[derive(Clone)]
pub struct ArtifactValidator {
	prober: Arc<dyn ArtifactProber>,
}

impl ArtifactValidator {
	pub fn new(prober: Arc<dyn ArtifactProber>) -> Self {
		Self { prober }
	}

	/// Format name of the first stream of `kind` in the artifact.
	pub async fn codec_of(&self, path: &Path, kind: StreamKind) -> Result<Option<String>> {
		let info = self.prober.probe(path).await?;
		Ok(info.format(kind, 0).map(str::to_string))
	}

	/// Compares video and audio format names exactly against `expect`.
	///
	/// An unreadable artifact yields a mismatch for each codec check.
	pub async fn check_codecs(&self, path: &Path, expect: &Expectations) -> Vec<Mismatch> {
		let info = match self.prober.probe(path).await {
			Ok(info) => Some(info),
			Err(err) => {
				tracing::warn!(path = %path.display(), error = %err, "artifact could not be probed");
				None
			}
		};

		[
			(Check::VideoCodec, StreamKind::Video, &expect.video_codec),
			(Check::AudioCodec, StreamKind::Audio, &expect.audio_codec),
		]
		.into_iter()
		.filter_map(|(check, kind, expected)| {
			let actual = match &info {
				Some(info) => info.format(kind, 0).unwrap_or("<no stream>"),
				None => "<unreadable>",
			};
			tracing::info!(%kind, expected = %expected, actual, "codec check");
			(actual != expected.as_str()).then(|| Mismatch::new(check, expected.as_str(), actual))
		})
		.collect()
	}

	/// Play time must be within `tolerance` (relative) of `expected`.
	pub fn check_duration(observed: Duration, expected: Duration, tolerance: f64) -> Option<Mismatch> {
		let expected_s = expected.as_secs_f64();
		let deviation = (observed.as_secs_f64() - expected_s).abs();
		let within = deviation <= expected_s * tolerance;
		tracing::info!(
			observed_ms = observed.as_millis() as u64,
			expected_ms = expected.as_millis() as u64,
			tolerance,
			within,
			"duration check"
		);
		(!within).then(|| {
			Mismatch::new(
				Check::PlaybackDuration,
				format!("{:.3}s ±{:.0}%", expected_s, tolerance * 100.0),
				format!("{:.3}s", observed.as_secs_f64()),
			)
		})
	}

	/// Sampled color must be similar to `expected` within `threshold`.
	pub fn check_color(observed: Rgb, expected: Rgb, threshold: f64) -> Option<Mismatch> {
		let distance = expected.distance(&observed);
		let similar = expected.is_similar_to(&observed, threshold);
		tracing::info!(%observed, %expected, distance, threshold, "color check");
		(!similar).then(|| {
			Mismatch::new(
				Check::Color,
				format!("{expected} (distance < {threshold})"),
				format!("{observed} (distance {distance:.1})"),
			)
		})
	}
}

impl fmt::Debug for ArtifactValidator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ArtifactValidator").finish_non_exhaustive()
	}
}
