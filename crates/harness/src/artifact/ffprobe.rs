use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use super::{ArtifactProber, MediaInfo, StreamInfo, StreamKind};
use crate::BoxFut;
use crate::error::{Error, Result};

/// [`ArtifactProber`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
	program: PathBuf,
	timeout: Duration,
}

impl FfprobeProber {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			timeout: Duration::from_secs(30),
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	async fn run(&self, path: &Path) -> Result<MediaInfo> {
		let probe_err = |reason: String| Error::Probe {
			path: path.to_path_buf(),
			reason,
		};

		let mut cmd = Command::new(&self.program);
		cmd.args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
			.arg(path)
			.stdin(Stdio::null())
			.kill_on_drop(true);

		let output = tokio::time::timeout(self.timeout, cmd.output())
			.await
			.map_err(|_| probe_err(format!("ffprobe timed out after {}ms", self.timeout.as_millis())))?
			.map_err(|e| probe_err(format!("failed to run {}: {e}", self.program.display())))?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			return Err(probe_err(format!("ffprobe exited with {}: {}", output.status, stderr.trim())));
		}

		parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout)).map_err(|e| probe_err(e.to_string()))
	}
}

impl Default for FfprobeProber {
	fn default() -> Self {
		Self::new("ffprobe")
	}
}

impl ArtifactProber for FfprobeProber {
	fn probe<'a>(&'a self, path: &'a Path) -> BoxFut<'a, Result<MediaInfo>> {
		Box::pin(self.run(path))
	}
}

#[derive(Deserialize)]
struct FfprobeOutput {
	#[serde(default)]
	streams: Vec<FfprobeStream>,
	format: Option<FfprobeFormat>,
}

#[derive(Deserialize)]
struct FfprobeStream {
	codec_type: Option<String>,
	codec_name: Option<String>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
	duration: Option<String>,
}

/// Parses `ffprobe -print_format json -show_streams -show_format` output.
///
/// Streams other than video and audio are skipped.
pub fn parse_ffprobe_json(raw: &str) -> Result<MediaInfo> {
	let output: FfprobeOutput = serde_json::from_str(raw)?;

	let streams = output
		.streams
		.into_iter()
		.filter_map(|s| {
			let kind = match s.codec_type.as_deref()? {
				"video" => StreamKind::Video,
				"audio" => StreamKind::Audio,
				_ => return None,
			};
			let format = format_name(s.codec_name.as_deref().unwrap_or_default());
			Some(StreamInfo { kind, format })
		})
		.collect();

	let duration = output
		.format
		.and_then(|f| f.duration)
		.and_then(|d| d.parse::<f64>().ok())
		.filter(|d| d.is_finite() && *d >= 0.0)
		.map(Duration::from_secs_f64);

	Ok(MediaInfo { streams, duration })
}

/// Maps an ffprobe codec name to the container-level format name
/// (`vp8` -> `VP8`, `vorbis` -> `Vorbis`). Unknown names pass through.
pub fn format_name(codec: &str) -> String {
	match codec {
		"vp8" => "VP8",
		"vp9" => "VP9",
		"av1" => "AV1",
		"h264" => "AVC",
		"hevc" => "HEVC",
		"vorbis" => "Vorbis",
		"opus" => "Opus",
		"aac" => "AAC",
		"mp3" => "MPEG Audio",
		"pcm_s16le" => "PCM",
		other => other,
	}
	.to_string()
}
