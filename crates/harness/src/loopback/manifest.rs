use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::BoxFut;
use crate::artifact::{ArtifactProber, MediaInfo, StreamInfo, StreamKind};
use crate::color::Rgb;
use crate::error::{Error, Result};

/// Recording artifact written by a loopback recorder endpoint.
///
/// Stands in for a real container: it carries exactly the properties the
/// harness inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
	pub video_codec: String,
	pub audio_codec: String,
	pub duration_ms: u64,
	pub color: Rgb,
}

impl Manifest {
	pub async fn read(path: &Path) -> Result<Self> {
		let raw = tokio::fs::read_to_string(path).await?;
		Ok(serde_json::from_str(&raw)?)
	}

	pub async fn write(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(path, serde_json::to_vec_pretty(self)?).await?;
		Ok(())
	}

	pub fn duration(&self) -> Duration {
		Duration::from_millis(self.duration_ms)
	}

	pub fn media_info(&self) -> MediaInfo {
		MediaInfo {
			streams: vec![
				StreamInfo {
					kind: StreamKind::Video,
					format: self.video_codec.clone(),
				},
				StreamInfo {
					kind: StreamKind::Audio,
					format: self.audio_codec.clone(),
				},
			],
			duration: Some(self.duration()),
		}
	}
}

/// [`ArtifactProber`] for loopback manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestProber;

impl ArtifactProber for ManifestProber {
	fn probe<'a>(&'a self, path: &'a Path) -> BoxFut<'a, Result<MediaInfo>> {
		Box::pin(async move {
			Manifest::read(path).await.map(|m| m.media_info()).map_err(|e| Error::Probe {
				path: path.to_path_buf(),
				reason: e.to_string(),
			})
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn prober_reads_written_manifest() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("webrtc");
		let manifest = Manifest {
			video_codec: "VP8".into(),
			audio_codec: "Vorbis".into(),
			duration_ms: 5_020,
			color: Rgb::new(0, 135, 0),
		};
		manifest.write(&path).await.unwrap();

		let info = ManifestProber.probe(&path).await.unwrap();
		assert_eq!(info.format(StreamKind::Video, 0), Some("VP8"));
		assert_eq!(info.format(StreamKind::Audio, 0), Some("Vorbis"));
		assert_eq!(info.duration, Some(Duration::from_millis(5_020)));

		let raw = std::fs::read_to_string(&path).unwrap();
		assert!(raw.contains("\"videoCodec\""));
		assert!(raw.contains("\"#008700\""));
	}

	#[tokio::test]
	async fn missing_manifest_is_a_probe_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = ManifestProber.probe(&dir.path().join("absent")).await.unwrap_err();
		assert!(matches!(err, Error::Probe { .. }));
	}
}
