use std::sync::Arc;

use anyhow::Context;
use rtc_harness::loopback::{Faults, LoopbackBrowser, LoopbackServer, ManifestProber, ServerOptions};
use rtc_harness::{ContentService, ScenarioConfig, ScenarioReport, ScenarioRunner};
use tracing::info;

use crate::cli::SimulateArgs;
use crate::output::{self, OutputFormat};

pub async fn run(args: SimulateArgs, format: OutputFormat) -> anyhow::Result<bool> {
	let report = simulate(&args).await?;
	output::print_report("simulate", &report, format);
	Ok(report.passed())
}

fn resolve_config(args: &SimulateArgs) -> anyhow::Result<ScenarioConfig> {
	let mut config = match &args.config {
		Some(path) => ScenarioConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => ScenarioConfig::default(),
	};
	if let Some(record_ms) = args.record_ms {
		config.record_ms = record_ms;
	}
	if let Some(recording) = &args.recording {
		config.recording_path = std::path::absolute(recording).with_context(|| format!("resolving {}", recording.display()))?;
	}
	config.validate()?;
	Ok(config)
}

async fn simulate(args: &SimulateArgs) -> anyhow::Result<ScenarioReport> {
	let config = resolve_config(args)?;
	let mut options = ServerOptions::default();
	if let Some(codec) = &args.source_video {
		options.video_codec = codec.clone();
	}
	let faults = Faults {
		suppress_playing: args.suppress_playing,
		suppress_ended: args.suppress_ended,
		suppress_termination: args.suppress_termination,
	};

	info!(
		recording = %config.recording_path.display(),
		record_ms = config.record_ms,
		timeout_ms = config.timeout_ms,
		"starting loopback simulation"
	);

	let server = LoopbackServer::new(options);
	let service = Arc::new(ContentService::for_config(&config, Arc::new(server.clone()))?);
	let browser = LoopbackBrowser::new(Arc::clone(&service), server).with_faults(faults);
	let runner = ScenarioRunner::new(config, Arc::new(browser), service, Arc::new(ManifestProber));

	runner.run().await.context("scenario aborted")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args_in(dir: &tempfile::TempDir) -> SimulateArgs {
		SimulateArgs {
			recording: Some(dir.path().join("webrtc")),
			record_ms: Some(1_000),
			..Default::default()
		}
	}

	#[test]
	fn overrides_apply_on_top_of_config_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("scenario.json");
		std::fs::write(&path, r#"{"recordMs": 9000, "timeoutMs": 1500, "expect": {"audioCodec": "Opus"}}"#).unwrap();

		let args = SimulateArgs {
			config: Some(path),
			..args_in(&dir)
		};
		let config = resolve_config(&args).unwrap();
		assert_eq!(config.record_ms, 1_000);
		assert_eq!(config.timeout_ms, 1_500);
		assert_eq!(config.expect.audio_codec, "Opus");
		assert_eq!(config.recording_path, dir.path().join("webrtc"));
	}

	#[test]
	fn relative_recording_override_is_made_absolute() {
		let dir = tempfile::tempdir().unwrap();
		let args = SimulateArgs {
			recording: Some("take #1.webm".into()),
			..args_in(&dir)
		};
		let config = resolve_config(&args).unwrap();
		assert!(config.recording_path.is_absolute());
		assert!(config.recording_path.ends_with("take #1.webm"));
	}

	#[test]
	fn invalid_override_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let args = SimulateArgs {
			record_ms: Some(0),
			..args_in(&dir)
		};
		assert!(resolve_config(&args).is_err());
	}

	#[tokio::test]
	async fn loopback_simulation_passes() {
		let dir = tempfile::tempdir().unwrap();
		let report = simulate(&args_in(&dir)).await.unwrap();
		assert!(report.passed(), "{report}");
		assert_eq!(report.phases.len(), 3);
	}

	#[tokio::test]
	async fn wrong_source_codec_fails() {
		let dir = tempfile::tempdir().unwrap();
		let args = SimulateArgs {
			source_video: Some("VP9".into()),
			..args_in(&dir)
		};
		let report = simulate(&args).await.unwrap();
		assert!(!report.passed());
		assert_eq!(report.mismatches[0].actual, "VP9");
	}
}
