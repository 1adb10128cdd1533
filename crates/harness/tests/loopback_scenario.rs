mod common;

use std::time::Duration;

use rtc_harness::content::termination;
use rtc_harness::loopback::{Faults, ServerOptions};
use rtc_harness::{Check, Error, PhaseKind, PhaseSpec, Scenario};

#[tokio::test]
async fn record_then_playback_passes() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let config = common::config(&dir);
	let h = common::harness(config.clone(), ServerOptions::default(), Faults::default());

	let report = h.runner.run().await.expect("scenario should complete");

	assert!(report.passed(), "{report}");
	let kinds: Vec<_> = report.phases.iter().map(|p| p.kind).collect();
	assert_eq!(kinds, vec![PhaseKind::Record, PhaseKind::Inspect, PhaseKind::Playback]);
	assert!(report.phases[0].elapsed_ms >= config.record_ms);
	assert!(config.recording_path.exists());

	let codes: Vec<_> = h.service.terminations().iter().map(|t| t.code).collect();
	assert_eq!(codes, vec![termination::NORMAL, termination::END_OF_STREAM]);
	assert_eq!(h.service.active_sessions(), 0);
	assert_eq!(h.server.pipelines_created(), 2);
	assert_eq!(h.server.pipelines_released(), 2);
}

#[tokio::test]
async fn codec_mismatch_is_reported_and_playback_still_runs() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let options = ServerOptions {
		video_codec: "AVC".into(),
		..Default::default()
	};
	let h = common::harness(common::config(&dir), options, Faults::default());

	let report = h.runner.run().await.unwrap();

	assert!(!report.passed());
	assert_eq!(report.phases.len(), 3);
	let video: Vec<_> = report.mismatches_for(Check::VideoCodec).collect();
	assert_eq!(video.len(), 1);
	assert_eq!(video[0].expected, "VP8");
	assert_eq!(video[0].actual, "AVC");
	assert_eq!(report.mismatches_for(Check::AudioCodec).count(), 0);
	assert_eq!(report.mismatches_for(Check::Color).count(), 0);
}

#[tokio::test]
async fn wrong_source_color_fails_the_color_check() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let options = ServerOptions {
		source_color: rtc_harness::Rgb::new(200, 30, 30),
		..Default::default()
	};
	let h = common::harness(common::config(&dir), options, Faults::default());

	let report = h.runner.run().await.unwrap();

	let color: Vec<_> = report.mismatches_for(Check::Color).collect();
	assert_eq!(color.len(), 1, "{report}");
	assert!(color[0].actual.starts_with("#c81e1e"));
}

#[tokio::test]
async fn missing_playing_event_aborts_before_inspection() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let faults = Faults {
		suppress_playing: true,
		..Default::default()
	};
	let h = common::harness(common::config(&dir), ServerOptions::default(), faults);

	let err = h.runner.run().await.unwrap_err();

	match &err {
		Error::SetupFailure { phase, reason, .. } => {
			assert_eq!(*phase, PhaseKind::Record);
			assert_eq!(reason, "Timeout waiting playing event");
		}
		other => panic!("expected setup failure, got {other:?}"),
	}
	assert!(err.is_fatal());
	assert!(err.is_timeout());

	// Dropping the client force-closes the page, which ends the session.
	assert!(common::wait_idle(&h.service, Duration::from_secs(2)).await);
	assert_eq!(h.server.pipelines_created(), 1);
	assert_eq!(h.server.pipelines_released(), 1);
}

#[tokio::test]
async fn lost_termination_times_out_and_forces_teardown() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let mut config = common::config(&dir);
	config.record_ms = 200;
	config.timeout_ms = 300;
	let faults = Faults {
		suppress_termination: true,
		..Default::default()
	};
	let h = common::harness(config, ServerOptions::default(), faults);

	let err = h.runner.run().await.unwrap_err();

	match &err {
		Error::TerminationTimeout { waited, .. } => assert_eq!(*waited, Duration::from_millis(300)),
		other => panic!("expected termination timeout, got {other:?}"),
	}
	assert!(err.to_string().starts_with("Timeout waiting onSessionTerminated"));

	let terminations = h.service.terminations();
	assert_eq!(terminations.len(), 1);
	assert_eq!(terminations[0].code, termination::FORCED);
	assert_eq!(h.service.active_sessions(), 0);
	assert_eq!(h.server.pipelines_released(), h.server.pipelines_created());
}

#[tokio::test]
async fn recorder_endpoint_failure_is_a_setup_failure() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let config = common::config(&dir);
	let options = ServerOptions {
		fail_recorder_endpoint: true,
		..Default::default()
	};
	let h = common::harness(config.clone(), options, Faults::default());

	let err = h.runner.run().await.unwrap_err();

	match &err {
		Error::SetupFailure { phase, reason, .. } => {
			assert_eq!(*phase, PhaseKind::Record);
			assert!(reason.contains("RecorderEndpoint"), "{reason}");
		}
		other => panic!("expected setup failure, got {other:?}"),
	}
	assert!(!config.recording_path.exists());
	assert_eq!(h.service.active_sessions(), 0);
	assert_eq!(h.server.pipelines_released(), 1);
	assert_eq!(h.service.terminations()[0].code, termination::REQUEST_FAILED);
}

#[tokio::test]
async fn unsubscribed_ended_event_is_a_mismatch() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let config = common::config(&dir);
	let h = common::harness(config.clone(), ServerOptions::default(), Faults::default());

	let mut scenario = Scenario::record_and_playback(&config);
	if let Some(PhaseSpec::Playback { events, .. }) = scenario.phases.last_mut() {
		events.retain(|e| e != "ended");
	}

	let report = h.runner.run_scenario(&scenario).await.unwrap();

	assert_eq!(report.phases.len(), 3);
	assert_eq!(report.mismatches_for(Check::PlaybackEnded).count(), 1);
	assert_eq!(h.service.active_sessions(), 0);
}

#[tokio::test]
async fn ended_event_that_never_fires_is_a_mismatch() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let faults = Faults {
		suppress_ended: true,
		..Default::default()
	};
	let h = common::harness(common::config(&dir), ServerOptions::default(), faults);

	let report = h.runner.run().await.expect("a silent ended event must not abort the run");

	assert_eq!(report.phases.len(), 3);
	let ended: Vec<_> = report.mismatches_for(Check::PlaybackEnded).collect();
	assert_eq!(ended.len(), 1, "{report}");
	assert_eq!(ended[0].actual, "Timeout waiting ended event");
	assert_eq!(report.mismatches_for(Check::Color).count(), 0);

	let codes: Vec<_> = h.service.terminations().iter().map(|t| t.code).collect();
	assert_eq!(codes, vec![termination::NORMAL, termination::END_OF_STREAM]);
	assert_eq!(h.service.active_sessions(), 0);
}

#[tokio::test]
async fn recording_path_with_url_syntax_round_trips() {
	common::init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let mut config = common::config(&dir);
	config.recording_path = dir.path().join("take #1 ?50%.webm");
	let h = common::harness(config.clone(), ServerOptions::default(), Faults::default());

	let report = h.runner.run().await.unwrap();

	assert!(report.passed(), "{report}");
	assert!(config.recording_path.exists());
	assert!(!dir.path().join("take ").exists());
	assert_eq!(report.mismatches_for(Check::VideoCodec).count(), 0);
	assert_eq!(report.mismatches_for(Check::AudioCodec).count(), 0);
}

#[test]
fn relative_recording_path_is_refused() {
	let dir = tempfile::tempdir().unwrap();
	let mut config = common::config(&dir);
	config.recording_path = "recordings/take.webm".into();

	assert!(matches!(config.validate(), Err(Error::Config(_))));
	let server = rtc_harness::loopback::LoopbackServer::new(ServerOptions::default());
	let err = rtc_harness::ContentService::for_config(&config, std::sync::Arc::new(server)).err();
	assert!(matches!(err, Some(Error::Config(_))));
}
