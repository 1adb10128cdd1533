#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rtc_harness::loopback::{Faults, LoopbackBrowser, LoopbackServer, ManifestProber, ServerOptions};
use rtc_harness::{ContentService, ScenarioConfig, ScenarioRunner};
use tempfile::TempDir;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Short-running config recording into a fresh temp directory.
pub fn config(dir: &TempDir) -> ScenarioConfig {
	ScenarioConfig {
		recording_path: dir.path().join("webrtc"),
		record_ms: 1_000,
		timeout_ms: 2_000,
		..ScenarioConfig::default()
	}
}

pub struct Harness {
	pub server: LoopbackServer,
	pub service: Arc<ContentService>,
	pub runner: ScenarioRunner,
}

pub fn harness(config: ScenarioConfig, options: ServerOptions, faults: Faults) -> Harness {
	let server = LoopbackServer::new(options);
	let service = Arc::new(ContentService::for_config(&config, Arc::new(server.clone())).unwrap());
	let browser = LoopbackBrowser::new(Arc::clone(&service), server.clone()).with_faults(faults);
	let runner = ScenarioRunner::new(config, Arc::new(browser), Arc::clone(&service), Arc::new(ManifestProber));
	Harness { server, service, runner }
}

/// Polls until every session is gone or `within` elapses.
pub async fn wait_idle(service: &ContentService, within: Duration) -> bool {
	let deadline = tokio::time::Instant::now() + within;
	while tokio::time::Instant::now() < deadline {
		if service.active_sessions() == 0 {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	service.active_sessions() == 0
}
