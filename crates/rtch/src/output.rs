//! Result rendering: colored text for people, a JSON envelope for scripts.

use colored::Colorize;
use rtc_harness::{Mismatch, ScenarioReport};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope on stdout
	Json,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
	ok: bool,
	command: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<String>,
}

fn verdict(ok: bool) -> colored::ColoredString {
	if ok { "PASS".green().bold() } else { "FAIL".red().bold() }
}

pub fn render_report(report: &ScenarioReport) -> String {
	format!("{} {report}", verdict(report.passed()))
}

pub fn render_mismatches(subject: &str, mismatches: &[Mismatch]) -> String {
	let mut out = format!("{} {subject}", verdict(mismatches.is_empty()));
	for mismatch in mismatches {
		out.push_str(&format!("\n  - {mismatch}"));
	}
	out
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) {
	match serde_json::to_string_pretty(envelope) {
		Ok(json) => println!("{json}"),
		Err(err) => eprintln!("{} failed to serialize output: {err}", "error:".red().bold()),
	}
}

pub fn print_report(command: &str, report: &ScenarioReport, format: OutputFormat) {
	match format {
		OutputFormat::Text => println!("{}", render_report(report)),
		OutputFormat::Json => print_envelope(&Envelope {
			ok: report.passed(),
			command,
			data: Some(report),
			error: None,
		}),
	}
}

#[derive(Serialize)]
pub struct ProbeOutcome<'a> {
	pub file: &'a std::path::Path,
	pub mismatches: &'a [Mismatch],
}

pub fn print_probe(outcome: &ProbeOutcome<'_>, format: OutputFormat) {
	match format {
		OutputFormat::Text => println!("{}", render_mismatches(&outcome.file.display().to_string(), outcome.mismatches)),
		OutputFormat::Json => print_envelope(&Envelope {
			ok: outcome.mismatches.is_empty(),
			command: "probe",
			data: Some(outcome),
			error: None,
		}),
	}
}

/// Errors always go to stderr; JSON mode also emits a failed envelope.
pub fn print_error(command: &str, err: &anyhow::Error, format: OutputFormat) {
	eprintln!("{} {err:#}", "error:".red().bold());
	if format == OutputFormat::Json {
		print_envelope::<()>(&Envelope {
			ok: false,
			command,
			data: None,
			error: Some(format!("{err:#}")),
		});
	}
}

#[cfg(test)]
mod tests {
	use rtc_harness::{Check, PhaseKind, PhaseRecord};

	use super::*;

	fn report() -> ScenarioReport {
		ScenarioReport {
			phases: vec![PhaseRecord {
				kind: PhaseKind::Record,
				elapsed_ms: 1_004,
			}],
			mismatches: Vec::new(),
		}
	}

	#[test]
	fn passing_report_renders_pass() {
		colored::control::set_override(false);
		assert_eq!(render_report(&report()), "PASS phases: record (1004ms); all checks passed");
	}

	#[test]
	fn mismatches_render_fail_with_details() {
		colored::control::set_override(false);
		let mismatches = vec![Mismatch::new(Check::AudioCodec, "Vorbis", "Opus")];
		let text = render_mismatches("/tmp/webrtc", &mismatches);
		assert_eq!(text, "FAIL /tmp/webrtc\n  - audio codec: expected Vorbis, got Opus");
	}

	#[test]
	fn envelope_skips_absent_fields() {
		let envelope = Envelope {
			ok: true,
			command: "simulate",
			data: Some(report()),
			error: None,
		};
		let json = serde_json::to_value(&envelope).unwrap();
		assert_eq!(json["ok"], true);
		assert_eq!(json["data"]["phases"][0]["kind"], "record");
		assert_eq!(json["data"]["phases"][0]["elapsedMs"], 1_004);
		assert!(json.get("error").is_none());
	}
}
