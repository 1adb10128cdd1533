//! Scenario outcome: completed phases and accumulated content mismatches.

use std::fmt;

use serde::Serialize;

use crate::scenario::PhaseKind;

/// A content property the harness asserts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Check {
	VideoCodec,
	AudioCodec,
	/// The player never reported end of stream.
	PlaybackEnded,
	PlaybackDuration,
	Color,
}

impl fmt::Display for Check {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Check::VideoCodec => "video codec",
			Check::AudioCodec => "audio codec",
			Check::PlaybackEnded => "playback ended",
			Check::PlaybackDuration => "playback duration",
			Check::Color => "color",
		})
	}
}

/// One failed content assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
	pub check: Check,
	pub expected: String,
	pub actual: String,
}

impl Mismatch {
	pub fn new(check: Check, expected: impl Into<String>, actual: impl Into<String>) -> Self {
		Self {
			check,
			expected: expected.into(),
			actual: actual.into(),
		}
	}
}

impl fmt::Display for Mismatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: expected {}, got {}", self.check, self.expected, self.actual)
	}
}

/// A phase that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
	pub kind: PhaseKind,
	pub elapsed_ms: u64,
}

/// Outcome of a scenario run that was not aborted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
	pub phases: Vec<PhaseRecord>,
	pub mismatches: Vec<Mismatch>,
}

impl ScenarioReport {
	pub fn passed(&self) -> bool {
		self.mismatches.is_empty()
	}

	pub fn mismatches_for(&self, check: Check) -> impl Iterator<Item = &Mismatch> {
		self.mismatches.iter().filter(move |m| m.check == check)
	}

	pub(crate) fn record(&mut self, mismatch: Mismatch) {
		tracing::warn!(check = %mismatch.check, expected = %mismatch.expected, actual = %mismatch.actual, "assertion mismatch");
		self.mismatches.push(mismatch);
	}
}

impl fmt::Display for ScenarioReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let phases: Vec<String> = self.phases.iter().map(|p| format!("{} ({}ms)", p.kind, p.elapsed_ms)).collect();
		write!(f, "phases: {}", phases.join(", "))?;
		if self.passed() {
			return write!(f, "; all checks passed");
		}
		write!(f, "; {} mismatch(es)", self.mismatches.len())?;
		for mismatch in &self.mismatches {
			write!(f, "\n  - {mismatch}")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_report_passes() {
		let report = ScenarioReport::default();
		assert!(report.passed());
	}

	#[test]
	fn mismatches_fail_and_render() {
		let mut report = ScenarioReport::default();
		report.phases.push(PhaseRecord {
			kind: PhaseKind::Record,
			elapsed_ms: 5_010,
		});
		report.record(Mismatch::new(Check::VideoCodec, "VP8", "AVC"));
		report.record(Mismatch::new(Check::Color, "#008700", "#ff0000"));

		assert!(!report.passed());
		assert_eq!(report.mismatches_for(Check::VideoCodec).count(), 1);
		assert_eq!(report.mismatches_for(Check::AudioCodec).count(), 0);
		let text = report.to_string();
		assert!(text.starts_with("phases: record (5010ms); 2 mismatch(es)"));
		assert!(text.contains("video codec: expected VP8, got AVC"));
	}
}
