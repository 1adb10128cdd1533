use std::sync::Arc;

use anyhow::bail;
use rtc_harness::{ArtifactValidator, Expectations, FfprobeProber};

use crate::cli::ProbeArgs;
use crate::output::{self, OutputFormat, ProbeOutcome};

pub async fn run(args: ProbeArgs, format: OutputFormat) -> anyhow::Result<bool> {
	if !args.file.exists() {
		bail!("recording not found: {}", args.file.display());
	}

	let expect = Expectations {
		video_codec: args.video,
		audio_codec: args.audio,
		..Expectations::default()
	};
	let validator = ArtifactValidator::new(Arc::new(FfprobeProber::new(args.ffprobe)));
	let mismatches = validator.check_codecs(&args.file, &expect).await;

	output::print_probe(
		&ProbeOutcome {
			file: &args.file,
			mismatches: &mismatches,
		},
		format,
	);
	Ok(mismatches.is_empty())
}
