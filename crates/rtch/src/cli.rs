use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Cargo-style help colors.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "rtch")]
#[command(about = "WebRTC record/playback harness")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run record, inspect and playback against the in-process loopback server
	Simulate(SimulateArgs),
	/// Check a recording's codecs with ffprobe
	Probe(ProbeArgs),
}

#[derive(Args, Debug, Default)]
pub struct SimulateArgs {
	/// Scenario config (camelCase JSON); defaults apply to absent fields
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Override how long the recorder streams, in milliseconds
	#[arg(long, value_name = "MS")]
	pub record_ms: Option<u64>,

	/// Override the recording location
	#[arg(long, value_name = "PATH")]
	pub recording: Option<PathBuf>,

	/// Format name the loopback recorder writes for video
	#[arg(long, value_name = "CODEC")]
	pub source_video: Option<String>,

	/// Never report the `playing` event
	#[arg(long)]
	pub suppress_playing: bool,

	/// Never fire the `ended` event in the player page
	#[arg(long)]
	pub suppress_ended: bool,

	/// Never deliver session termination to the server
	#[arg(long)]
	pub suppress_termination: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
	/// Recording to inspect
	pub file: PathBuf,

	/// Expected video format name
	#[arg(long, value_name = "CODEC", default_value = "VP8")]
	pub video: String,

	/// Expected audio format name
	#[arg(long, value_name = "CODEC", default_value = "Vorbis")]
	pub audio: String,

	/// ffprobe binary
	#[arg(long, value_name = "PATH", default_value = "ffprobe")]
	pub ffprobe: PathBuf,
}
