mod cli;
mod commands;
mod logging;
mod output;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if !commands::dispatch(cli).await {
		std::process::exit(1);
	}
}
