mod probe;
mod simulate;

use crate::cli::{Cli, Commands};
use crate::output;

/// Runs the selected command. Returns whether every check passed; errors
/// are rendered here so `main` only maps the outcome to an exit code.
pub async fn dispatch(cli: Cli) -> bool {
	let format = cli.format;
	let (name, outcome) = match cli.command {
		Commands::Simulate(args) => ("simulate", simulate::run(args, format).await),
		Commands::Probe(args) => ("probe", probe::run(args, format).await),
	};

	match outcome {
		Ok(passed) => passed,
		Err(err) => {
			output::print_error(name, &err, format);
			false
		}
	}
}

