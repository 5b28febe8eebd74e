//! Diagnostics go to stderr through `tracing`; stdout is reserved for output.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter directive for a `-v` count. `RUST_LOG` overrides it.
pub fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn,tempest_runtime=error",
		1 => "info,tempest_runtime=warn",
		2 => "debug,tempest_runtime=info",
		_ => "trace",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_target(verbosity > 1)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filters_parse() {
		for verbosity in 0..5 {
			assert!(default_filter(verbosity).parse::<EnvFilter>().is_ok());
		}
	}

	#[test]
	fn runtime_noise_is_quieter_by_default() {
		assert!(default_filter(0).contains("tempest_runtime=error"));
		assert_eq!(default_filter(7), "trace");
	}
}
