use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgAction, Parser};
use url::Url;

use crate::output::OutputFormat;

fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default().bold())
		.usage(AnsiColor::Yellow.on_default().bold())
		.literal(AnsiColor::Green.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "tempest")]
#[command(about = "Headless tempest client: log in, follow grains and packages, install apps")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, action = ArgAction::Count)]
	pub verbose: u8,

	/// Address the server's web UI is hosted at
	#[arg(long, env = "TEMPEST_URL", value_name = "URL", default_value = "http://localhost:8000/")]
	pub url: Url,

	/// Format of the report printed on exit
	#[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	/// Upload and install an app package once logged in
	#[arg(long, value_name = "FILE")]
	pub install: Option<PathBuf>,

	/// Ask the server to mail a login token to ADDR
	#[arg(long, value_name = "ADDR", conflicts_with = "login_token")]
	pub login_email: Option<String>,

	/// Finish an email login with the token received
	#[arg(long, value_name = "TOKEN")]
	pub login_token: Option<String>,

	/// Stop after SECS seconds instead of waiting for Ctrl-C
	#[arg(long, value_name = "SECS")]
	pub run_for: Option<u64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let cli = Cli::try_parse_from(["tempest"]).unwrap();
		assert_eq!(cli.verbose, 0);
		assert_eq!(cli.format, OutputFormat::Text);
		assert!(cli.install.is_none());
		assert_eq!(cli.url.scheme(), "http");
	}

	#[test]
	fn parse_install_and_verbosity() {
		let cli = Cli::try_parse_from([
			"tempest",
			"-vv",
			"--url",
			"https://tempest.example/",
			"--install",
			"/tmp/app.spk",
			"--run-for",
			"30",
			"-f",
			"json",
		])
		.unwrap();
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.url.host_str(), Some("tempest.example"));
		assert_eq!(cli.install, Some(PathBuf::from("/tmp/app.spk")));
		assert_eq!(cli.run_for, Some(30));
		assert_eq!(cli.format, OutputFormat::Json);
	}

	#[test]
	fn invalid_url_is_rejected() {
		assert!(Cli::try_parse_from(["tempest", "--url", "not a url"]).is_err());
	}

	#[test]
	fn email_and_token_conflict() {
		assert!(
			Cli::try_parse_from(["tempest", "--login-email", "a@b.c", "--login-token", "t"]).is_err()
		);
	}
}
