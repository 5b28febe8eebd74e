use clap::Parser;
use tempest_cli::output::Report;
use tempest_cli::{Cli, app, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let summary = app::run(&cli).await?;
	Report::from(&summary).write_to(cli.format, &mut std::io::stdout().lock())?;
	Ok(())
}
