use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use cli::Invokable;
use invoker::Invoker;
use utils::prelude::FutureTimeout;

mod cli;
mod invoker;

#[tokio::main]
async fn main() {
	if let Err(err) = start().await {
		eprintln!("{:#}", err);
		std::process::exit(1);
	}
}

async fn start() -> anyhow::Result<()> {
	let cli = cli::Cli::parse();

	let mut invoker = Invoker::new(&cli)
		.timeout(Duration::from_secs(10))
		.await
		.context("failed to build invoker: timed out")??;

	cli.command
		.invoke(&mut invoker, &cli)
		.await
		.context("failed to invoke command")?;

	Ok(())
}
