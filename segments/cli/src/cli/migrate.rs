use crate::cli::{Cli, Invokable};
use crate::invoker::Invoker;

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
	/// Apply all pending migrations
	Up,

	/// Revert the most recent migration
	Down,
}

#[derive(Debug, serde::Serialize)]
pub struct Applied {
	pub applied: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct Reverted {
	pub reverted: Option<&'static str>,
}

#[async_trait::async_trait]
impl Invokable for Commands {
	async fn invoke(&self, invoker: &mut Invoker, _: &Cli) -> anyhow::Result<()> {
		match self {
			Self::Up => {
				let applied = segments_api::migration::run_migrations(invoker.db()).await?;
				invoker.display(&Applied { applied })
			}
			Self::Down => {
				let reverted = segments_api::migration::revert_last(invoker.db()).await?;
				invoker.display(&Reverted { reverted })
			}
		}
	}
}
