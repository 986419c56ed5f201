use common::database::UserId;
use segments_api::service::ChangeSegments;

use crate::cli::{Cli, Invokable};
use crate::invoker::Invoker;

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
	/// Add and remove segments for a set of users in one step
	Change(Change),
}

#[derive(Debug, clap::Args)]
pub struct Change {
	/// The users to change
	#[clap(long, required = true, value_delimiter = ',')]
	users: Vec<UserId>,

	/// Segments to add
	#[clap(long, value_delimiter = ',')]
	add: Vec<String>,

	/// Segments to remove
	#[clap(long, value_delimiter = ',')]
	remove: Vec<String>,

	/// Revoke the added segments again at this time
	#[clap(long)]
	revoke_at: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct Changed {
	pub users: Vec<UserId>,
	pub added: Vec<String>,
	pub removed: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub revoke_at: Option<String>,
}

#[async_trait::async_trait]
impl Invokable for Commands {
	async fn invoke(&self, invoker: &mut Invoker, _: &Cli) -> anyhow::Result<()> {
		match self {
			Self::Change(cmd) => {
				invoker
					.service()
					.change_segments(ChangeSegments {
						users: cmd.users.clone(),
						add: cmd.add.clone(),
						remove: cmd.remove.clone(),
						revoke_at: cmd.revoke_at.clone(),
					})
					.await?;

				invoker.display(&Changed {
					users: cmd.users.clone(),
					added: cmd.add.clone(),
					removed: cmd.remove.clone(),
					revoke_at: cmd.revoke_at.clone(),
				})
			}
		}
	}
}
