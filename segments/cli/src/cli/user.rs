use common::database::UserId;

use crate::cli::{Cli, Invokable};
use crate::invoker::Invoker;

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
	/// Create a user
	Create {
		/// Display name of the user
		slug: String,
	},

	/// Get a user
	Get { id: UserId },

	/// Delete a user and all of their memberships
	Delete { id: UserId },

	/// List the segments a user currently belongs to
	Segments { id: UserId },
}

#[derive(Debug, serde::Serialize)]
pub struct UserSegments {
	pub user: UserId,
	pub segments: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct Deleted {
	pub user: UserId,
}

#[async_trait::async_trait]
impl Invokable for Commands {
	async fn invoke(&self, invoker: &mut Invoker, _: &Cli) -> anyhow::Result<()> {
		match self {
			Self::Create { slug } => {
				let user = invoker.service().create_user(slug).await?;
				invoker.display(&user)
			}
			Self::Get { id } => {
				let user = invoker.service().get_user(*id).await?;
				invoker.display(&user)
			}
			Self::Delete { id } => {
				invoker.service().delete_user(*id).await?;
				invoker.display(&Deleted { user: *id })
			}
			Self::Segments { id } => {
				let segments = invoker.service().current_segments(*id).await?;
				invoker.display(&UserSegments { user: *id, segments })
			}
		}
	}
}
