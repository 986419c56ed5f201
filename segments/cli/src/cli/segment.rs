use common::database::UserId;
use segments_api::service::CreateSegment;

use crate::cli::{Cli, Invokable};
use crate::invoker::Invoker;

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
	/// Create a segment, optionally assigning it to users
	Create(Create),

	/// Create several segments at once, all or nothing
	CreateMany {
		/// The slugs of the segments
		#[clap(required = true, num_args = 1..)]
		slugs: Vec<String>,

		/// Users that receive every new segment
		#[clap(long, value_delimiter = ',')]
		users: Vec<UserId>,
	},

	/// Get a segment
	Get { slug: String },

	/// Delete a segment and all of its memberships
	Delete { slug: String },
}

#[derive(Debug, clap::Args)]
pub struct Create {
	/// The slug of the segment
	slug: String,

	/// Users that always receive the segment
	#[clap(long, value_delimiter = ',')]
	users: Vec<UserId>,

	/// Share of all users, 0 to 100, that receive the segment at random
	#[clap(long, default_value = "0")]
	percent: i32,

	/// Revoke the segment again at this time (RFC 3339 or "YYYY-MM-DD HH:MM:SS" local time)
	#[clap(long)]
	revoke_at: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct Deleted {
	pub segment: String,
}

#[async_trait::async_trait]
impl Invokable for Commands {
	async fn invoke(&self, invoker: &mut Invoker, _: &Cli) -> anyhow::Result<()> {
		match self {
			Self::Create(cmd) => {
				let created = invoker
					.service()
					.create_segment(CreateSegment {
						slug: cmd.slug.clone(),
						users: cmd.users.clone(),
						percent: cmd.percent,
						revoke_at: cmd.revoke_at.clone(),
					})
					.await?;

				invoker.display(&created)
			}
			Self::CreateMany { slugs, users } => {
				let segments = invoker.service().create_segments(slugs, users).await?;
				invoker.display_array(&segments)
			}
			Self::Get { slug } => {
				let segment = invoker.service().get_segment(slug).await?;
				invoker.display(&segment)
			}
			Self::Delete { slug } => {
				invoker.service().delete_segment(slug).await?;
				invoker.display(&Deleted { segment: slug.clone() })
			}
		}
	}
}
