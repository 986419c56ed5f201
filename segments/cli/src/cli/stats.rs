use common::database::{MembershipEvent, Operation, UserId};

use crate::cli::{Cli, Invokable};
use crate::invoker::Invoker;

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
	/// Print the audit events of one month
	Show(Period),

	/// Ask the worker to write the audit events of one month to a CSV file
	Export(Period),
}

#[derive(Debug, clap::Args)]
pub struct Period {
	#[clap(long)]
	year: i32,

	/// 1 to 12
	#[clap(long)]
	month: u32,
}

#[derive(Debug, serde::Serialize)]
pub struct Event {
	pub user: UserId,
	pub segment: String,
	pub operation: Operation,
	pub timestamp: String,
}

impl From<MembershipEvent> for Event {
	fn from(event: MembershipEvent) -> Self {
		Self {
			user: event.user_id,
			segment: event.segment_slug,
			operation: event.operation,
			timestamp: common::time::format_local(event.created_at),
		}
	}
}

#[derive(Debug, serde::Serialize)]
pub struct ExportQueued {
	pub file_name: String,
}

#[async_trait::async_trait]
impl Invokable for Commands {
	async fn invoke(&self, invoker: &mut Invoker, _: &Cli) -> anyhow::Result<()> {
		match self {
			Self::Show(period) => {
				let events = invoker.service().stats_for_period(period.year, period.month).await?;
				invoker.display_array(&events.into_iter().map(Event::from).collect::<Vec<_>>())
			}
			Self::Export(period) => {
				let file_name = invoker.service().request_export(period.year, period.month).await?;
				invoker.display(&ExportQueued { file_name })
			}
		}
	}
}
