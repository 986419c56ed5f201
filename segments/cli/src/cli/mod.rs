use crate::invoker::Invoker;

pub mod membership;
pub mod migrate;
pub mod segment;
pub mod stats;
pub mod user;

/// Manage users, segments and memberships of the segments service
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// The configuration file to use
	#[clap(long, short, env = "SEGMENTS_CONFIG")]
	pub config: Option<String>,

	/// Json output
	#[clap(long)]
	pub json: bool,

	#[clap(subcommand)]
	pub command: Commands,
}

#[derive(Debug, clap::Args)]
pub struct SubCommand<T: clap::Subcommand> {
	#[clap(subcommand)]
	pub command: T,
}

#[async_trait::async_trait]
pub trait Invokable {
	async fn invoke(&self, invoker: &mut Invoker, args: &Cli) -> anyhow::Result<()>;
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
	/// User commands
	User(SubCommand<user::Commands>),

	/// Segment commands
	Segment(SubCommand<segment::Commands>),

	/// Add or remove segments of users
	Membership(SubCommand<membership::Commands>),

	/// Audit log commands
	Stats(SubCommand<stats::Commands>),

	/// Database schema commands
	Migrate(SubCommand<migrate::Commands>),
}

#[async_trait::async_trait]
impl Invokable for Commands {
	async fn invoke(&self, invoker: &mut Invoker, args: &Cli) -> anyhow::Result<()> {
		match self {
			Self::User(cmd) => cmd.command.invoke(invoker, args).await,
			Self::Segment(cmd) => cmd.command.invoke(invoker, args).await,
			Self::Membership(cmd) => cmd.command.invoke(invoker, args).await,
			Self::Stats(cmd) => cmd.command.invoke(invoker, args).await,
			Self::Migrate(cmd) => cmd.command.invoke(invoker, args).await,
		}
	}
}
