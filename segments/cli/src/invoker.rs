use std::sync::Arc;

use anyhow::Context as _;
use binary_helper::config::{load_app_config, ConfigExtention};
use binary_helper::global::{setup_database, setup_nats};
use binary_helper::logging;
use segments_api::channel::NatsCommandChannel;
use segments_api::config::CommandsConfig;
use segments_api::directory::PgDirectory;
use segments_api::service::MembershipService;
use segments_api::store::PgMembershipStore;
use utils::database::Pool;

use crate::cli::Cli;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExtConfig {
	pub commands: CommandsConfig,
}

impl ConfigExtention for ExtConfig {
	const APP_NAME: &'static str = "segments-cli";
}

pub type Service = MembershipService<Arc<PgMembershipStore>, Arc<PgDirectory>, NatsCommandChannel>;

/// Talks to the database and the command channel directly, using the same
/// configuration as the worker.
pub struct Invoker {
	db: Arc<Pool>,
	service: Service,
	json_output: bool,
}

#[derive(serde::Serialize)]
struct DisplayOutput<T> {
	#[serde(rename = "__type")]
	object_type: &'static str,
	#[serde(flatten)]
	value: T,
}

impl Invoker {
	pub async fn new(args: &Cli) -> anyhow::Result<Self> {
		let config = load_app_config::<ExtConfig>(args.config.as_deref(), std::env::vars())?;

		logging::init(&config.logging.level, config.logging.mode).context("failed to init logging")?;

		let db = setup_database(&config.database).await?;
		let (_, jetstream) = setup_nats(&config.name, &config.nats).await?;

		let store = Arc::new(PgMembershipStore::new(db.clone()));
		let directory = Arc::new(PgDirectory::new(db.clone()));
		// The worker creates the stream on startup.
		let channel = NatsCommandChannel::new(jetstream, config.extra.commands.subject.clone());

		Ok(Self {
			db,
			service: MembershipService::new(store, directory, channel),
			json_output: args.json,
		})
	}

	pub fn db(&self) -> &Pool {
		&self.db
	}

	pub fn service(&self) -> &Service {
		&self.service
	}

	pub fn display<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
		let object_type = std::any::type_name::<T>();
		let object_type = object_type.split("::").last().unwrap_or(object_type);

		let output = if self.json_output {
			serde_json::to_string_pretty(&DisplayOutput { object_type, value }).context("failed to display response")?
		} else {
			serde_yaml::to_string(&DisplayOutput { object_type, value }).context("failed to display response")?
		};

		println!("{}", output.trim());

		Ok(())
	}

	pub fn display_array<T: serde::Serialize>(&self, values: &[T]) -> anyhow::Result<()> {
		let object_type = std::any::type_name::<T>();
		let object_type = object_type.split("::").last().unwrap_or(object_type);

		let values = &values
			.iter()
			.map(|value| DisplayOutput { object_type, value })
			.collect::<Vec<_>>();

		let output = if self.json_output {
			serde_json::to_string_pretty(&values).context("failed to display response")?
		} else {
			serde_yaml::to_string(&values).context("failed to display response")?
		};

		println!("{}", output.trim());

		Ok(())
	}
}
