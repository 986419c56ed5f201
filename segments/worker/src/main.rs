use anyhow::Context as _;
use binary_helper::global::{setup_database, setup_nats};
use binary_helper::{bootstrap, impl_global_traits};
use segments_worker::config::{CommandsConfig, ExportConfig};
use utils::context::Context;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct ExtConfig {
	commands: CommandsConfig,
	export: ExportConfig,
}

impl binary_helper::config::ConfigExtention for ExtConfig {
	const APP_NAME: &'static str = "segments-worker";
}

type AppConfig = binary_helper::config::AppConfig<ExtConfig>;

struct GlobalState {
	ctx: Context,
	db: std::sync::Arc<utils::database::Pool>,
	config: AppConfig,
	nats: async_nats::Client,
	jetstream: async_nats::jetstream::Context,
}

impl_global_traits!(GlobalState);

impl binary_helper::global::GlobalConfigProvider<CommandsConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &CommandsConfig {
		&self.config.extra.commands
	}
}

impl binary_helper::global::GlobalConfigProvider<ExportConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &ExportConfig {
		&self.config.extra.export
	}
}

impl binary_helper::Global<AppConfig> for GlobalState {
	async fn new(ctx: Context, config: AppConfig) -> anyhow::Result<Self> {
		let db = setup_database(&config.database).await?;
		let (nats, jetstream) = setup_nats(&config.name, &config.nats).await?;

		Ok(Self {
			ctx,
			db,
			config,
			nats,
			jetstream,
		})
	}
}

#[tokio::main]
pub async fn main() {
	if let Err(err) = bootstrap::<AppConfig, GlobalState, _>(|global| async move {
		let applied = segments_api::migration::run_migrations(&global.db)
			.await
			.context("failed to run migrations")?;
		tracing::info!(applied, "database is up to date");

		segments_worker::consumer::run(global)
			.await
			.context("consumer stopped unexpectedly")
	})
	.await
	{
		tracing::error!("{:#}", err);
		std::process::exit(1);
	}
}
