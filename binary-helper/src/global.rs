use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_nats::ServerAddr;
use utils::database::deadpool_postgres::{Manager, ManagerConfig, PoolConfig, RecyclingMethod, Runtime};
use utils::database::tokio_postgres::NoTls;
use utils::database::Pool;

use crate::config::{DatabaseConfig, NatsConfig};

#[macro_export]
macro_rules! impl_global_traits {
	($struct:ty) => {
		impl binary_helper::global::GlobalCtx for $struct {
			#[inline(always)]
			fn ctx(&self) -> &utils::context::Context {
				&self.ctx
			}
		}

		impl binary_helper::global::GlobalNats for $struct {
			#[inline(always)]
			fn nats(&self) -> &async_nats::Client {
				&self.nats
			}

			#[inline(always)]
			fn jetstream(&self) -> &async_nats::jetstream::Context {
				&self.jetstream
			}
		}

		impl binary_helper::global::GlobalDb for $struct {
			#[inline(always)]
			fn db(&self) -> &std::sync::Arc<utils::database::Pool> {
				&self.db
			}
		}

		impl binary_helper::global::GlobalConfig for $struct {}
	};
}

pub trait GlobalCtx {
	fn ctx(&self) -> &utils::context::Context;
}

pub trait GlobalConfig {
	#[inline(always)]
	fn config<C>(&self) -> &C
	where
		Self: GlobalConfigProvider<C>,
	{
		GlobalConfigProvider::provide_config(self)
	}
}

pub trait GlobalConfigProvider<C> {
	fn provide_config(&self) -> &C;
}

pub trait GlobalNats {
	fn nats(&self) -> &async_nats::Client;
	fn jetstream(&self) -> &async_nats::jetstream::Context;
}

pub trait GlobalDb {
	fn db(&self) -> &Arc<Pool>;
}

pub async fn setup_nats(
	name: &str,
	config: &NatsConfig,
) -> anyhow::Result<(async_nats::Client, async_nats::jetstream::Context)> {
	let nats = {
		let mut options = async_nats::ConnectOptions::new()
			.connection_timeout(Duration::from_secs(5))
			.name(name)
			.retry_on_initial_connect();

		if let Some(user) = &config.username {
			options = options.user_and_password(user.clone(), config.password.clone().unwrap_or_default())
		} else if let Some(token) = &config.token {
			options = options.token(token.clone())
		}

		if let Some(tls) = &config.tls {
			options = options
				.require_tls(true)
				.add_client_certificate((&tls.cert).into(), (&tls.key).into());

			if let Some(ca_cert) = &tls.ca_cert {
				options = options.add_root_certificates(ca_cert.into())
			}
		}

		options
			.connect(
				config
					.servers
					.iter()
					.map(|s| s.parse::<ServerAddr>())
					.collect::<Result<Vec<_>, _>>()
					.context("failed to parse nats server addresses")?,
			)
			.await
			.context("failed to connect to nats")?
	};

	let jetstream = async_nats::jetstream::new(nats.clone());

	Ok((nats, jetstream))
}

pub async fn setup_database(config: &DatabaseConfig) -> anyhow::Result<Arc<Pool>> {
	let pg_config = config
		.uri
		.parse::<utils::database::tokio_postgres::Config>()
		.context("invalid database uri")?;

	let manager = Manager::from_config(
		pg_config,
		NoTls,
		ManagerConfig {
			recycling_method: RecyclingMethod::Fast,
		},
	);

	let pool = Pool::builder(manager)
		.config(PoolConfig::new(config.max_connections.max(1)))
		.runtime(Runtime::Tokio1)
		.build()
		.context("failed to create database pool")?;

	// Fail at startup rather than on the first request.
	let _conn = pool.get().await.context("failed to connect to database")?;

	Ok(Arc::new(pool))
}
