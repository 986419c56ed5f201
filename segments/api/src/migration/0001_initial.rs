use utils::database::deadpool_postgres::Transaction;

use super::Migration;

pub struct InitialMigration;

#[async_trait::async_trait]
impl Migration for InitialMigration {
	fn name(&self) -> &'static str {
		"InitialMigration"
	}

	fn version(&self) -> i32 {
		1
	}

	async fn up(&self, tx: &Transaction<'_>) -> anyhow::Result<()> {
		utils::database::query(
			"CREATE TABLE users (
				id BIGSERIAL PRIMARY KEY,
				slug TEXT NOT NULL UNIQUE,
				created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
			);",
		)
		.build()
		.execute(tx)
		.await?;

		utils::database::query(
			"CREATE TABLE segments (
				slug TEXT PRIMARY KEY,
				created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
			);",
		)
		.build()
		.execute(tx)
		.await?;

		utils::database::query(
			"CREATE TABLE users_segments (
				user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
				segment_slug TEXT NOT NULL REFERENCES segments (slug) ON DELETE CASCADE,
				PRIMARY KEY (user_id, segment_slug)
			);",
		)
		.build()
		.execute(tx)
		.await?;

		utils::database::query("CREATE TYPE segment_operation AS ENUM ('added', 'removed');")
			.build()
			.execute(tx)
			.await?;

		utils::database::query(
			"CREATE TABLE users_segments_events (
				id BIGSERIAL PRIMARY KEY,
				user_id BIGINT NOT NULL,
				segment_slug TEXT NOT NULL,
				operation segment_operation NOT NULL,
				created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
			);",
		)
		.build()
		.execute(tx)
		.await?;

		Ok(())
	}

	async fn down(&self, tx: &Transaction<'_>) -> anyhow::Result<()> {
		for statement in [
			"DROP TABLE users_segments_events;",
			"DROP TYPE segment_operation;",
			"DROP TABLE users_segments;",
			"DROP TABLE segments;",
			"DROP TABLE users;",
		] {
			utils::database::query(statement).build().execute(tx).await?;
		}

		Ok(())
	}
}
