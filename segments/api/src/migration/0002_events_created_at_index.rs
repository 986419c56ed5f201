use utils::database::deadpool_postgres::Transaction;

use super::Migration;

pub struct EventsCreatedAtIndex;

#[async_trait::async_trait]
impl Migration for EventsCreatedAtIndex {
	fn name(&self) -> &'static str {
		"EventsCreatedAtIndex"
	}

	fn version(&self) -> i32 {
		2
	}

	async fn up(&self, tx: &Transaction<'_>) -> anyhow::Result<()> {
		utils::database::query(
			"CREATE INDEX users_segments_events_created_at_index ON users_segments_events (created_at ASC, id ASC);",
		)
		.build()
		.execute(tx)
		.await?;

		utils::database::query("CREATE INDEX users_segments_segment_slug_index ON users_segments (segment_slug);")
			.build()
			.execute(tx)
			.await?;

		Ok(())
	}

	async fn down(&self, tx: &Transaction<'_>) -> anyhow::Result<()> {
		utils::database::query("DROP INDEX users_segments_events_created_at_index;")
			.build()
			.execute(tx)
			.await?;

		utils::database::query("DROP INDEX users_segments_segment_slug_index;")
			.build()
			.execute(tx)
			.await?;

		Ok(())
	}
}
