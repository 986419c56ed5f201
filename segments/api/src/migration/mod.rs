use anyhow::Context;
use utils::database::deadpool_postgres::Transaction;
use utils::database::Pool;

#[path = "0001_initial.rs"]
mod initial;
#[path = "0002_events_created_at_index.rs"]
mod events_created_at_index;

#[async_trait::async_trait]
trait Migration: Sync {
	fn name(&self) -> &'static str;
	fn version(&self) -> i32;

	async fn up(&self, tx: &Transaction<'_>) -> anyhow::Result<()>;
	async fn down(&self, tx: &Transaction<'_>) -> anyhow::Result<()>;
}

const fn migrations() -> &'static [&'static dyn Migration] {
	&[&initial::InitialMigration, &events_created_at_index::EventsCreatedAtIndex]
}

/// Key of the advisory lock that serialises schema changes across processes.
const MIGRATION_LOCK: i64 = 0x7365_676d_6967;

/// Number of migrations this build knows about.
pub fn latest_version() -> usize {
	migrations().len()
}

/// Takes the migration lock for the rest of `tx`, creates the version table
/// on first use and returns the current version.
async fn lock_version(tx: &Transaction<'_>) -> anyhow::Result<usize> {
	utils::database::query("SELECT pg_advisory_xact_lock($1)")
		.bind(MIGRATION_LOCK)
		.build()
		.execute(tx)
		.await
		.context("failed to take migration lock")?;

	utils::database::query("CREATE TABLE IF NOT EXISTS segments_migrations (version INTEGER NOT NULL)")
		.build()
		.execute(tx)
		.await
		.context("failed to create migration table")?;

	utils::database::query(
		"INSERT INTO segments_migrations (version) SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM segments_migrations)",
	)
	.build()
	.execute(tx)
	.await
	.context("failed to insert initial migration version")?;

	let version = utils::database::query("SELECT MAX(version) FROM segments_migrations")
		.build_query_single_scalar::<i32>()
		.fetch_one(tx)
		.await
		.context("failed to read migration version")?;

	let version = usize::try_from(version).context("negative migration version")?;
	if version > latest_version() {
		anyhow::bail!(
			"database is at version {}, but only {} migrations are available",
			version,
			latest_version()
		);
	}

	Ok(version)
}

async fn set_version(tx: &Transaction<'_>, version: i32) -> anyhow::Result<()> {
	utils::database::query("UPDATE segments_migrations SET version = $1")
		.bind(version)
		.build()
		.execute(tx)
		.await
		.context("failed to update migration version")?;

	Ok(())
}

/// Applies the next pending migration. Returns `false` once the schema is up
/// to date.
async fn apply_next(db: &Pool) -> anyhow::Result<bool> {
	let mut client = db.get().await.context("failed to get database connection")?;
	let tx = client.transaction().await.context("failed to start transaction")?;

	let version = lock_version(&tx).await?;
	let Some(migration) = migrations().get(version) else {
		tx.commit().await.context("failed to commit transaction")?;
		return Ok(false);
	};

	tracing::info!(name = migration.name(), version = migration.version(), "applying migration");

	migration.up(&tx).await.context("failed to apply migration")?;
	set_version(&tx, migration.version()).await?;

	tx.commit().await.context("failed to commit transaction")?;

	tracing::info!(name = migration.name(), "migration applied");

	Ok(true)
}

/// Brings the schema up to date. Returns the number of migrations this call
/// applied; concurrent callers wait for each other and never apply one twice.
#[tracing::instrument(skip(db))]
pub async fn run_migrations(db: &Pool) -> anyhow::Result<usize> {
	let mut count = 0;
	while apply_next(db).await? {
		count += 1;
	}

	Ok(count)
}

/// Reverts the most recent migration, if any. Returns its name.
#[tracing::instrument(skip(db))]
pub async fn revert_last(db: &Pool) -> anyhow::Result<Option<&'static str>> {
	let mut client = db.get().await.context("failed to get database connection")?;
	let tx = client.transaction().await.context("failed to start transaction")?;

	let version = lock_version(&tx).await?;
	let Some(migration) = version.checked_sub(1).and_then(|idx| migrations().get(idx)) else {
		tx.commit().await.context("failed to commit transaction")?;
		return Ok(None);
	};

	migration.down(&tx).await.context("failed to revert migration")?;
	set_version(&tx, migration.version() - 1).await?;

	tx.commit().await.context("failed to commit transaction")?;

	tracing::info!(name = migration.name(), "migration reverted");

	Ok(Some(migration.name()))
}
