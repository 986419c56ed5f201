use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::database::{MembershipEvent, Operation, UserId};
use utils::database::deadpool_postgres::Transaction;
use utils::database::Pool;

use super::plan::{columns, ChangePlan};
use super::MembershipStore;
use crate::error::StoreError;

#[derive(Clone)]
pub struct PgMembershipStore {
	db: Arc<Pool>,
}

impl PgMembershipStore {
	pub fn new(db: Arc<Pool>) -> Self {
		Self { db }
	}
}

async fn log_events(
	tx: &Transaction<'_>,
	pairs: &[(UserId, String)],
	operation: Operation,
	at: DateTime<Utc>,
) -> Result<(), StoreError> {
	if pairs.is_empty() {
		return Ok(());
	}

	let (users, segments) = columns(pairs);

	utils::database::query(
		"INSERT INTO users_segments_events (user_id, segment_slug, operation, created_at)
		SELECT t.user_id, t.segment_slug, $3::segment_operation, $4::TIMESTAMPTZ
		FROM UNNEST($1::BIGINT[], $2::TEXT[]) WITH ORDINALITY AS t(user_id, segment_slug, ord)
		ORDER BY t.ord",
	)
	.bind(users)
	.bind(segments)
	.bind(operation)
	.bind(at)
	.build()
	.execute(tx)
	.await?;

	Ok(())
}

impl MembershipStore for PgMembershipStore {
	async fn apply_changes(&self, users: &[UserId], add: &[String], remove: &[String]) -> Result<(), StoreError> {
		let plan = ChangePlan::new(users, add, remove);
		if plan.is_empty() {
			return Ok(());
		}

		let now = Utc::now();

		let mut client = self.db.get().await?;
		// Dropping the transaction before commit rolls it back.
		let tx = client.transaction().await?;

		if !plan.additions.is_empty() {
			log_events(&tx, &plan.additions, Operation::Added, now).await?;

			let (users, segments) = columns(&plan.additions);
			utils::database::query(
				"INSERT INTO users_segments (user_id, segment_slug) SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[])",
			)
			.bind(users)
			.bind(segments)
			.build()
			.execute(&tx)
			.await?;
		}

		if !plan.removals.is_empty() {
			log_events(&tx, &plan.removals, Operation::Removed, now).await?;

			let (users, segments) = columns(&plan.removals);
			utils::database::query(
				"DELETE FROM users_segments WHERE (user_id, segment_slug) IN (SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[]))",
			)
			.bind(users)
			.bind(segments)
			.build()
			.execute(&tx)
			.await?;
		}

		tx.commit().await?;

		tracing::debug!(
			added = plan.additions.len(),
			removed = plan.removals.len(),
			"applied membership changes"
		);

		Ok(())
	}

	async fn current_segments(&self, user: UserId) -> Result<Vec<String>, StoreError> {
		Ok(
			utils::database::query("SELECT segment_slug FROM users_segments WHERE user_id = $1 ORDER BY segment_slug")
				.bind(user)
				.build_query_single_scalar::<String>()
				.fetch_all(&self.db)
				.await?,
		)
	}

	async fn stats_for_period(&self, year: i32, month: u32) -> Result<Vec<MembershipEvent>, StoreError> {
		let (start, end) = common::time::month_bounds(year, month)?;

		Ok(utils::database::query(
			"SELECT id, user_id, segment_slug, operation, created_at FROM users_segments_events
			WHERE created_at >= $1 AND created_at < $2
			ORDER BY id",
		)
		.bind(start)
		.bind(end)
		.build_query_as::<MembershipEvent>()
		.fetch_all(&self.db)
		.await?)
	}

	async fn delete_segment(&self, slug: &str) -> Result<bool, StoreError> {
		let mut client = self.db.get().await?;
		let tx = client.transaction().await?;

		// Locking the segment row blocks new memberships for it until commit.
		let exists = utils::database::query("SELECT slug FROM segments WHERE slug = $1 FOR UPDATE")
			.bind(slug.to_owned())
			.build_query_single_scalar::<String>()
			.fetch_optional(&tx)
			.await?
			.is_some();

		if !exists {
			return Ok(false);
		}

		let users = utils::database::query(
			"SELECT user_id FROM users_segments WHERE segment_slug = $1 ORDER BY user_id",
		)
		.bind(slug.to_owned())
		.build_query_single_scalar::<UserId>()
		.fetch_all(&tx)
		.await?;

		let pairs = users.into_iter().map(|user| (user, slug.to_owned())).collect::<Vec<_>>();
		log_events(&tx, &pairs, Operation::Removed, Utc::now()).await?;

		utils::database::query("DELETE FROM segments WHERE slug = $1")
			.bind(slug.to_owned())
			.build()
			.execute(&tx)
			.await?;

		tx.commit().await?;

		tracing::info!(segment = slug, memberships = pairs.len(), "deleted segment");

		Ok(true)
	}

	async fn delete_user(&self, user: UserId) -> Result<bool, StoreError> {
		let mut client = self.db.get().await?;
		let tx = client.transaction().await?;

		let exists = utils::database::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
			.bind(user)
			.build_query_single_scalar::<UserId>()
			.fetch_optional(&tx)
			.await?
			.is_some();

		if !exists {
			return Ok(false);
		}

		let segments = utils::database::query(
			"SELECT segment_slug FROM users_segments WHERE user_id = $1 ORDER BY segment_slug",
		)
		.bind(user)
		.build_query_single_scalar::<String>()
		.fetch_all(&tx)
		.await?;

		let pairs = segments.into_iter().map(|segment| (user, segment)).collect::<Vec<_>>();
		log_events(&tx, &pairs, Operation::Removed, Utc::now()).await?;

		utils::database::query("DELETE FROM users WHERE id = $1")
			.bind(user)
			.build()
			.execute(&tx)
			.await?;

		tx.commit().await?;

		tracing::info!(user_id = user, memberships = pairs.len(), "deleted user");

		Ok(true)
	}
}
