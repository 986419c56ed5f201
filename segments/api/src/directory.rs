use std::future::Future;
use std::sync::Arc;

use common::database::{Segment, User, UserId};
use utils::database::Pool;

use crate::error::StoreError;

/// The user and segment catalog.
pub trait Directory: Send + Sync {
	fn create_user(&self, slug: &str) -> impl Future<Output = Result<User, StoreError>> + Send;

	fn get_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

	/// The subset of `ids` that belong to existing users.
	fn existing_users(&self, ids: &[UserId]) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send;

	fn count_users(&self) -> impl Future<Output = Result<i64, StoreError>> + Send;

	/// Up to `limit` distinct user ids chosen uniformly at random.
	fn random_user_ids(&self, limit: i64) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send;

	/// Creates every segment or none of them.
	fn create_segments(&self, slugs: &[String]) -> impl Future<Output = Result<Vec<Segment>, StoreError>> + Send;

	fn get_segment(&self, slug: &str) -> impl Future<Output = Result<Option<Segment>, StoreError>> + Send;
}

#[derive(Clone)]
pub struct PgDirectory {
	db: Arc<Pool>,
}

impl PgDirectory {
	pub fn new(db: Arc<Pool>) -> Self {
		Self { db }
	}
}

impl Directory for PgDirectory {
	async fn create_user(&self, slug: &str) -> Result<User, StoreError> {
		Ok(
			utils::database::query("INSERT INTO users (slug) VALUES ($1) RETURNING id, slug, created_at")
				.bind(slug.to_owned())
				.build_query_as::<User>()
				.fetch_one(&self.db)
				.await?,
		)
	}

	async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
		Ok(utils::database::query("SELECT id, slug, created_at FROM users WHERE id = $1")
			.bind(id)
			.build_query_as::<User>()
			.fetch_optional(&self.db)
			.await?)
	}

	async fn existing_users(&self, ids: &[UserId]) -> Result<Vec<UserId>, StoreError> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}

		Ok(utils::database::query("SELECT id FROM users WHERE id = ANY($1) ORDER BY id")
			.bind(ids.to_vec())
			.build_query_single_scalar::<UserId>()
			.fetch_all(&self.db)
			.await?)
	}

	async fn count_users(&self) -> Result<i64, StoreError> {
		Ok(utils::database::query("SELECT COUNT(*) FROM users")
			.build_query_single_scalar::<i64>()
			.fetch_one(&self.db)
			.await?)
	}

	async fn random_user_ids(&self, limit: i64) -> Result<Vec<UserId>, StoreError> {
		if limit <= 0 {
			return Ok(Vec::new());
		}

		Ok(utils::database::query("SELECT id FROM users ORDER BY random() LIMIT $1")
			.bind(limit)
			.build_query_single_scalar::<UserId>()
			.fetch_all(&self.db)
			.await?)
	}

	async fn create_segments(&self, slugs: &[String]) -> Result<Vec<Segment>, StoreError> {
		if slugs.is_empty() {
			return Ok(Vec::new());
		}

		// A single statement, so a duplicate slug leaves nothing behind.
		Ok(utils::database::query(
			"INSERT INTO segments (slug) SELECT * FROM UNNEST($1::TEXT[]) RETURNING slug, created_at",
		)
		.bind(slugs.to_vec())
		.build_query_as::<Segment>()
		.fetch_all(&self.db)
		.await?)
	}

	async fn get_segment(&self, slug: &str) -> Result<Option<Segment>, StoreError> {
		Ok(utils::database::query("SELECT slug, created_at FROM segments WHERE slug = $1")
			.bind(slug.to_owned())
			.build_query_as::<Segment>()
			.fetch_optional(&self.db)
			.await?)
	}
}

impl<T: Directory> Directory for Arc<T> {
	fn create_user(&self, slug: &str) -> impl Future<Output = Result<User, StoreError>> + Send {
		self.as_ref().create_user(slug)
	}

	fn get_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>, StoreError>> + Send {
		self.as_ref().get_user(id)
	}

	fn existing_users(&self, ids: &[UserId]) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send {
		self.as_ref().existing_users(ids)
	}

	fn count_users(&self) -> impl Future<Output = Result<i64, StoreError>> + Send {
		self.as_ref().count_users()
	}

	fn random_user_ids(&self, limit: i64) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send {
		self.as_ref().random_user_ids(limit)
	}

	fn create_segments(&self, slugs: &[String]) -> impl Future<Output = Result<Vec<Segment>, StoreError>> + Send {
		self.as_ref().create_segments(slugs)
	}

	fn get_segment(&self, slug: &str) -> impl Future<Output = Result<Option<Segment>, StoreError>> + Send {
		self.as_ref().get_segment(slug)
	}
}
