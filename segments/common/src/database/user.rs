use chrono::{DateTime, Utc};

pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, postgres_from_row::FromRow, serde::Serialize)]
pub struct User {
	/// The unique id of the user
	pub id: UserId,
	/// Display name, unique across users
	pub slug: String,
	/// The time the user was created
	pub created_at: DateTime<Utc>,
}
