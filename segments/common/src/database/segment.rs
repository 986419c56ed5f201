use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, postgres_from_row::FromRow, serde::Serialize)]
pub struct Segment {
	/// The slug is the primary key
	pub slug: String,
	pub created_at: DateTime<Utc>,
}
