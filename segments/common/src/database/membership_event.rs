use chrono::{DateTime, Utc};

use super::{Operation, UserId};

/// One row of the append-only audit log. Rows are never updated and carry no
/// foreign keys, so they outlive the user and segment they mention.
#[derive(Debug, Clone, PartialEq, Eq, postgres_from_row::FromRow, serde::Serialize)]
pub struct MembershipEvent {
	pub id: i64,
	pub user_id: UserId,
	pub segment_slug: String,
	pub operation: Operation,
	pub created_at: DateTime<Utc>,
}
