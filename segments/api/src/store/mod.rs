use std::future::Future;
use std::sync::Arc;

use common::database::{MembershipEvent, UserId};

use crate::error::StoreError;

mod plan;
mod postgres;

pub use plan::ChangePlan;
pub use postgres::PgMembershipStore;

/// The user to segment relation together with its audit log.
///
/// Every change to the relation appends exactly one event in the same unit of
/// work, so the log can be replayed into the current state.
pub trait MembershipStore: Send + Sync {
	/// Adds every segment in `add` and then removes every segment in `remove`
	/// for every user, all or nothing. Removing an absent pair still records
	/// a `removed` event.
	fn apply_changes(
		&self,
		users: &[UserId],
		add: &[String],
		remove: &[String],
	) -> impl Future<Output = Result<(), StoreError>> + Send;

	fn current_segments(&self, user: UserId) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

	/// Audit events of one local calendar month in insertion order.
	fn stats_for_period(
		&self,
		year: i32,
		month: u32,
	) -> impl Future<Output = Result<Vec<MembershipEvent>, StoreError>> + Send;

	/// Deletes a segment and logs a removal for each membership it had.
	/// Returns `false` if there was no such segment.
	fn delete_segment(&self, slug: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

	/// Deletes a user and logs a removal for each membership they had.
	/// Returns `false` if there was no such user.
	fn delete_user(&self, user: UserId) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl<T: MembershipStore> MembershipStore for Arc<T> {
	fn apply_changes(
		&self,
		users: &[UserId],
		add: &[String],
		remove: &[String],
	) -> impl Future<Output = Result<(), StoreError>> + Send {
		self.as_ref().apply_changes(users, add, remove)
	}

	fn current_segments(&self, user: UserId) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send {
		self.as_ref().current_segments(user)
	}

	fn stats_for_period(
		&self,
		year: i32,
		month: u32,
	) -> impl Future<Output = Result<Vec<MembershipEvent>, StoreError>> + Send {
		self.as_ref().stats_for_period(year, month)
	}

	fn delete_segment(&self, slug: &str) -> impl Future<Output = Result<bool, StoreError>> + Send {
		self.as_ref().delete_segment(slug)
	}

	fn delete_user(&self, user: UserId) -> impl Future<Output = Result<bool, StoreError>> + Send {
		self.as_ref().delete_user(user)
	}
}
