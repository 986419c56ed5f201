use common::database::{Operation, UserId};

/// The ordered list of pair level changes a single `apply_changes` call makes.
///
/// Users and segments are deduplicated keeping their first position. Pairs are
/// produced user by user, every addition before any removal, so a segment
/// named in both lists ends up removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePlan {
	pub additions: Vec<(UserId, String)>,
	pub removals: Vec<(UserId, String)>,
}

impl ChangePlan {
	pub fn new(users: &[UserId], add: &[String], remove: &[String]) -> Self {
		let users = dedup(users);
		let add = dedup(add);
		let remove = dedup(remove);

		Self {
			additions: pairs(&users, &add),
			removals: pairs(&users, &remove),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.additions.is_empty() && self.removals.is_empty()
	}

	/// Every change in application order.
	pub fn steps(&self) -> impl Iterator<Item = (Operation, UserId, &str)> {
		self.additions
			.iter()
			.map(|(user, segment)| (Operation::Added, *user, segment.as_str()))
			.chain(
				self.removals
					.iter()
					.map(|(user, segment)| (Operation::Removed, *user, segment.as_str())),
			)
	}
}

/// Splits pairs into the parallel arrays `UNNEST` expects.
pub(crate) fn columns(pairs: &[(UserId, String)]) -> (Vec<UserId>, Vec<String>) {
	pairs.iter().cloned().unzip()
}

fn pairs(users: &[UserId], segments: &[String]) -> Vec<(UserId, String)> {
	users
		.iter()
		.flat_map(|user| segments.iter().map(move |segment| (*user, segment.clone())))
		.collect()
}

fn dedup<T: Clone + PartialEq>(items: &[T]) -> Vec<T> {
	let mut out = Vec::with_capacity(items.len());
	for item in items {
		if !out.contains(item) {
			out.push(item.clone());
		}
	}
	out
}
