use common::database::UserId;

use crate::directory::Directory;
use crate::error::StoreError;

/// Number of users a `percent` share of `total` amounts to, rounded down. Any
/// positive share asks for at least one user.
pub fn sample_size(total: i64, percent: u8) -> i64 {
	let limit = total.max(0) * i64::from(percent) / 100;
	if limit == 0 && percent > 0 {
		1
	} else {
		limit
	}
}

/// Picks a uniformly random share of all users.
pub struct Sampler<'a, D> {
	directory: &'a D,
}

impl<'a, D: Directory> Sampler<'a, D> {
	pub fn new(directory: &'a D) -> Self {
		Self { directory }
	}

	pub async fn sample_users(&self, percent: i32) -> Result<Vec<UserId>, StoreError> {
		let percent = u8::try_from(percent)
			.ok()
			.filter(|p| *p <= 100)
			.ok_or_else(|| StoreError::Invalid(format!("percent must be between 0 and 100, got {percent}")))?;

		if percent == 0 {
			return Ok(Vec::new());
		}

		let total = self.directory.count_users().await?;
		let limit = sample_size(total, percent);

		tracing::debug!(percent, total, limit, "sampling users");

		self.directory.random_user_ids(limit).await
	}
}
