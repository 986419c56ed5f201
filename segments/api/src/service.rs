use chrono::{DateTime, Utc};
use common::command::{Command, ExportStats, RevokeSegments};
use common::database::{MembershipEvent, Segment, User, UserId};

use crate::channel::CommandChannel;
use crate::directory::Directory;
use crate::error::{ServiceError, StoreError};
use crate::sampler::Sampler;
use crate::store::MembershipStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ChangeSegments {
	pub users: Vec<UserId>,
	pub add: Vec<String>,
	pub remove: Vec<String>,
	/// When set, the added segments are revoked again at this time.
	pub revoke_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct CreateSegment {
	pub slug: String,
	/// Users that always receive the new segment.
	pub users: Vec<UserId>,
	/// Share of all users, 0 to 100, that receive the new segment at random.
	pub percent: i32,
	pub revoke_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CreatedSegment {
	pub segment: Segment,
	/// Every user the segment was assigned to.
	pub users: Vec<UserId>,
}

/// Validates requests, applies them to the store and hands deferred work to
/// the command channel.
pub struct MembershipService<S, D, C> {
	store: S,
	directory: D,
	channel: C,
}

impl<S: MembershipStore, D: Directory, C: CommandChannel> MembershipService<S, D, C> {
	pub fn new(store: S, directory: D, channel: C) -> Self {
		Self {
			store,
			directory,
			channel,
		}
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn directory(&self) -> &D {
		&self.directory
	}

	#[tracing::instrument(skip(self, request), fields(users = ?request.users))]
	pub async fn change_segments(&self, request: ChangeSegments) -> Result<(), ServiceError> {
		if request.users.is_empty() {
			return Err(ServiceError::invalid("no users given"));
		}

		if request.add.is_empty() && request.remove.is_empty() {
			return Err(ServiceError::invalid("nothing to add or remove"));
		}

		let revoke_at = parse_revoke_at(request.revoke_at.as_deref())?;
		if revoke_at.is_some() && request.add.is_empty() {
			return Err(ServiceError::invalid("revoke_at requires segments to add"));
		}

		self.ensure_users_exist(&request.users).await?;

		self.store
			.apply_changes(&request.users, &request.add, &request.remove)
			.await?;

		if let Some(fire_at) = revoke_at {
			self.queue_revocation(request.users, request.add, fire_at).await?;
		}

		Ok(())
	}

	pub async fn create_user(&self, slug: &str) -> Result<User, ServiceError> {
		let slug = slug.trim();
		if slug.is_empty() {
			return Err(ServiceError::invalid("user slug must not be empty"));
		}

		match self.directory.create_user(slug).await {
			Ok(user) => {
				tracing::info!(user_id = user.id, slug, "created user");
				Ok(user)
			}
			Err(StoreError::AlreadyExists) => Err(ServiceError::AlreadyExists(format!("user {slug}"))),
			Err(err) => Err(err.into()),
		}
	}

	pub async fn get_user(&self, id: UserId) -> Result<User, ServiceError> {
		self.directory
			.get_user(id)
			.await?
			.ok_or_else(|| ServiceError::not_found(format!("user {id}")))
	}

	pub async fn delete_user(&self, id: UserId) -> Result<(), ServiceError> {
		if !self.store.delete_user(id).await? {
			return Err(ServiceError::not_found(format!("user {id}")));
		}

		Ok(())
	}

	/// Creates a segment and assigns it to the given users plus a random
	/// `percent` share of all users.
	#[tracing::instrument(skip(self, request), fields(slug = %request.slug))]
	pub async fn create_segment(&self, request: CreateSegment) -> Result<CreatedSegment, ServiceError> {
		let slug = request.slug.trim().to_owned();
		if slug.is_empty() {
			return Err(ServiceError::invalid("segment slug must not be empty"));
		}

		if !(0..=100).contains(&request.percent) {
			return Err(ServiceError::invalid(format!(
				"percent must be between 0 and 100, got {}",
				request.percent
			)));
		}

		let revoke_at = parse_revoke_at(request.revoke_at.as_deref())?;

		self.ensure_users_exist(&request.users).await?;

		let segment = match self.directory.create_segments(std::slice::from_ref(&slug)).await {
			Ok(mut segments) if !segments.is_empty() => segments.remove(0),
			Ok(_) => return Err(ServiceError::Internal(format!("segment {slug} was not returned").into())),
			Err(StoreError::AlreadyExists) => return Err(ServiceError::AlreadyExists(format!("segment {slug}"))),
			Err(err) => return Err(err.into()),
		};

		let users = match self.assign_new_segment(&slug, request.users, request.percent).await {
			Ok(users) => users,
			Err(err) => {
				self.discard_segments(std::slice::from_ref(&slug)).await;
				return Err(err);
			}
		};

		if users.is_empty() {
			if revoke_at.is_some() {
				tracing::debug!("segment has no members, nothing to revoke");
			}

			return Ok(CreatedSegment { segment, users });
		}

		tracing::info!(members = users.len(), "created segment");

		if let Some(fire_at) = revoke_at {
			self.queue_revocation(users.clone(), vec![slug], fire_at).await?;
		}

		Ok(CreatedSegment { segment, users })
	}

	/// Creates all `slugs` or none of them and assigns them to `users`.
	pub async fn create_segments(&self, slugs: &[String], users: &[UserId]) -> Result<Vec<Segment>, ServiceError> {
		if slugs.is_empty() {
			return Err(ServiceError::invalid("no segments given"));
		}

		if slugs.iter().any(|slug| slug.trim().is_empty()) {
			return Err(ServiceError::invalid("segment slug must not be empty"));
		}

		self.ensure_users_exist(users).await?;

		let segments = match self.directory.create_segments(slugs).await {
			Ok(segments) => segments,
			Err(StoreError::AlreadyExists) => {
				return Err(ServiceError::AlreadyExists("one of the segments already exists".into()));
			}
			Err(err) => return Err(err.into()),
		};

		if !users.is_empty() {
			if let Err(err) = self.store.apply_changes(users, slugs, &[]).await {
				self.discard_segments(slugs).await;
				return Err(err.into());
			}
		}

		Ok(segments)
	}

	pub async fn get_segment(&self, slug: &str) -> Result<Segment, ServiceError> {
		self.directory
			.get_segment(slug)
			.await?
			.ok_or_else(|| ServiceError::not_found(format!("segment {slug}")))
	}

	pub async fn delete_segment(&self, slug: &str) -> Result<(), ServiceError> {
		if !self.store.delete_segment(slug).await? {
			return Err(ServiceError::not_found(format!("segment {slug}")));
		}

		Ok(())
	}

	pub async fn current_segments(&self, user: UserId) -> Result<Vec<String>, ServiceError> {
		if self.directory.get_user(user).await?.is_none() {
			return Err(ServiceError::not_found(format!("user {user}")));
		}

		Ok(self.store.current_segments(user).await?)
	}

	pub async fn stats_for_period(&self, year: i32, month: u32) -> Result<Vec<MembershipEvent>, ServiceError> {
		common::time::month_bounds(year, month)?;

		Ok(self.store.stats_for_period(year, month).await?)
	}

	/// Asks the worker to export one month of audit events. Returns the name
	/// of the file the export will be written to.
	pub async fn request_export(&self, year: i32, month: u32) -> Result<String, ServiceError> {
		common::time::month_bounds(year, month)?;

		let file_name = common::keys::export_file_name(year, month);

		self.channel
			.publish(&Command::ExportStats(ExportStats {
				year,
				month,
				file_name: file_name.clone(),
			}))
			.await
			.map_err(|err| ServiceError::Internal(Box::new(err)))?;

		tracing::info!(year, month, file_name = %file_name, "queued stats export");

		Ok(file_name)
	}

	/// Assigns a freshly created segment to `users` plus a random `percent`
	/// share. Returns every member.
	async fn assign_new_segment(
		&self,
		slug: &str,
		mut users: Vec<UserId>,
		percent: i32,
	) -> Result<Vec<UserId>, ServiceError> {
		for user in Sampler::new(&self.directory).sample_users(percent).await? {
			if !users.contains(&user) {
				users.push(user);
			}
		}

		if !users.is_empty() {
			self.store.apply_changes(&users, &[slug.to_owned()], &[]).await?;
		}

		Ok(users)
	}

	/// Deletes segments whose creation could not be completed.
	async fn discard_segments(&self, slugs: &[String]) {
		for slug in slugs {
			if let Err(err) = self.store.delete_segment(slug).await {
				tracing::error!(slug = %slug, error = %err, "failed to discard incomplete segment");
			}
		}
	}

	async fn ensure_users_exist(&self, users: &[UserId]) -> Result<(), ServiceError> {
		if users.is_empty() {
			return Ok(());
		}

		let existing = self.directory.existing_users(users).await?;
		let missing = users
			.iter()
			.filter(|user| !existing.contains(user))
			.map(ToString::to_string)
			.collect::<Vec<_>>();

		if !missing.is_empty() {
			return Err(ServiceError::not_found(format!("users {}", missing.join(", "))));
		}

		Ok(())
	}

	async fn queue_revocation(
		&self,
		users: Vec<UserId>,
		segments: Vec<String>,
		fire_at: DateTime<Utc>,
	) -> Result<(), ServiceError> {
		let command = Command::RevokeSegments(RevokeSegments {
			users,
			segments,
			fire_at,
		});

		self.channel.publish(&command).await.map_err(|err| {
			tracing::error!(error = %err, "failed to queue revocation");
			ServiceError::RevocationNotQueued(err)
		})
	}
}

fn parse_revoke_at(revoke_at: Option<&str>) -> Result<Option<DateTime<Utc>>, ServiceError> {
	match revoke_at.map(str::trim) {
		None | Some("") => Ok(None),
		Some(ts) => Ok(Some(common::time::parse_timestamp(ts)?)),
	}
}
