use common::command::CommandError;
use common::time::TimeError;
use utils::database::deadpool_postgres::PoolError;

/// Failures at the storage boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("already exists")]
	AlreadyExists,
	#[error("user or segment not found")]
	NotFound,
	#[error("invalid request: {0}")]
	Invalid(String),
	#[error("database error: {0}")]
	Internal(#[source] PoolError),
}

impl From<PoolError> for StoreError {
	fn from(err: PoolError) -> Self {
		if utils::database::is_unique_violation(&err) {
			Self::AlreadyExists
		} else if utils::database::is_foreign_key_violation(&err) {
			Self::NotFound
		} else {
			Self::Internal(err)
		}
	}
}

impl From<utils::database::tokio_postgres::Error> for StoreError {
	fn from(err: utils::database::tokio_postgres::Error) -> Self {
		PoolError::Backend(err).into()
	}
}

impl From<TimeError> for StoreError {
	fn from(err: TimeError) -> Self {
		Self::Invalid(err.to_string())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
	#[error("failed to encode command: {0}")]
	Encode(#[from] CommandError),
	#[error("failed to publish command: {0}")]
	Publish(#[from] async_nats::jetstream::context::PublishError),
	#[error("command channel unavailable: {0}")]
	Unavailable(String),
}

/// Failures reported to callers of the membership service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("already exists: {0}")]
	AlreadyExists(String),
	#[error("not found: {0}")]
	NotFound(String),
	#[error("invalid request: {0}")]
	Invalid(String),
	#[error("internal error")]
	Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
	/// The mutation was committed but its deferred revocation could not be
	/// handed to the command channel.
	#[error("changes applied but the revocation was not queued: {0}")]
	RevocationNotQueued(#[source] ChannelError),
}

impl ServiceError {
	pub fn invalid(msg: impl Into<String>) -> Self {
		Self::Invalid(msg.into())
	}

	pub fn not_found(msg: impl Into<String>) -> Self {
		Self::NotFound(msg.into())
	}
}

impl From<StoreError> for ServiceError {
	fn from(err: StoreError) -> Self {
		match err {
			StoreError::AlreadyExists => Self::AlreadyExists("a requested record already exists".into()),
			StoreError::NotFound => Self::NotFound("a referenced user or segment does not exist".into()),
			StoreError::Invalid(msg) => Self::Invalid(msg),
			StoreError::Internal(err) => Self::Internal(Box::new(err)),
		}
	}
}

impl From<TimeError> for ServiceError {
	fn from(err: TimeError) -> Self {
		Self::Invalid(err.to_string())
	}
}
