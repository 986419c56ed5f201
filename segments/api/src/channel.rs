use std::future::{Future, IntoFuture};
use std::time::Duration;

use anyhow::Context as _;
use async_nats::jetstream::stream::{self, RetentionPolicy};
use common::command::Command;
use utils::prelude::FutureTimeout;

use crate::error::ChannelError;

/// At least once, point to point delivery of commands to the worker.
pub trait CommandChannel: Send + Sync {
	fn publish(&self, command: &Command) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

impl<T: CommandChannel> CommandChannel for std::sync::Arc<T> {
	fn publish(&self, command: &Command) -> impl Future<Output = Result<(), ChannelError>> + Send {
		self.as_ref().publish(command)
	}
}

/// Publishes commands to a JetStream work queue and waits for the server to
/// acknowledge that the message was stored.
#[derive(Clone)]
pub struct NatsCommandChannel {
	jetstream: async_nats::jetstream::Context,
	subject: String,
	ack_timeout: Duration,
}

impl NatsCommandChannel {
	pub fn new(jetstream: async_nats::jetstream::Context, subject: impl Into<String>) -> Self {
		Self {
			jetstream,
			subject: subject.into(),
			ack_timeout: Duration::from_secs(5),
		}
	}

	pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
		self.ack_timeout = ack_timeout;
		self
	}
}

impl CommandChannel for NatsCommandChannel {
	async fn publish(&self, command: &Command) -> Result<(), ChannelError> {
		let payload = command.encode()?;

		let ack = self.jetstream.publish(self.subject.clone(), payload.into()).await?;

		ack.into_future()
			.timeout(self.ack_timeout)
			.await
			.map_err(|_| ChannelError::Unavailable(format!("no publish ack within {:?}", self.ack_timeout)))??;

		tracing::debug!(kind = command.kind(), subject = %self.subject, "published command");

		Ok(())
	}
}

/// Creates the work queue stream that backs the command channel if it does not
/// exist yet.
pub async fn ensure_stream(
	jetstream: &async_nats::jetstream::Context,
	name: &str,
	subject: &str,
) -> anyhow::Result<stream::Stream> {
	jetstream
		.get_or_create_stream(stream::Config {
			name: name.to_owned(),
			subjects: vec![subject.to_owned()],
			retention: RetentionPolicy::WorkQueue,
			..Default::default()
		})
		.await
		.with_context(|| format!("failed to create command stream {name}"))
}
