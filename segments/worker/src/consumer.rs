use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_nats::jetstream::consumer::pull::{self, MessagesErrorKind};
use async_nats::jetstream::consumer::PullConsumer;
use common::command::Command;
use futures::{Stream, StreamExt};
use segments_api::store::{MembershipStore, PgMembershipStore};
use tokio::task::JoinHandle;
use utils::context::{Context, ContextExt};

use crate::config::{CommandsConfig, ExportConfig};
use crate::export::Exporter;
use crate::global::WorkerGlobal;
use crate::scheduler::{ScheduledRevocation, Scheduler};

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// What became of one delivered message.
pub enum Dispatched {
	Revocation(ScheduledRevocation),
	/// Resolves to the written file, `None` if the export failed.
	Export(JoinHandle<Option<PathBuf>>),
	Ignored,
	Malformed,
}

/// Routes decoded commands to the scheduler or the exporter. Work is handed
/// off to tasks so a message can be acknowledged as soon as it is dispatched.
pub struct Dispatcher<S> {
	scheduler: Scheduler<S>,
	exporter: Arc<Exporter<S>>,
	ctx: Context,
}

impl<S: MembershipStore + 'static> Dispatcher<S> {
	pub fn new(scheduler: Scheduler<S>, exporter: Exporter<S>, ctx: Context) -> Self {
		Self {
			scheduler,
			exporter: Arc::new(exporter),
			ctx,
		}
	}

	pub fn dispatch(&self, payload: &[u8]) -> Dispatched {
		let command = match Command::decode(payload) {
			Ok(command) => command,
			Err(err) => {
				tracing::warn!(error = %err, payload = %String::from_utf8_lossy(payload), "dropping malformed command");
				return Dispatched::Malformed;
			}
		};

		tracing::debug!(kind = command.kind(), "received command");

		match command {
			Command::RevokeSegments(revoke) => Dispatched::Revocation(self.scheduler.schedule(revoke)),
			Command::ExportStats(request) => {
				let exporter = self.exporter.clone();
				let ctx = self.ctx.clone();

				Dispatched::Export(tokio::spawn(async move {
					let result = exporter.export(&request).await;
					drop(ctx);

					match result {
						Ok(path) => Some(path),
						Err(err) => {
							tracing::error!(
								year = request.year,
								month = request.month,
								file_name = %request.file_name,
								error = %err,
								"failed to export stats"
							);
							None
						}
					}
				}))
			}
			Command::Unknown => {
				tracing::warn!("ignoring command of unknown kind");
				Dispatched::Ignored
			}
		}
	}
}

/// One delivered message that has to be acknowledged once dispatched.
pub trait Delivery: Send {
	fn payload(&self) -> &[u8];

	fn ack(&self) -> impl Future<Output = Result<(), async_nats::Error>> + Send;
}

impl Delivery for async_nats::jetstream::Message {
	fn payload(&self) -> &[u8] {
		&self.payload
	}

	fn ack(&self) -> impl Future<Output = Result<(), async_nats::Error>> + Send {
		async_nats::jetstream::Message::ack(self)
	}
}

/// Errors reported by the message stream.
pub trait StreamFault: std::fmt::Display {
	/// The server missed a heartbeat; the stream itself is still usable.
	fn is_missing_heartbeat(&self) -> bool;
}

impl StreamFault for async_nats::error::Error<MessagesErrorKind> {
	fn is_missing_heartbeat(&self) -> bool {
		matches!(self.kind(), MessagesErrorKind::MissingHeartbeat)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
	Cancelled,
	Closed,
	Failed,
}

/// Dispatches and acknowledges messages until the stream fails, closes or
/// `ctx` is cancelled. A failed ack is logged; the message is redelivered.
pub async fn consume<St, D, E, S>(dispatcher: &Dispatcher<S>, messages: &mut St, ctx: &Context) -> StreamEnd
where
	St: Stream<Item = Result<D, E>> + Unpin,
	D: Delivery,
	E: StreamFault,
	S: MembershipStore + 'static,
{
	loop {
		let message = match messages.next().context(ctx.clone()).await {
			None => return StreamEnd::Cancelled,
			Some(None) => return StreamEnd::Closed,
			Some(Some(Ok(message))) => message,
			Some(Some(Err(err))) if err.is_missing_heartbeat() => {
				tracing::warn!("missing heartbeat");
				continue;
			}
			Some(Some(Err(err))) => {
				tracing::error!(error = %err, "command stream failed");
				return StreamEnd::Failed;
			}
		};

		dispatcher.dispatch(message.payload());

		if let Err(err) = message.ack().await {
			tracing::warn!(error = %err, "failed to ack command, it will be redelivered");
		}
	}
}

/// Pulls commands from the work queue until the global context is cancelled.
pub async fn run<G: WorkerGlobal>(global: Arc<G>) -> anyhow::Result<()> {
	let commands = global.config::<CommandsConfig>();
	let export = global.config::<ExportConfig>();

	let store = Arc::new(PgMembershipStore::new(global.db().clone()));
	let dispatcher = Dispatcher::new(
		Scheduler::new(store.clone(), global.ctx().clone()),
		Exporter::new(store, export.dir.clone()),
		global.ctx().clone(),
	);

	let stream = segments_api::channel::ensure_stream(global.jetstream(), &commands.stream, &commands.subject).await?;

	let consumer = stream
		.get_or_create_consumer(
			&commands.consumer,
			async_nats::jetstream::consumer::pull::Config {
				durable_name: Some(commands.consumer.clone()),
				..Default::default()
			},
		)
		.await
		.context("consumer")?;

	let mut messages = consumer.messages().await.context("messages")?;

	tracing::info!(stream = %commands.stream, consumer = %commands.consumer, "consuming commands");

	loop {
		if consume(&dispatcher, &mut messages, global.ctx()).await == StreamEnd::Cancelled {
			break;
		}

		let Some(resubscribed) = resubscribe(&consumer, global.ctx()).await else {
			break;
		};
		messages = resubscribed;
	}

	Ok(())
}

/// Waits a moment, then opens a new message stream. Retries until it
/// succeeds or `ctx` is cancelled.
async fn resubscribe(consumer: &PullConsumer, ctx: &Context) -> Option<pull::Stream> {
	loop {
		tokio::time::sleep(RESUBSCRIBE_DELAY).context(ctx.clone()).await?;

		match consumer.messages().await {
			Ok(messages) => {
				tracing::info!("resubscribed to commands");
				return Some(messages);
			}
			Err(err) => tracing::warn!(error = %err, "failed to resubscribe to commands"),
		}
	}
}
