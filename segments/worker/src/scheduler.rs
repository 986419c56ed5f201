//! Deferred revocations.
//!
//! Every scheduled command runs as its own task that sleeps until the
//! deadline and then removes the segments. Nothing is persisted: commands
//! still waiting when the process stops are dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::command::RevokeSegments;
use segments_api::store::MembershipStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use utils::context::{Context, ContextExt};

/// Longest single sleep. Deadlines further out are approached in steps so a
/// wall clock change is noticed within this bound.
pub const MAX_SLEEP: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationState {
	Received,
	Waiting,
	Firing,
	Done,
	Failed,
	Cancelled,
}

impl RevocationState {
	pub const fn is_finished(&self) -> bool {
		matches!(self, Self::Done | Self::Failed | Self::Cancelled)
	}
}

pub struct Scheduler<S> {
	store: Arc<S>,
	ctx: Context,
	max_sleep: Duration,
}

impl<S: MembershipStore + 'static> Scheduler<S> {
	pub fn new(store: Arc<S>, ctx: Context) -> Self {
		Self {
			store,
			ctx,
			max_sleep: MAX_SLEEP,
		}
	}

	pub fn with_max_sleep(mut self, max_sleep: Duration) -> Self {
		self.max_sleep = max_sleep;
		self
	}

	/// Starts waiting for `command.fire_at`. Deadlines in the past fire right
	/// away.
	pub fn schedule(&self, command: RevokeSegments) -> ScheduledRevocation {
		let state = Arc::new(watch::channel(RevocationState::Received).0);

		tracing::debug!(
			users = ?command.users,
			segments = ?command.segments,
			fire_at = %command.fire_at,
			"scheduled revocation"
		);

		let task = tokio::spawn(run(
			self.store.clone(),
			self.ctx.clone(),
			command,
			state.clone(),
			self.max_sleep,
		));

		ScheduledRevocation { state, task }
	}
}

/// Handle to one pending revocation. Dropping it leaves the revocation
/// running.
pub struct ScheduledRevocation {
	state: Arc<watch::Sender<RevocationState>>,
	task: JoinHandle<()>,
}

impl ScheduledRevocation {
	pub fn state(&self) -> RevocationState {
		*self.state.borrow()
	}

	/// Cancels the revocation unless it already started firing. Returns
	/// whether it was cancelled.
	pub fn abort(&self) -> bool {
		let cancelled = self.state.send_if_modified(|state| {
			if matches!(state, RevocationState::Received | RevocationState::Waiting) {
				*state = RevocationState::Cancelled;
				true
			} else {
				false
			}
		});

		if cancelled {
			self.task.abort();
			tracing::debug!("revocation aborted");
		}

		cancelled
	}

	/// Waits until the revocation reached a final state.
	pub async fn finished(&self) -> RevocationState {
		let mut rx = self.state.subscribe();
		// The sender lives in `self`, so the channel cannot close here.
		let state = match rx.wait_for(RevocationState::is_finished).await {
			Ok(state) => *state,
			Err(_) => self.state(),
		};
		state
	}

	pub async fn join(self) -> RevocationState {
		if let Err(err) = self.task.await {
			if err.is_panic() {
				tracing::error!("revocation task panicked: {err}");
				self.state.send_replace(RevocationState::Failed);
			}
		}

		*self.state.borrow()
	}
}

async fn run<S: MembershipStore>(
	store: Arc<S>,
	ctx: Context,
	command: RevokeSegments,
	state: Arc<watch::Sender<RevocationState>>,
	max_sleep: Duration,
) {
	if command.fire_at > Utc::now() {
		state.send_if_modified(|state| advance(state, RevocationState::Waiting));
	}

	if sleep_until(command.fire_at, max_sleep).context(ctx.clone()).await.is_none() {
		tracing::warn!(
			users = ?command.users,
			segments = ?command.segments,
			fire_at = %command.fire_at,
			"shutting down, dropping pending revocation"
		);
		state.send_if_modified(|state| advance(state, RevocationState::Cancelled));
		return;
	}

	if !state.send_if_modified(|state| advance(state, RevocationState::Firing)) {
		return;
	}

	let next = match store.apply_changes(&command.users, &[], &command.segments).await {
		Ok(()) => {
			tracing::info!(users = ?command.users, segments = ?command.segments, "revoked segments");
			RevocationState::Done
		}
		Err(err) => {
			tracing::error!(
				users = ?command.users,
				segments = ?command.segments,
				error = %err,
				"failed to revoke segments"
			);
			RevocationState::Failed
		}
	};

	state.send_replace(next);

	// Shutdown waits for firings that already started.
	drop(ctx);
}

/// Moves to `next` unless the revocation was cancelled in the meantime.
fn advance(state: &mut RevocationState, next: RevocationState) -> bool {
	if *state == RevocationState::Cancelled {
		return false;
	}

	*state = next;
	true
}

async fn sleep_until(deadline: DateTime<Utc>, max_sleep: Duration) {
	while let Some(remaining) = remaining(deadline) {
		tokio::time::sleep(remaining.min(max_sleep)).await;
	}
}

/// Time left until `deadline`, `None` once it has passed.
pub fn remaining(deadline: DateTime<Utc>) -> Option<Duration> {
	(deadline - Utc::now()).to_std().ok().filter(|left| !left.is_zero())
}
