use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Counts the live clones of a [`Context`] so that a [`Handler`] can wait for
/// every holder to let go after cancelling.
#[derive(Debug)]
struct Tracker(Arc<TrackerState>);

#[derive(Debug)]
struct TrackerState {
	stopping: AtomicBool,
	active: AtomicUsize,
	notify: tokio::sync::Notify,
}

impl TrackerState {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			stopping: AtomicBool::new(false),
			active: AtomicUsize::new(0),
			notify: tokio::sync::Notify::new(),
		})
	}

	fn track(self: &Arc<Self>) -> Tracker {
		self.active.fetch_add(1, Ordering::Relaxed);
		Tracker(self.clone())
	}

	async fn wait(&self) {
		let notified = self.notify.notified();

		if self.active.load(Ordering::Relaxed) == 0 {
			return;
		}

		notified.await;
	}
}

impl Clone for Tracker {
	fn clone(&self) -> Self {
		self.0.track()
	}
}

impl Drop for Tracker {
	fn drop(&mut self) {
		if self.0.active.fetch_sub(1, Ordering::Relaxed) == 1 && self.0.stopping.load(Ordering::Relaxed) {
			self.0.notify.notify_waiters();
		}
	}
}

/// A cancellation scope shared by every task spawned on behalf of a process.
///
/// Cloning a context registers another holder with its [`Handler`];
/// [`Handler::shutdown`] resolves once all holders have been dropped.
#[derive(Clone, Debug)]
pub struct Context {
	token: CancellationToken,
	trackers: Vec<Tracker>,
}

impl Context {
	#[must_use]
	pub fn new() -> (Self, Handler) {
		let handler = Handler::new();
		(handler.context(), handler)
	}

	/// Creates a nested scope. Cancelling the parent cancels the child, while
	/// the child's handler only waits on holders of the child.
	#[must_use]
	pub fn new_child(&self) -> (Self, Handler) {
		let token = self.token.child_token();
		let state = TrackerState::new();

		let mut trackers = self.trackers.clone();
		trackers.push(state.track());

		(
			Self {
				token: token.clone(),
				trackers,
			},
			Handler {
				token: CancelOnDrop(token),
				state,
			},
		)
	}

	pub async fn done(&self) {
		self.token.cancelled().await;
	}

	pub async fn into_done(self) {
		self.done().await;
	}

	#[must_use]
	pub fn is_done(&self) -> bool {
		self.token.is_cancelled()
	}
}

#[derive(Debug)]
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
	fn drop(&mut self) {
		self.0.cancel();
	}
}

#[derive(Debug)]
pub struct Handler {
	token: CancelOnDrop,
	state: Arc<TrackerState>,
}

impl Default for Handler {
	fn default() -> Self {
		Self::new()
	}
}

impl Handler {
	#[must_use]
	pub fn new() -> Self {
		Self {
			token: CancelOnDrop(CancellationToken::new()),
			state: TrackerState::new(),
		}
	}

	#[must_use]
	pub fn context(&self) -> Context {
		Context {
			token: self.token.0.child_token(),
			trackers: vec![self.state.track()],
		}
	}

	pub fn cancel(&self) {
		self.token.0.cancel();
	}

	/// Cancels every context created from this handler and waits until all of
	/// them have been dropped.
	pub async fn shutdown(&self) {
		self.state.stopping.store(true, Ordering::Relaxed);
		self.cancel();
		self.state.wait().await;
	}
}

pub trait ContextExt {
	/// Races the future against the context. Resolves to `None` when the
	/// context is cancelled first.
	fn context(self, ctx: Context) -> FutureWithContext<Self>
	where
		Self: Sized;
}

impl<F: Future> ContextExt for F {
	fn context(self, ctx: Context) -> FutureWithContext<Self> {
		FutureWithContext {
			future: self,
			_trackers: ctx.trackers,
			cancelled: Box::pin(ctx.token.cancelled_owned()),
		}
	}
}

#[pin_project::pin_project]
pub struct FutureWithContext<F> {
	#[pin]
	future: F,
	_trackers: Vec<Tracker>,
	cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<F: Future> Future for FutureWithContext<F> {
	type Output = Option<F::Output>;

	fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
		let this = self.project();

		if let Poll::Ready(v) = this.future.poll(cx) {
			return Poll::Ready(Some(v));
		}

		match this.cancelled.as_mut().poll(cx) {
			Poll::Ready(()) => Poll::Ready(None),
			Poll::Pending => Poll::Pending,
		}
	}
}
