use std::time::Duration;

use crate::context::{Context, ContextExt};
use crate::prelude::FutureTimeout;

#[tokio::test]
async fn test_context_cancel() {
	let (ctx, handler) = Context::new();

	let handle = tokio::spawn(async move {
		ctx.done().await;
		assert!(ctx.is_done());
	});

	handler.cancel();
	handle
		.timeout(Duration::from_millis(300))
		.await
		.expect("task should be cancelled")
		.expect("panic in task");
}

#[tokio::test]
async fn test_context_cancel_on_drop() {
	let (ctx, handler) = Context::new();

	let handle = tokio::spawn(async move {
		assert!(!ctx.is_done());
		ctx.done().await;
	});

	tokio::time::sleep(Duration::from_millis(50)).await;

	drop(handler);
	handle
		.timeout(Duration::from_millis(300))
		.await
		.expect("task should be cancelled")
		.expect("panic in task");
}

#[tokio::test]
async fn test_handler_shutdown_waits_for_holders() {
	let (ctx, handler) = Context::new();
	let (tx, mut rx) = tokio::sync::mpsc::channel(1);

	tokio::spawn(async move {
		ctx.done().await;
		tokio::time::sleep(Duration::from_millis(50)).await;
		tx.send(()).await.ok();
		drop(ctx);
	});

	handler
		.shutdown()
		.timeout(Duration::from_millis(300))
		.await
		.expect("shutdown should finish");

	assert!(rx.try_recv().is_ok(), "shutdown returned before the holder dropped");
}

#[tokio::test]
async fn test_child_cancelled_by_parent() {
	let (parent, parent_handler) = Context::new();
	let (child, child_handler) = parent.new_child();
	drop(parent);

	let handle = tokio::spawn(async move {
		child.into_done().await;
	});

	parent_handler.cancel();
	handle
		.timeout(Duration::from_millis(300))
		.await
		.expect("child should be cancelled")
		.expect("panic in task");

	child_handler
		.shutdown()
		.timeout(Duration::from_millis(300))
		.await
		.expect("child shutdown should finish");
}

#[tokio::test]
async fn test_future_with_context() {
	let (ctx, handler) = Context::new();

	let value = async { 42 }.context(ctx.clone()).await;
	assert_eq!(value, Some(42));

	handler.cancel();

	let value = std::future::pending::<()>().context(ctx).await;
	assert!(value.is_none());
}
