use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Datelike, Duration, Local, Utc};
use common::command::{Command, ExportStats};
use common::database::Operation;

use super::fakes::{MemoryStore, RecordingChannel};
use crate::error::ServiceError;
use crate::service::{ChangeSegments, CreateSegment, MembershipService};

type Service = MembershipService<Arc<MemoryStore>, Arc<MemoryStore>, Arc<RecordingChannel>>;

fn setup() -> (Service, Arc<MemoryStore>, Arc<RecordingChannel>) {
	let store = Arc::new(MemoryStore::new());
	let channel = Arc::new(RecordingChannel::new());
	let service = MembershipService::new(store.clone(), store.clone(), channel.clone());
	(service, store, channel)
}

fn strings(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_change_segments_validation() {
	let (service, store, channel) = setup();
	let user = store.add_user("alice");
	store.add_segment("a");

	let cases = [
		ChangeSegments {
			users: vec![],
			add: strings(&["a"]),
			..Default::default()
		},
		ChangeSegments {
			users: vec![user],
			..Default::default()
		},
		ChangeSegments {
			users: vec![user],
			add: strings(&["a"]),
			revoke_at: Some("tomorrow".into()),
			..Default::default()
		},
		ChangeSegments {
			users: vec![user],
			remove: strings(&["a"]),
			revoke_at: Some("2030-01-01T00:00:00Z".into()),
			..Default::default()
		},
	];

	for request in cases {
		let result = service.change_segments(request.clone()).await;
		assert!(matches!(result, Err(ServiceError::Invalid(_))), "{request:?} gave {result:?}");
	}

	assert!(store.events().is_empty());
	assert!(channel.published().is_empty());
}

#[tokio::test]
async fn test_change_segments_unknown_user() {
	let (service, store, _) = setup();
	let user = store.add_user("alice");
	store.add_segment("a");

	let result = service
		.change_segments(ChangeSegments {
			users: vec![user, 42],
			add: strings(&["a"]),
			..Default::default()
		})
		.await;

	match result {
		Err(ServiceError::NotFound(msg)) => assert!(msg.contains("42"), "{msg}"),
		other => panic!("expected not found, got {other:?}"),
	}
	assert!(store.events().is_empty());
}

#[tokio::test]
async fn test_change_segments_applies_in_order() {
	let (service, store, channel) = setup();
	let alice = store.add_user("alice");
	let bob = store.add_user("bob");
	store.add_segment("a");
	store.add_segment("b");

	service
		.change_segments(ChangeSegments {
			users: vec![alice, bob],
			add: strings(&["a", "b"]),
			..Default::default()
		})
		.await
		.unwrap();

	service
		.change_segments(ChangeSegments {
			users: vec![alice],
			add: vec![],
			remove: strings(&["a", "missing"]),
			revoke_at: None,
		})
		.await
		.unwrap();

	assert_eq!(
		store.events(),
		vec![
			(alice, "a".to_string(), Operation::Added),
			(alice, "b".to_string(), Operation::Added),
			(bob, "a".to_string(), Operation::Added),
			(bob, "b".to_string(), Operation::Added),
			(alice, "a".to_string(), Operation::Removed),
			(alice, "missing".to_string(), Operation::Removed),
		]
	);
	assert_eq!(service.current_segments(alice).await.unwrap(), strings(&["b"]));
	assert_eq!(service.current_segments(bob).await.unwrap(), strings(&["a", "b"]));
	assert!(channel.published().is_empty());
}

#[tokio::test]
async fn test_change_segments_add_and_remove_same_segment() {
	let (service, store, _) = setup();
	let user = store.add_user("alice");
	store.add_segment("a");

	service
		.change_segments(ChangeSegments {
			users: vec![user],
			add: strings(&["a"]),
			remove: strings(&["a"]),
			revoke_at: None,
		})
		.await
		.unwrap();

	assert!(store.memberships().is_empty());
	assert_eq!(
		store.events(),
		vec![
			(user, "a".to_string(), Operation::Added),
			(user, "a".to_string(), Operation::Removed),
		]
	);
}

#[tokio::test]
async fn test_change_segments_constraint_errors_roll_back() {
	let (service, store, _) = setup();
	let user = store.add_user("alice");
	store.add_segment("a");

	let result = service
		.change_segments(ChangeSegments {
			users: vec![user],
			add: strings(&["a", "ghost"]),
			..Default::default()
		})
		.await;
	assert!(matches!(result, Err(ServiceError::NotFound(_))), "{result:?}");
	assert!(store.events().is_empty());
	assert!(store.memberships().is_empty());

	let add = ChangeSegments {
		users: vec![user],
		add: strings(&["a"]),
		..Default::default()
	};
	service.change_segments(add.clone()).await.unwrap();

	let result = service.change_segments(add).await;
	assert!(matches!(result, Err(ServiceError::AlreadyExists(_))), "{result:?}");
	assert_eq!(store.events().len(), 1);
}

#[tokio::test]
async fn test_change_segments_queues_revocation() {
	let (service, store, channel) = setup();
	let alice = store.add_user("alice");
	let bob = store.add_user("bob");
	store.add_segment("a");

	service
		.change_segments(ChangeSegments {
			users: vec![alice, bob],
			add: strings(&["a"]),
			remove: vec![],
			revoke_at: Some("2030-01-01T00:00:00Z".into()),
		})
		.await
		.unwrap();

	let published = channel.published();
	assert_eq!(published.len(), 1);

	let Command::RevokeSegments(revoke) = &published[0] else {
		panic!("expected a revoke command, got {:?}", published[0]);
	};
	assert_eq!(revoke.users, vec![alice, bob]);
	assert_eq!(revoke.segments, strings(&["a"]));
	assert_eq!(revoke.fire_at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
}

#[tokio::test]
async fn test_change_segments_publish_failure_keeps_mutation() {
	let (service, store, channel) = setup();
	let user = store.add_user("alice");
	store.add_segment("a");
	channel.fail.store(true, Ordering::Relaxed);

	let result = service
		.change_segments(ChangeSegments {
			users: vec![user],
			add: strings(&["a"]),
			remove: vec![],
			revoke_at: Some("2030-01-01 10:00:00".into()),
		})
		.await;

	assert!(matches!(result, Err(ServiceError::RevocationNotQueued(_))), "{result:?}");
	assert_eq!(store.memberships(), vec![(user, "a".to_string())]);
}

#[tokio::test]
async fn test_create_segment_with_percent_and_revocation() {
	let (service, store, channel) = setup();
	let users = (0..4).map(|i| store.add_user(&format!("user-{i}"))).collect::<Vec<_>>();

	let created = service
		.create_segment(CreateSegment {
			slug: "promo".into(),
			users: vec![users[3]],
			percent: 50,
			revoke_at: Some("2030-01-01T00:00:00Z".into()),
		})
		.await
		.unwrap();

	assert_eq!(created.segment.slug, "promo");
	// the explicit user plus two sampled ones
	assert_eq!(created.users, vec![users[3], users[0], users[1]]);
	for user in &created.users {
		assert_eq!(service.current_segments(*user).await.unwrap(), strings(&["promo"]));
	}

	let published = channel.published();
	assert_eq!(published.len(), 1);
	let Command::RevokeSegments(revoke) = &published[0] else {
		panic!("expected a revoke command");
	};
	assert_eq!(revoke.users, created.users);
	assert_eq!(revoke.segments, strings(&["promo"]));
}

#[tokio::test]
async fn test_create_segment_errors() {
	let (service, store, _) = setup();
	store.add_user("alice");
	store.add_segment("taken");

	let invalid = [
		CreateSegment {
			slug: " ".into(),
			..Default::default()
		},
		CreateSegment {
			slug: "x".into(),
			percent: 101,
			..Default::default()
		},
		CreateSegment {
			slug: "x".into(),
			revoke_at: Some("soon".into()),
			..Default::default()
		},
	];

	for request in invalid {
		let result = service.create_segment(request).await;
		assert!(matches!(result, Err(ServiceError::Invalid(_))), "{result:?}");
	}
	assert!(!store.segment_exists("x"));

	let result = service
		.create_segment(CreateSegment {
			slug: "taken".into(),
			..Default::default()
		})
		.await;
	assert!(matches!(result, Err(ServiceError::AlreadyExists(_))), "{result:?}");

	let result = service
		.create_segment(CreateSegment {
			slug: "x".into(),
			users: vec![99],
			..Default::default()
		})
		.await;
	assert!(matches!(result, Err(ServiceError::NotFound(_))), "{result:?}");
	assert!(!store.segment_exists("x"));
}

#[tokio::test]
async fn test_create_segment_failure_discards_segment() {
	let (service, store, channel) = setup();
	let alice = store.add_user("alice");
	store.add_user("bob");
	store.fail_sampling.store(true, Ordering::Relaxed);

	let result = service
		.create_segment(CreateSegment {
			slug: "promo".into(),
			users: vec![alice],
			percent: 50,
			revoke_at: Some("2030-01-01T00:00:00Z".into()),
		})
		.await;

	assert!(matches!(result, Err(ServiceError::Internal(_))), "{result:?}");
	assert!(!store.segment_exists("promo"));
	assert!(store.memberships().is_empty());
	assert!(store.events().is_empty());
	assert!(channel.published().is_empty());
	assert!(matches!(
		service.get_segment("promo").await,
		Err(ServiceError::NotFound(_))
	));

	// the slug is free again
	store.fail_sampling.store(false, Ordering::Relaxed);
	let created = service
		.create_segment(CreateSegment {
			slug: "promo".into(),
			users: vec![alice],
			..Default::default()
		})
		.await
		.unwrap();
	assert_eq!(created.users, vec![alice]);
	assert_eq!(service.get_segment("promo").await.unwrap().slug, "promo");
}

#[tokio::test]
async fn test_create_segments_all_or_nothing() {
	let (service, store, _) = setup();
	let user = store.add_user("alice");
	store.add_segment("b");

	let result = service.create_segments(&strings(&["a", "b"]), &[]).await;
	assert!(matches!(result, Err(ServiceError::AlreadyExists(_))), "{result:?}");
	assert!(!store.segment_exists("a"));

	let created = service.create_segments(&strings(&["c", "d"]), &[user]).await.unwrap();
	assert_eq!(created.len(), 2);
	assert_eq!(service.current_segments(user).await.unwrap(), strings(&["c", "d"]));

	assert!(matches!(
		service.create_segments(&[], &[]).await,
		Err(ServiceError::Invalid(_))
	));
}

#[tokio::test]
async fn test_delete_segment_logs_removals() {
	let (service, store, _) = setup();
	let alice = store.add_user("alice");
	let bob = store.add_user("bob");
	service.create_segments(&strings(&["a"]), &[alice, bob]).await.unwrap();

	service.delete_segment("a").await.unwrap();

	assert!(store.memberships().is_empty());
	assert_eq!(
		store.events()[2..],
		[
			(alice, "a".to_string(), Operation::Removed),
			(bob, "a".to_string(), Operation::Removed),
		]
	);

	assert!(matches!(service.delete_segment("a").await, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_user_lifecycle() {
	let (service, store, _) = setup();

	let user = service.create_user("alice").await.unwrap();
	assert_eq!(service.get_user(user.id).await.unwrap(), user);

	assert!(matches!(service.create_user("alice").await, Err(ServiceError::AlreadyExists(_))));
	assert!(matches!(service.create_user("  ").await, Err(ServiceError::Invalid(_))));

	service.create_segments(&strings(&["a"]), &[user.id]).await.unwrap();
	service.delete_user(user.id).await.unwrap();

	assert_eq!(store.events().last(), Some(&(user.id, "a".to_string(), Operation::Removed)));
	assert!(matches!(service.get_user(user.id).await, Err(ServiceError::NotFound(_))));
	assert!(matches!(service.current_segments(user.id).await, Err(ServiceError::NotFound(_))));
	assert!(matches!(service.delete_user(user.id).await, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_stats_for_period() {
	let (service, store, _) = setup();
	let user = store.add_user("alice");
	service.create_segments(&strings(&["a", "b"]), &[user]).await.unwrap();

	let now = Local::now();
	let events = service.stats_for_period(now.year(), now.month()).await.unwrap();
	assert_eq!(events.len(), 2);
	assert!(events.windows(2).all(|pair| pair[0].id < pair[1].id));

	let last_year = service.stats_for_period(now.year() - 1, now.month()).await.unwrap();
	assert!(last_year.is_empty());

	assert!(matches!(service.stats_for_period(2023, 13).await, Err(ServiceError::Invalid(_))));
	assert!(matches!(service.stats_for_period(2023, 0).await, Err(ServiceError::Invalid(_))));
}

#[tokio::test]
async fn test_request_export() {
	let (service, _, channel) = setup();

	let file_name = service.request_export(2023, 8).await.unwrap();
	assert_eq!(file_name, "user_segments_2023_08_01.csv");
	assert_eq!(
		channel.published(),
		vec![Command::ExportStats(ExportStats {
			year: 2023,
			month: 8,
			file_name,
		})]
	);

	assert!(matches!(service.request_export(2023, 13).await, Err(ServiceError::Invalid(_))));

	channel.fail.store(true, Ordering::Relaxed);
	assert!(matches!(service.request_export(2023, 9).await, Err(ServiceError::Internal(_))));
}

#[tokio::test]
async fn test_past_revoke_at_is_accepted() {
	let (service, store, channel) = setup();
	let user = store.add_user("alice");
	store.add_segment("a");

	let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
	service
		.change_segments(ChangeSegments {
			users: vec![user],
			add: strings(&["a"]),
			remove: vec![],
			revoke_at: Some(past),
		})
		.await
		.unwrap();

	assert_eq!(channel.published().len(), 1);
}
