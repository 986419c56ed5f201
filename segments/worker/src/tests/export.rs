use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use common::command::ExportStats;
use common::database::{MembershipEvent, Operation};

use super::store::RecordingStore;
use crate::export::{encode, ExportError, Exporter};

fn local(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
	Local
		.with_ymd_and_hms(year, month, day, hour, 30, 15)
		.earliest()
		.unwrap()
		.with_timezone(&Utc)
}

fn event(id: i64, user_id: i64, segment: &str, operation: Operation, created_at: DateTime<Utc>) -> MembershipEvent {
	MembershipEvent {
		id,
		user_id,
		segment_slug: segment.to_string(),
		operation,
		created_at,
	}
}

fn august_events() -> Vec<MembershipEvent> {
	vec![
		event(1, 1, "beta", Operation::Added, local(2023, 7, 31, 23)),
		event(2, 1, "beta", Operation::Added, local(2023, 8, 1, 12)),
		event(3, 2, "avito_voice", Operation::Added, local(2023, 8, 15, 9)),
		event(4, 1, "beta", Operation::Removed, local(2023, 8, 31, 22)),
		event(5, 2, "beta", Operation::Added, local(2023, 9, 1, 0)),
	]
}

#[test]
fn test_encode_empty_has_header() {
	let csv = String::from_utf8(encode(&[]).unwrap()).unwrap();
	assert_eq!(csv, "user,segment,operation,timestamp\n");
}

#[test]
fn test_encode_rows() {
	let events = vec![
		event(1, 42, "beta", Operation::Added, local(2023, 8, 1, 12)),
		event(2, 42, "beta, gamma", Operation::Removed, local(2023, 8, 2, 7)),
	];

	let csv = String::from_utf8(encode(&events).unwrap()).unwrap();
	let lines = csv.lines().collect::<Vec<_>>();

	assert_eq!(
		lines,
		vec![
			"user,segment,operation,timestamp",
			"42,beta,added,2023-08-01 12:30:15",
			"42,\"beta, gamma\",removed,2023-08-02 07:30:15",
		]
	);
}

#[tokio::test]
async fn test_export_writes_month() {
	let dir = tempfile::tempdir().unwrap();
	let store = Arc::new(RecordingStore::with_events(august_events()));
	let exporter = Exporter::new(store, dir.path().join("exports"));

	let path = exporter
		.export(&ExportStats {
			year: 2023,
			month: 8,
			file_name: common::keys::export_file_name(2023, 8),
		})
		.await
		.unwrap();

	assert_eq!(path, dir.path().join("exports").join("user_segments_2023_08_01.csv"));

	let csv = std::fs::read_to_string(&path).unwrap();
	let lines = csv.lines().collect::<Vec<_>>();
	assert_eq!(
		lines,
		vec![
			"user,segment,operation,timestamp",
			"1,beta,added,2023-08-01 12:30:15",
			"2,avito_voice,added,2023-08-15 09:30:15",
			"1,beta,removed,2023-08-31 22:30:15",
		]
	);

	let leftovers = std::fs::read_dir(dir.path().join("exports")).unwrap().count();
	assert_eq!(leftovers, 1);
}

#[tokio::test]
async fn test_export_replaces_previous_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("user_segments_2023_08_01.csv");
	std::fs::write(&path, "stale").unwrap();

	let exporter = Exporter::new(Arc::new(RecordingStore::new()), dir.path());
	exporter
		.export(&ExportStats {
			year: 2023,
			month: 8,
			file_name: "user_segments_2023_08_01.csv".to_string(),
		})
		.await
		.unwrap();

	assert_eq!(
		std::fs::read_to_string(&path).unwrap(),
		"user,segment,operation,timestamp\n"
	);
}

#[tokio::test]
async fn test_export_rejects_paths() {
	let dir = tempfile::tempdir().unwrap();
	let exporter = Exporter::new(Arc::new(RecordingStore::new()), dir.path());

	for file_name in ["../escape.csv", "nested/file.csv", "", "/tmp/abs.csv"] {
		let err = exporter
			.export(&ExportStats {
				year: 2023,
				month: 8,
				file_name: file_name.to_string(),
			})
			.await
			.unwrap_err();

		assert!(matches!(err, ExportError::InvalidFileName(_)), "{file_name}: {err}");
	}
}

#[tokio::test]
async fn test_export_rejects_invalid_month() {
	let dir = tempfile::tempdir().unwrap();
	let exporter = Exporter::new(Arc::new(RecordingStore::new()), dir.path());

	let err = exporter
		.export(&ExportStats {
			year: 2023,
			month: 13,
			file_name: "user_segments_2023_13_01.csv".to_string(),
		})
		.await
		.unwrap_err();

	assert!(matches!(err, ExportError::Store(_)));
	assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
