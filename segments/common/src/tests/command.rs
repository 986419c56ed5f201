use chrono::{TimeZone, Utc};

use crate::command::{Command, ExportStats, RevokeSegments};

#[test]
fn test_decode_revoke_multi_user() {
	let payload = br#"{"kind":"revoke_segments","fire_at":"2024-01-02T03:04:05Z","users":[1,2],"segments":["a","b"]}"#;

	let command = Command::decode(payload).unwrap();
	assert_eq!(
		command,
		Command::RevokeSegments(RevokeSegments {
			users: vec![1, 2],
			segments: vec!["a".into(), "b".into()],
			fire_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
		})
	);
}

#[test]
fn test_decode_revoke_single_user_with_time_alias() {
	let payload = br#"{"kind":"revoke_segments","time":"2024-01-02T03:04:05+02:00","user":7,"segments":["promo"]}"#;

	let Command::RevokeSegments(revoke) = Command::decode(payload).unwrap() else {
		panic!("expected a revoke command");
	};

	assert_eq!(revoke.users, vec![7]);
	assert_eq!(revoke.segments, vec!["promo".to_string()]);
	assert_eq!(revoke.fire_at, Utc.with_ymd_and_hms(2024, 1, 2, 1, 4, 5).unwrap());
}

#[test]
fn test_decode_revoke_local_time() {
	let payload = br#"{"kind":"revoke_segments","fire_at":"2024-06-01 12:30:00","users":[1],"segments":["a"]}"#;

	let Command::RevokeSegments(revoke) = Command::decode(payload).unwrap() else {
		panic!("expected a revoke command");
	};

	let expected = chrono::Local
		.with_ymd_and_hms(2024, 6, 1, 12, 30, 0)
		.earliest()
		.unwrap()
		.with_timezone(&Utc);
	assert_eq!(revoke.fire_at, expected);
}

#[test]
fn test_decode_revoke_merges_user_forms() {
	let payload = br#"{"kind":"revoke_segments","fire_at":"2024-01-02T03:04:05Z","user":3,"users":[1,3],"segments":["a"]}"#;

	let Command::RevokeSegments(revoke) = Command::decode(payload).unwrap() else {
		panic!("expected a revoke command");
	};

	assert_eq!(revoke.users, vec![1, 3]);
}

#[test]
fn test_decode_revoke_rejects_bad_payloads() {
	let cases: &[&[u8]] = &[
		br#"{"kind":"revoke_segments","fire_at":"2024-01-02T03:04:05Z","segments":["a"]}"#,
		br#"{"kind":"revoke_segments","fire_at":"2024-01-02T03:04:05Z","users":[1],"segments":[]}"#,
		br#"{"kind":"revoke_segments","fire_at":"next tuesday","users":[1],"segments":["a"]}"#,
		br#"{"kind":"revoke_segments","users":[1],"segments":["a"]}"#,
		b"not json",
	];

	for payload in cases {
		assert!(
			Command::decode(payload).is_err(),
			"payload should be rejected: {}",
			String::from_utf8_lossy(payload)
		);
	}
}

#[test]
fn test_decode_unknown_kind() {
	let command = Command::decode(br#"{"kind":"reticulate_splines","count":3}"#).unwrap();
	assert_eq!(command, Command::Unknown);
	assert_eq!(command.kind(), "unknown");
}

#[test]
fn test_export_stats_wire_format() {
	let command = Command::ExportStats(ExportStats {
		year: 2023,
		month: 8,
		file_name: "user_segments_2023_08_01.csv".into(),
	});

	let value: serde_json::Value = serde_json::from_slice(&command.encode().unwrap()).unwrap();
	assert_eq!(
		value,
		serde_json::json!({
			"kind": "export_stats",
			"year": 2023,
			"month": 8,
			"file_name": "user_segments_2023_08_01.csv",
		})
	);
}

#[test]
fn test_encoded_revoke_decodes() {
	let command = Command::RevokeSegments(RevokeSegments {
		users: vec![10, 11],
		segments: vec!["beta".into()],
		fire_at: Utc.with_ymd_and_hms(2030, 5, 6, 7, 8, 9).unwrap(),
	});

	let encoded = command.encode().unwrap();
	let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
	assert_eq!(value["kind"], "revoke_segments");
	assert_eq!(value["users"], serde_json::json!([10, 11]));

	assert_eq!(Command::decode(&encoded).unwrap(), command);
}
