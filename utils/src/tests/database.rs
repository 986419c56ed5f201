use crate::database::query;

#[test]
fn test_query_builder_binds_in_order() {
	let mut qb = query("SELECT id FROM users WHERE id = ANY($1) AND created_at < $2");
	qb.bind(vec![1_i64, 2, 3]).bind(epoch());

	assert_eq!(qb.sql(), "SELECT id FROM users WHERE id = ANY($1) AND created_at < $2");
	assert_eq!(qb.param_count(), 2);
}

#[test]
fn test_query_builder_empty() {
	let qb = query("SELECT 1");

	assert_eq!(qb.sql(), "SELECT 1");
	assert_eq!(qb.param_count(), 0);
}

fn epoch() -> std::time::SystemTime {
	std::time::SystemTime::UNIX_EPOCH
}
