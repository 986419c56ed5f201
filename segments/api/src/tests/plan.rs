use common::database::Operation;

use crate::store::ChangePlan;

fn strings(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_plan_orders_additions_before_removals() {
	let plan = ChangePlan::new(&[1, 2], &strings(&["a", "b"]), &strings(&["c"]));

	let steps = plan.steps().collect::<Vec<_>>();
	assert_eq!(
		steps,
		vec![
			(Operation::Added, 1, "a"),
			(Operation::Added, 1, "b"),
			(Operation::Added, 2, "a"),
			(Operation::Added, 2, "b"),
			(Operation::Removed, 1, "c"),
			(Operation::Removed, 2, "c"),
		]
	);
}

#[test]
fn test_plan_segment_in_both_lists() {
	let plan = ChangePlan::new(&[7], &strings(&["a"]), &strings(&["a"]));

	assert_eq!(plan.additions, vec![(7, "a".to_string())]);
	assert_eq!(plan.removals, vec![(7, "a".to_string())]);
	assert_eq!(plan.steps().last(), Some((Operation::Removed, 7, "a")));
}

#[test]
fn test_plan_deduplicates() {
	let plan = ChangePlan::new(&[3, 1, 3], &strings(&["x", "x", "y"]), &[]);

	assert_eq!(
		plan.additions,
		vec![
			(3, "x".to_string()),
			(3, "y".to_string()),
			(1, "x".to_string()),
			(1, "y".to_string()),
		]
	);
	assert!(plan.removals.is_empty());
}

#[test]
fn test_plan_empty() {
	assert!(ChangePlan::new(&[], &strings(&["a"]), &strings(&["b"])).is_empty());
	assert!(ChangePlan::new(&[1], &[], &[]).is_empty());
}
