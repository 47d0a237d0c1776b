//! Property-based tests for join fan-out.
//!
//! Random parent/child rows, as a LEFT JOIN would produce them, must collapse
//! into distinct parents each holding its distinct children in first-seen
//! order.

mod fixtures;

use fixtures::{hydrate, int, registry, rows, text};
use proptest::prelude::*;
use rowgraph::{ResultShape, Value};

fn parent_children() -> ResultShape {
    ResultShape::builder()
        .entity("e", "Parent")
        .field("e", "id", "id")
        .field("e", "name", "name")
        .joined_entity("c", "Child", "e", "children")
        .field("c", "child_id", "id")
        .build()
        .expect("valid shape")
}

// (parent id, optional child id) pairs; a missing child is an empty outer join.
fn joined_rows() -> impl Strategy<Value = Vec<(i32, Option<i32>)>> {
    prop::collection::vec((0..5i32, prop::option::of(0..8i32)), 0..40)
}

fn first_seen<T: PartialEq + Copy>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

proptest! {
    #[test]
    fn prop_fan_out_collapses_to_distinct_entities(pairs in joined_rows()) {
        let registry = registry();
        let data = pairs
            .iter()
            .map(|(parent, child)| {
                vec![
                    int(*parent),
                    text(&format!("p{parent}")),
                    child.map_or(Value::Null, int),
                ]
            })
            .collect();
        let run = hydrate(&registry, &parent_children(), rows(&["id", "name", "child_id"], data));

        let expected_parents = first_seen(pairs.iter().map(|(p, _)| *p));
        let roots = run.roots();
        let parent_ids: Vec<_> = roots.iter().map(|id| run.scalar(*id, "id")).collect();
        prop_assert_eq!(parent_ids, expected_parents.iter().map(|p| int(*p)).collect::<Vec<_>>());

        for (root, parent) in roots.iter().zip(&expected_parents) {
            let expected_children = first_seen(
                pairs
                    .iter()
                    .filter(|(p, _)| p == parent)
                    .filter_map(|(_, c)| *c),
            );
            prop_assert_eq!(
                run.member_ids(*root, "children"),
                expected_children.into_iter().map(int).collect::<Vec<_>>()
            );

            let collection = run.collection(*root, "children");
            prop_assert!(!collection.borrow().is_hydrating());
            prop_assert!(!collection.borrow().is_dirty());
        }

        prop_assert_eq!(run.hydration.stats.rows, pairs.len());
        prop_assert_eq!(run.hydration.stats.collections, expected_parents.len());
    }
}
