mod fixtures;

use fixtures::{hydrate, int, registry, rows, text, try_hydrate_with};
use rowgraph::{HydrationConfig, KeyValue, ResultItem, ResultShape, Value};

fn users_with_count() -> ResultShape {
    ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .field("u", "u_name", "name")
        .scalar("post_count", "cnt")
        .build()
        .expect("valid shape")
}

#[test]
fn entity_and_scalar_share_a_tuple() {
    let registry = registry();
    let run = hydrate(
        &registry,
        &users_with_count(),
        rows(
            &["u_id", "u_name", "post_count"],
            vec![vec![int(1), text("Ann"), int(3)]],
        ),
    );

    let result = &run.hydration.result;
    assert!(result.is_mixed());
    let tuples = result.tuples();
    assert_eq!(tuples.len(), 1);

    let entries: Vec<_> = tuples[0].items().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, KeyValue::position(0));
    let user = entries[0].1.as_entity().expect("root entity first");
    assert_eq!(run.scalar(user, "name"), text("Ann"));
    assert_eq!(entries[1], (KeyValue::name("cnt"), ResultItem::Scalar(int(3))));
}

#[test]
fn repeated_root_overwrites_its_scalars() {
    let registry = registry();
    let run = hydrate(
        &registry,
        &users_with_count(),
        rows(
            &["u_id", "u_name", "post_count"],
            vec![
                vec![int(1), text("Ann"), int(3)],
                vec![int(1), text("Ann"), int(4)],
            ],
        ),
    );

    let tuples = run.hydration.result.tuples();
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0].scalar("cnt"), Some(&int(4)));
}

#[test]
fn row_without_root_opens_scalar_tuple() {
    let registry = registry();
    let run = hydrate(
        &registry,
        &users_with_count(),
        rows(
            &["u_id", "u_name", "post_count"],
            vec![
                vec![int(1), text("Ann"), int(3)],
                vec![Value::Null, Value::Null, int(9)],
            ],
        ),
    );

    let tuples = run.hydration.result.tuples();
    assert_eq!(tuples.len(), 2);
    assert_eq!(tuples[1].len(), 1);
    assert_eq!(tuples[1].root(), None);
    assert_eq!(tuples[1].scalar("cnt"), Some(&int(9)));
}

#[test]
fn each_distinct_root_opens_its_own_tuple() {
    let registry = registry();
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .entity("pr", "Profile")
        .field("pr", "pr_id", "id")
        .build()
        .expect("valid shape");
    let run = hydrate(
        &registry,
        &shape,
        rows(
            &["u_id", "pr_id"],
            vec![vec![int(1), int(5)], vec![int(1), int(6)]],
        ),
    );

    let result = &run.hydration.result;
    assert!(result.is_mixed());
    assert_eq!(result.len(), 3);
    let ids: Vec<_> = result
        .entities()
        .into_iter()
        .map(|id| run.scalar(id, "id"))
        .collect();
    assert_eq!(ids, vec![int(1), int(5), int(6)]);
}

#[test]
fn compound_query_reuses_seen_roots() {
    let registry = registry();
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .field("u", "u_name", "name")
        .entity("pr", "Profile")
        .field("pr", "pr_id", "id")
        .build()
        .expect("valid shape");
    let run = try_hydrate_with(
        &registry,
        &shape,
        rows(
            &["u_id", "u_name", "pr_id"],
            vec![
                vec![int(1), text("Ann"), int(5)],
                vec![int(1), text("Anna"), int(6)],
            ],
        ),
        HydrationConfig::new().refresh(true),
    )
    .expect("hydration succeeds");

    let user = run.hydration.result.entities()[0];
    // The second row resolves the user from the result, not the factory.
    assert_eq!(run.scalar(user, "name"), text("Ann"));
}

#[test]
fn scalar_only_shape_yields_tuple_per_row() {
    let registry = registry();
    let shape = ResultShape::builder()
        .scalar("total", "n")
        .build()
        .expect("valid shape");
    let run = hydrate(
        &registry,
        &shape,
        rows(&["total"], vec![vec![int(7)], vec![int(8)]]),
    );

    let values: Vec<_> = run
        .hydration
        .result
        .tuples()
        .iter()
        .map(|t| t.scalar("n").cloned())
        .collect();
    assert_eq!(values, vec![Some(int(7)), Some(int(8))]);
    assert!(run.store.is_empty());
}

#[test]
fn indexed_root_keys_its_tuple_entry() {
    let registry = registry();
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .field("u", "u_name", "name")
        .index_by("u", "name")
        .scalar("post_count", "cnt")
        .build()
        .expect("valid shape");
    let run = hydrate(
        &registry,
        &shape,
        rows(
            &["u_id", "u_name", "post_count"],
            vec![vec![int(1), text("Ann"), int(2)]],
        ),
    );

    let tuple = &run.hydration.result.tuples()[0];
    assert_eq!(tuple.root_key(), Some(&KeyValue(text("Ann"))));
    let user = tuple.root().expect("root entity");
    assert_eq!(run.scalar(user, "id"), int(1));
}

#[test]
fn index_value_equal_to_scalar_name_keeps_root() {
    let registry = registry();
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .field("u", "u_name", "name")
        .index_by("u", "name")
        .scalar("cnt", "total")
        .build()
        .expect("valid shape");
    let run = hydrate(
        &registry,
        &shape,
        rows(
            &["u_id", "u_name", "cnt"],
            vec![vec![int(1), text("total"), int(3)]],
        ),
    );

    let result = &run.hydration.result;
    assert_eq!(result.entities().len(), 1);
    let tuple = &result.tuples()[0];
    let user = tuple.root().expect("root survives scalar write");
    assert_eq!(run.scalar(user, "name"), text("total"));
    assert_eq!(tuple.root_key(), Some(&KeyValue(text("total"))));
    assert_eq!(tuple.scalar("total"), Some(&int(3)));
}
