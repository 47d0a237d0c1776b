mod fixtures;

use fixtures::{int, registry, rows, text, try_hydrate_with};
use rowgraph::{
    Entity, Error, HydrationConfig, IterSource, MappingErrorKind, ObjectHydrator, PropertyValue,
    Result, ResultShape, Row, RowSource, Value,
};
use rowgraph_session::{EntityStore, OriginalData};

/// Counts pulls so tests can tell whether hydration touched the source.
struct CountingSource {
    rows: std::vec::IntoIter<Row>,
    pulls: usize,
}

impl CountingSource {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
            pulls: 0,
        }
    }
}

impl RowSource for CountingSource {
    fn pull(&mut self) -> Result<Option<Row>> {
        self.pulls += 1;
        Ok(self.rows.next())
    }
}

fn bind_error(shape: &ResultShape) -> (Error, usize) {
    let registry = registry();
    let mut source = CountingSource::new(rows(&["u_id"], vec![vec![int(1)]]));
    let err = ObjectHydrator::new(&registry)
        .hydrate_all(
            shape,
            &mut source,
            &mut EntityStore::new(),
            &mut OriginalData::new(),
        )
        .expect_err("binding must fail");
    (err, source.pulls)
}

#[test]
fn unknown_class_fails_before_any_pull() {
    let shape = ResultShape::builder()
        .entity("g", "Ghost")
        .field("g", "u_id", "id")
        .build()
        .expect("valid shape");

    let (err, pulls) = bind_error(&shape);
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnknownClass));
    assert_eq!(pulls, 0);
}

#[test]
fn unknown_association_is_a_mapping_error() {
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .joined_entity("x", "Post", "u", "articles")
        .field("x", "x_id", "id")
        .build()
        .expect("valid shape");

    let (err, pulls) = bind_error(&shape);
    assert!(err.is_mapping_error());
    assert!(!err.is_config_error());
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnknownAssociation));
    assert_eq!(pulls, 0);
}

#[test]
fn unselected_identifier_is_rejected() {
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_name", "name")
        .build()
        .expect("valid shape");

    let (err, _) = bind_error(&shape);
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::MissingIdentifier));
}

#[test]
fn unmapped_field_is_rejected() {
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .field("u", "u_mail", "email")
        .build()
        .expect("valid shape");

    let (err, _) = bind_error(&shape);
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnknownField));
}

#[test]
fn source_failure_aborts_the_run() {
    let registry = registry();
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .build()
        .expect("valid shape");
    let mut good = rows(&["u_id"], vec![vec![int(1)]]).into_iter().map(Ok);
    let feed: Vec<Result<Row>> = vec![
        good.next().expect("one row"),
        Err(Error::source_failure("cursor lost", "server closed the connection")),
    ];

    let mut store = EntityStore::new();
    let err = ObjectHydrator::new(&registry)
        .hydrate_all(
            &shape,
            &mut IterSource::new(feed),
            &mut store,
            &mut OriginalData::new(),
        )
        .expect_err("source error propagates");

    assert!(err.is_source_error());
    assert!(err.to_string().contains("cursor lost"));
    // The row pulled before the failure was still materialized.
    assert_eq!(store.len(), 1);
}

#[test]
fn null_index_value_is_rejected_during_hydration() {
    let registry = registry();
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .joined_entity("p", "Post", "u", "posts")
        .field("p", "p_id", "id")
        .field("p", "p_slug", "slug")
        .index_by("p", "slug")
        .build()
        .expect("valid shape");

    let err = try_hydrate_with(
        &registry,
        &shape,
        rows(
            &["u_id", "p_id", "p_slug"],
            vec![
                vec![int(1), int(10), text("intro")],
                vec![int(1), int(11), Value::Null],
            ],
        ),
        HydrationConfig::default(),
    )
    .err()
    .expect("null index value fails");
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::InvalidIndexField));
}

#[test]
fn shape_loads_from_json() {
    let registry = registry();
    let shape = ResultShape::from_json(
        r#"{
            "aliases": [
                {"alias": "e", "class": "Parent"},
                {"alias": "c", "class": "Child", "parent": "e", "relation": "children"}
            ],
            "columns": [
                {"kind": "field", "column": "id", "alias": "e", "field": "id"},
                {"kind": "field", "column": "child_id", "alias": "c", "field": "id"},
                {"kind": "scalar", "column": "n", "name": "total"}
            ]
        }"#,
    )
    .expect("valid json shape");
    assert!(shape.is_mixed());

    let run = try_hydrate_with(
        &registry,
        &shape,
        rows(
            &["id", "child_id", "n"],
            vec![vec![int(1), int(10), int(2)], vec![int(1), int(11), int(2)]],
        ),
        HydrationConfig::default(),
    )
    .expect("hydration succeeds");
    assert_eq!(run.hydration.result.len(), 1);
    let parent = run.roots()[0];
    assert_eq!(run.member_ids(parent, "children"), vec![int(10), int(11)]);
}

#[test]
fn inconsistent_json_shape_is_a_config_error() {
    let err = ResultShape::from_json(
        r#"{
            "aliases": [
                {"alias": "c", "class": "Child", "parent": "e", "relation": "children"},
                {"alias": "e", "class": "Parent"}
            ],
            "columns": []
        }"#,
    )
    .expect_err("child declared before parent");
    assert!(matches!(err, Error::Config(_)));
    assert!(err.is_config_error());
    assert!(!err.is_mapping_error());

    let malformed = ResultShape::from_json("{\"aliases\": 3}").expect_err("not a shape");
    assert!(matches!(malformed, Error::Serde(_)));
}

/// A user type that only knows its scalar fields.
#[derive(Debug, Default)]
struct ScalarOnlyUser {
    id: Option<Value>,
    name: Option<Value>,
}

impl Entity for ScalarOnlyUser {
    fn class_name(&self) -> &str {
        "User"
    }

    fn get(&self, field: &str) -> Option<PropertyValue> {
        match field {
            "id" => self.id.clone().map(PropertyValue::Scalar),
            "name" => self.name.clone().map(PropertyValue::Scalar),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: PropertyValue) -> Result<()> {
        match field {
            "id" => self.id = Some(value.into_scalar(field)?),
            "name" => self.name = Some(value.into_scalar(field)?),
            _ => {
                return Err(Error::mapping(
                    MappingErrorKind::UnknownField,
                    "User",
                    field,
                    "no such field",
                ));
            }
        }
        Ok(())
    }
}

#[test]
fn rejected_property_is_not_recorded_as_original() {
    let registry = registry();
    let shape = ResultShape::builder()
        .entity("u", "User")
        .field("u", "u_id", "id")
        .joined_entity("pr", "Profile", "u", "profile")
        .field("pr", "pr_id", "id")
        .build()
        .expect("valid shape");
    let mut store =
        EntityStore::new().with_constructor("User", || Box::new(ScalarOnlyUser::default()));
    let mut originals = OriginalData::new();

    let err = ObjectHydrator::new(&registry)
        .hydrate_all(
            &shape,
            &mut rows(&["u_id", "pr_id"], vec![vec![int(1), Value::Null]]).into_iter(),
            &mut store,
            &mut originals,
        )
        .expect_err("profile cannot be stored");

    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnknownField));
    assert!(originals.is_empty());
}
