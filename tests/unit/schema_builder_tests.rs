use relgraph::database_schema::DatabaseSchemaBuilder;

use crate::fixtures::{employee_tables, film_tables, MockIntrospector};

#[tokio::test]
async fn builds_entities_with_positions_and_relationships() {
    let introspector = MockIntrospector::new(employee_tables());
    let schema = DatabaseSchemaBuilder::new(&introspector)
        .build(None)
        .await
        .unwrap();

    let country = schema.entity("COUNTRY").unwrap();
    assert_eq!(country.schema_position, 0);
    assert_eq!(country.primary_key.column_names(), vec!["ID"]);
    assert_eq!(country.in_relationships.len(), 1);

    let employee = schema.entity("EMPLOYEE").unwrap();
    assert_eq!(employee.schema_position, 1);
    assert_eq!(employee.out_relationships.len(), 2);
    // Self-referencing key shows up on both sides
    assert_eq!(employee.in_relationships.len(), 1);
    assert_eq!(schema.relationships().len(), 2);
}

#[tokio::test]
async fn include_filter_drops_other_tables_and_their_keys() {
    let introspector = MockIntrospector::new(employee_tables());
    let schema = DatabaseSchemaBuilder::new(&introspector)
        .with_included_tables(Some(vec!["EMPLOYEE".to_string()]))
        .build(None)
        .await
        .unwrap();

    assert!(schema.entity("COUNTRY").is_none());
    let employee = schema.entity("EMPLOYEE").unwrap();
    assert_eq!(employee.schema_position, 0);
    // The foreign key into the filtered table is gone; the
    // self-referencing one survives
    assert_eq!(employee.out_relationships.len(), 1);
    assert_eq!(
        employee.out_relationships[0].parent_entity,
        "EMPLOYEE"
    );
}

#[tokio::test]
async fn exclude_filter_is_case_insensitive() {
    let introspector = MockIntrospector::new(employee_tables());
    let schema = DatabaseSchemaBuilder::new(&introspector)
        .with_excluded_tables(Some(vec!["country".to_string()]))
        .build(None)
        .await
        .unwrap();

    assert!(schema.entity("COUNTRY").is_none());
    assert!(schema.entity("EMPLOYEE").is_some());
}

#[tokio::test]
async fn include_wins_over_exclude() {
    let introspector = MockIntrospector::new(employee_tables());
    let schema = DatabaseSchemaBuilder::new(&introspector)
        .with_included_tables(Some(vec!["EMPLOYEE".to_string()]))
        .with_excluded_tables(Some(vec!["EMPLOYEE".to_string()]))
        .build(None)
        .await
        .unwrap();

    assert!(schema.entity("EMPLOYEE").is_some());
}

#[tokio::test]
async fn pure_join_table_is_marked_aggregable() {
    let introspector = MockIntrospector::new(film_tables());
    let schema = DatabaseSchemaBuilder::new(&introspector)
        .build(None)
        .await
        .unwrap();

    assert!(schema.entity("FILM_ACTOR").unwrap().is_aggregable_join_table);
    assert!(!schema.entity("FILM").unwrap().is_aggregable_join_table);
}

#[tokio::test]
async fn join_table_with_independent_identity_is_not_aggregable() {
    // Same shape but the primary key is a surrogate, not the pair of
    // foreign keys
    let mut tables = film_tables();
    let join = tables
        .iter_mut()
        .find(|t| t.name == "FILM_ACTOR")
        .unwrap();
    join.primary_key.columns = vec!["FILM_ID".to_string()];

    let introspector = MockIntrospector::new(tables);
    let schema = DatabaseSchemaBuilder::new(&introspector)
        .build(None)
        .await
        .unwrap();

    assert!(!schema.entity("FILM_ACTOR").unwrap().is_aggregable_join_table);
}

#[tokio::test]
async fn entity_lookup_ignores_case() {
    let introspector = MockIntrospector::new(employee_tables());
    let schema = DatabaseSchemaBuilder::new(&introspector)
        .build(None)
        .await
        .unwrap();

    assert_eq!(schema.entity_ignore_case("employee").unwrap().name, "EMPLOYEE");
    assert_eq!(schema.entity_at(1).unwrap().name, "EMPLOYEE");
}
