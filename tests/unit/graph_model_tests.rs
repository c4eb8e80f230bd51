use relgraph::config::DataSourceInfo;
use relgraph::database_schema::InheritanceDescriptor;
use relgraph::graph_model::{DefaultNameResolver, SchemaMapper};

use crate::fixtures::{
    column, employee_tables, film_tables, foreign_key, person_hierarchy_tables, table,
    MockIntrospector,
};

async fn build_mapper(
    tables: Vec<relgraph::database_schema::TableMetadata>,
    datasource: &DataSourceInfo,
) -> SchemaMapper {
    let introspector = MockIntrospector::new(tables);
    SchemaMapper::build(&introspector, datasource, &DefaultNameResolver)
        .await
        .unwrap()
}

#[tokio::test]
async fn derives_vertex_and_edge_types_with_default_naming() {
    let mapper = build_mapper(employee_tables(), &DataSourceInfo::default()).await;

    let employee = mapper.model.vertex_type("Employee").unwrap();
    let names: Vec<&str> = employee.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["id", "firstName", "countryId", "managerId"]);
    assert!(employee.properties[0].from_primary_key);
    assert!(!employee.properties[1].from_primary_key);

    assert!(mapper.model.edge_type("HasCountry").is_some());
    assert!(mapper.model.edge_type("HasEmployee").is_some());
    assert!(employee.out_edges.contains(&"HasCountry".to_string()));
    assert!(employee.out_edges.contains(&"HasEmployee".to_string()));
    let country = mapper.model.vertex_type("Country").unwrap();
    assert!(country.in_edges.contains(&"HasCountry".to_string()));

    assert_eq!(mapper.model.vertex_count(), 2);
    assert_eq!(mapper.model.edge_count(), 2);
}

#[tokio::test]
async fn relationships_to_one_parent_collapse_onto_one_edge() {
    let mut tables = employee_tables();
    tables.push(table(
        "OFFICE",
        vec![
            column("ID", "INTEGER", 1),
            column("COUNTRY_ID", "INTEGER", 2),
        ],
        &["ID"],
        vec![foreign_key(&["COUNTRY_ID"], "COUNTRY", &["ID"])],
    ));
    let mapper = build_mapper(tables, &DataSourceInfo::default()).await;

    assert!(mapper.model.edge_type("HasCountry").is_some());
    let collapsed = mapper.model.relationships_for_edge("HasCountry");
    assert_eq!(collapsed.len(), 2);
    let holders: Vec<&str> = collapsed.iter().map(|r| r.foreign_entity.as_str()).collect();
    assert_eq!(holders, vec!["EMPLOYEE", "OFFICE"]);
}

#[tokio::test]
async fn aggregation_folds_join_table_into_an_edge() {
    let mapper = build_mapper(film_tables(), &DataSourceInfo::default()).await;

    assert!(mapper.model.vertex_type("FilmActor").is_none());
    assert!(mapper.vertex_for_entity("FILM_ACTOR").is_none());

    let edge = mapper.model.edge_type("FilmActor").unwrap();
    assert!(edge.is_aggregator_edge);
    let properties: Vec<&str> = edge.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(properties, vec!["role"]);

    assert_eq!(mapper.model.aggregator_edges().count(), 1);
    let aggregator = mapper.model.aggregator_for_table("FILM_ACTOR").unwrap();
    assert_eq!(aggregator.from_vertex, "Film");
    assert_eq!(aggregator.to_vertex, "Actor");
    assert_eq!(aggregator.edge_type, "FilmActor");

    let film = mapper.model.vertex_type("Film").unwrap();
    assert!(film.out_edges.contains(&"FilmActor".to_string()));
    let actor = mapper.model.vertex_type("Actor").unwrap();
    assert!(actor.in_edges.contains(&"FilmActor".to_string()));
}

#[tokio::test]
async fn disabled_aggregation_keeps_the_join_vertex() {
    let datasource = DataSourceInfo {
        aggregation_enabled: false,
        ..Default::default()
    };
    let mapper = build_mapper(film_tables(), &datasource).await;

    assert!(mapper.model.vertex_type("FilmActor").is_some());
    assert!(mapper.model.edge_type("HasFilm").is_some());
    assert!(mapper.model.edge_type("HasActor").is_some());
    assert!(mapper.model.aggregator_for_table("FILM_ACTOR").is_none());
}

#[tokio::test]
async fn class_mapper_round_trips_names() {
    let mapper = build_mapper(employee_tables(), &DataSourceInfo::default()).await;

    let class_mapper = mapper.class_mapper("EMPLOYEE").unwrap();
    assert_eq!(
        class_mapper.property_for_attribute("FIRST_NAME"),
        Some("firstName")
    );
    assert_eq!(
        class_mapper.attribute_for_property("firstName"),
        Some("FIRST_NAME")
    );
    assert_eq!(class_mapper.vertex_type_name, "Employee");
}

#[tokio::test]
async fn hierarchy_vertices_inherit_properties_from_ancestors() {
    let datasource = DataSourceInfo {
        inheritance: Some(
            InheritanceDescriptor::from_yaml_str(
                r#"
hierarchies:
  - pattern: table-per-type
    root: PERSON
    children:
      - name: EMPLOYEE
        children:
          - name: MANAGER
"#,
            )
            .unwrap(),
        ),
        ..Default::default()
    };
    let mapper = build_mapper(person_hierarchy_tables(), &datasource).await;

    let employee = mapper.model.vertex_type("Employee").unwrap();
    assert_eq!(employee.parent_type.as_deref(), Some("Person"));
    let inherited: Vec<&str> = employee
        .inherited_properties
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(inherited, vec!["id", "name", "countryId"]);

    // The child vertex surfaces the synthesized parent join and the
    // ancestor's own edges among its out-edges
    assert!(employee.out_edges.contains(&"HasPerson".to_string()));
    assert!(employee.out_edges.contains(&"HasCountry".to_string()));

    // Inherited columns resolve through the ancestor's class mapper
    let manager = mapper.schema.entity("MANAGER").unwrap();
    assert_eq!(mapper.property_for_attribute(manager, "NAME"), Some("name"));
    assert_eq!(mapper.property_for_attribute(manager, "BONUS"), Some("bonus"));
    assert_eq!(mapper.property_for_attribute(manager, "MISSING"), None);
}

#[tokio::test]
async fn discriminated_hierarchy_children_share_ancestor_edges() {
    let datasource = DataSourceInfo {
        inheritance: Some(
            InheritanceDescriptor::from_yaml_str(
                r#"
hierarchies:
  - pattern: table-per-hierarchy
    root: PERSON
    discriminator_column: TYPE
    discriminator_value: person
    children:
      - name: EMPLOYEE
        discriminator_value: employee
"#,
            )
            .unwrap(),
        ),
        ..Default::default()
    };
    let mapper = build_mapper(person_hierarchy_tables(), &datasource).await;

    let person = mapper.model.vertex_type("Person").unwrap();
    assert!(person.out_edges.contains(&"HasCountry".to_string()));

    // No joins are synthesized under a discriminator, but the ancestor's
    // edge is still reachable from the child vertex
    let employee = mapper.model.vertex_type("Employee").unwrap();
    assert!(employee.out_edges.contains(&"HasCountry".to_string()));
    assert!(mapper.model.edge_type("HasPerson").is_none());
}
