use std::sync::Arc;

use serde_json::json;

use relgraph::config::DataSourceInfo;
use relgraph::provider::{ExpandDirection, GraphProvider, ProviderError};

use crate::fixtures::{employee_tables, film_tables, row, MockIntrospector, ScriptedClient};

fn employee_provider(client: ScriptedClient) -> GraphProvider {
    GraphProvider::new(
        Arc::new(MockIntrospector::new(employee_tables())),
        Arc::new(client),
        DataSourceInfo::default(),
    )
}

#[tokio::test]
async fn expand_out_follows_the_foreign_key_through_a_join() {
    let client = ScriptedClient::new()
        // Entered countries with the root's key aliased in
        .on(
            "FROM \"COUNTRY\" e JOIN \"EMPLOYEE\" r",
            vec![row(&[
                ("ID", json!(10)),
                ("NAME", json!("France")),
                ("__root_0", json!(2)),
            ])],
        )
        .on(
            "SELECT \"COUNTRY_ID\", COUNT(*) AS connectionsCount FROM \"EMPLOYEE\"",
            vec![row(&[("connectionsCount", json!(2))])],
        );

    let provider = employee_provider(client);
    let records = provider
        .expand(&["1_2".to_string()], "HasCountry", ExpandDirection::Out, 0)
        .await
        .unwrap();

    assert_eq!(records.nodes.len(), 1);
    let country = &records.nodes[0];
    assert_eq!(country.id, "0_10");
    assert_eq!(country.class, "Country");
    assert_eq!(country.properties.get("name"), Some(&json!("France")));
    assert_eq!(
        country.properties.get("@in"),
        Some(&json!({"HasCountry": 2}))
    );

    assert_eq!(records.edges.len(), 1);
    let edge = &records.edges[0];
    assert_eq!(edge.id, "HasCountry_12_010");
    assert_eq!(edge.class, "HasCountry");
    assert_eq!(edge.source, "1_2");
    assert_eq!(edge.target, "0_10");
    assert!(records.edge_classes.contains_key("HasCountry"));
}

#[tokio::test]
async fn expand_in_filters_the_key_holders_directly() {
    let client = ScriptedClient::new()
        .on(
            "SELECT * FROM \"EMPLOYEE\" WHERE \"COUNTRY_ID\" IN",
            vec![
                row(&[
                    ("ID", json!(1)),
                    ("FIRST_NAME", json!("Ann")),
                    ("COUNTRY_ID", json!(10)),
                    ("MANAGER_ID", json!(null)),
                ]),
                row(&[
                    ("ID", json!(2)),
                    ("FIRST_NAME", json!("Bob")),
                    ("COUNTRY_ID", json!(10)),
                    ("MANAGER_ID", json!(1)),
                ]),
            ],
        )
        .on(
            "FROM \"COUNTRY\"",
            vec![
                row(&[("connectionsCount", json!(1))]),
                row(&[("connectionsCount", json!(1))]),
            ],
        )
        .on(
            "SELECT \"ID\", COUNT(*) AS connectionsCount FROM \"EMPLOYEE\"",
            vec![
                row(&[("connectionsCount", json!(0))]),
                row(&[("connectionsCount", json!(1))]),
            ],
        )
        .on(
            "SELECT \"MANAGER_ID\", COUNT(*) AS connectionsCount FROM \"EMPLOYEE\"",
            vec![row(&[("connectionsCount", json!(1))])],
        );

    let provider = employee_provider(client);
    let records = provider
        .expand(&["0_10".to_string()], "HasCountry", ExpandDirection::In, 0)
        .await
        .unwrap();

    assert_eq!(records.nodes.len(), 2);
    assert_eq!(records.nodes[0].id, "1_1");
    assert_eq!(records.nodes[1].id, "1_2");

    assert_eq!(records.edges.len(), 2);
    assert_eq!(records.edges[0].source, "1_1");
    assert_eq!(records.edges[0].target, "0_10");
    assert_eq!(records.edges[1].id, "HasCountry_12_010");
}

#[tokio::test]
async fn expand_both_walks_a_self_referencing_edge_both_ways() {
    let client = ScriptedClient::new()
        // Ann has no manager: the join finds nothing
        .on("FROM \"EMPLOYEE\" e JOIN \"EMPLOYEE\" r", vec![])
        // Ann's reports: Bob
        .on(
            "SELECT * FROM \"EMPLOYEE\" WHERE \"MANAGER_ID\" IN",
            vec![row(&[
                ("ID", json!(2)),
                ("FIRST_NAME", json!("Bob")),
                ("COUNTRY_ID", json!(10)),
                ("MANAGER_ID", json!(1)),
            ])],
        )
        .on(
            "FROM \"COUNTRY\"",
            vec![row(&[("connectionsCount", json!(1))])],
        )
        .on(
            "SELECT \"ID\", COUNT(*) AS connectionsCount FROM \"EMPLOYEE\"",
            vec![row(&[("connectionsCount", json!(1))])],
        )
        .on(
            "SELECT \"MANAGER_ID\", COUNT(*) AS connectionsCount FROM \"EMPLOYEE\"",
            vec![row(&[("connectionsCount", json!(0))])],
        );

    let provider = employee_provider(client);
    let records = provider
        .expand(&["1_1".to_string()], "HasEmployee", ExpandDirection::Both, 0)
        .await
        .unwrap();

    assert_eq!(records.nodes.len(), 1);
    assert_eq!(records.nodes[0].id, "1_2");

    assert_eq!(records.edges.len(), 1);
    let edge = &records.edges[0];
    assert_eq!(edge.source, "1_2");
    assert_eq!(edge.target, "1_1");
    assert_eq!(edge.id, "HasEmployee_12_11");
}

#[tokio::test]
async fn expand_over_an_aggregated_edge_carries_properties() {
    let client = ScriptedClient::new()
        .on(
            "FROM \"FILM_ACTOR\" WHERE \"FILM_ID\" IN",
            vec![row(&[
                ("FILM_ID", json!(1)),
                ("ACTOR_ID", json!(7)),
                ("ROLE", json!("Lead")),
            ])],
        )
        .on(
            "FROM \"ACTOR\" WHERE \"ID\" IN",
            vec![row(&[("ID", json!(7)), ("NAME", json!("Gene"))])],
        )
        .on(
            "SELECT \"ACTOR_ID\", COUNT(*) AS connectionsCount FROM \"FILM_ACTOR\"",
            vec![row(&[("connectionsCount", json!(1))])],
        );

    let provider = GraphProvider::new(
        Arc::new(MockIntrospector::new(film_tables())),
        Arc::new(client),
        DataSourceInfo::default(),
    );
    let records = provider
        .expand(&["0_1".to_string()], "FilmActor", ExpandDirection::Out, 0)
        .await
        .unwrap();

    assert_eq!(records.edges.len(), 1);
    let edge = &records.edges[0];
    assert_eq!(edge.class, "FilmActor");
    assert_eq!(edge.source, "0_1");
    assert_eq!(edge.target, "1_7");
    assert_eq!(edge.properties.get("role"), Some(&json!("Lead")));
    assert_eq!(
        records.edge_classes.get("FilmActor").unwrap().get("role"),
        Some(&json!("VARCHAR"))
    );

    assert_eq!(records.nodes.len(), 1);
    let actor = &records.nodes[0];
    assert_eq!(actor.id, "1_7");
    assert_eq!(actor.class, "Actor");
    assert_eq!(actor.properties.get("name"), Some(&json!("Gene")));
    assert_eq!(actor.properties.get("@in"), Some(&json!({"FilmActor": 1})));
}

#[tokio::test]
async fn expand_in_the_wrong_direction_of_an_aggregated_edge_is_empty() {
    let provider = GraphProvider::new(
        Arc::new(MockIntrospector::new(film_tables())),
        Arc::new(ScriptedClient::new()),
        DataSourceInfo::default(),
    );
    // FilmActor runs Film -> Actor; a film has no incoming side of it
    let records = provider
        .expand(&["0_1".to_string()], "FilmActor", ExpandDirection::In, 0)
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn expand_rejects_malformed_and_mixed_record_ids() {
    let provider = employee_provider(ScriptedClient::new());

    let result = provider
        .expand(
            &["EMPLOYEE_1".to_string()],
            "HasCountry",
            ExpandDirection::Out,
            0,
        )
        .await;
    assert!(matches!(result, Err(ProviderError::Query(_))));

    let result = provider
        .expand(
            &["1_1".to_string(), "0_10".to_string()],
            "HasCountry",
            ExpandDirection::Out,
            0,
        )
        .await;
    assert!(matches!(result, Err(ProviderError::InvalidRecordId { .. })));
}

#[tokio::test]
async fn expanding_an_unknown_edge_is_rejected() {
    let provider = employee_provider(ScriptedClient::new());
    let result = provider
        .expand(&["1_1".to_string()], "HasPayroll", ExpandDirection::Out, 0)
        .await;

    assert!(matches!(
        result,
        Err(ProviderError::UnknownEdge { edge }) if edge == "HasPayroll"
    ));
}
