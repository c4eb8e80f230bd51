use std::sync::Arc;

use serde_json::json;

use relgraph::config::DataSourceInfo;
use relgraph::provider::{GraphProvider, ProviderError};

use crate::fixtures::{employee_tables, film_tables, row, MockIntrospector, ScriptedClient};

#[tokio::test]
async fn fetch_annotates_nodes_with_relationship_counts() {
    let _ = env_logger::builder().is_test(true).try_init();
    let client = ScriptedClient::new()
        .on(
            "FROM EMPLOYEE ORDER BY",
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
        // One joinable country per employee
        .on(
            "FROM \"COUNTRY\"",
            vec![
                row(&[("ID", json!(10)), ("connectionsCount", json!(1))]),
                row(&[("ID", json!(10)), ("connectionsCount", json!(1))]),
            ],
        )
        // Managers: none for Ann, one for Bob
        .on(
            "SELECT \"ID\", COUNT(*) AS connectionsCount FROM \"EMPLOYEE\"",
            vec![
                row(&[("connectionsCount", json!(0))]),
                row(&[("connectionsCount", json!(1))]),
            ],
        )
        // Reports: one under Ann; the cursor exhausts before Bob
        .on(
            "SELECT \"MANAGER_ID\", COUNT(*) AS connectionsCount FROM \"EMPLOYEE\"",
            vec![row(&[("MANAGER_ID", json!(1)), ("connectionsCount", json!(1))])],
        );

    let provider = GraphProvider::new(
        Arc::new(MockIntrospector::new(employee_tables())),
        Arc::new(client),
        DataSourceInfo::default(),
    );
    let records = provider.fetch("SELECT * FROM EMPLOYEE", 0).await.unwrap();

    assert_eq!(records.nodes.len(), 2);
    assert!(records.edges.is_empty());

    let ann = &records.nodes[0];
    assert_eq!(ann.id, "1_1");
    assert_eq!(ann.class, "Employee");
    assert_eq!(ann.properties.get("firstName"), Some(&json!("Ann")));
    assert_eq!(
        ann.properties.get("@out"),
        Some(&json!({"HasCountry": 1, "HasEmployee": 0}))
    );
    assert_eq!(ann.properties.get("@in"), Some(&json!({"HasEmployee": 1})));
    assert_eq!(ann.properties.get("@edgeCount"), Some(&json!(2)));

    let bob = &records.nodes[1];
    assert_eq!(bob.id, "1_2");
    assert_eq!(
        bob.properties.get("@out"),
        Some(&json!({"HasCountry": 1, "HasEmployee": 1}))
    );
    assert_eq!(bob.properties.get("@in"), Some(&json!({"HasEmployee": 0})));

    let schema = records.node_classes.get("Employee").unwrap();
    assert_eq!(schema.get("firstName"), Some(&json!("VARCHAR")));
    assert_eq!(schema.get("@edgeCount"), Some(&json!("integer")));
}

#[tokio::test]
async fn fetch_applies_the_row_cap() {
    let client = ScriptedClient::new()
        .on(
            "LIMIT 1",
            vec![row(&[("ID", json!(10)), ("NAME", json!("France"))])],
        )
        .on(
            "SELECT \"COUNTRY_ID\", COUNT(*) AS connectionsCount FROM \"EMPLOYEE\"",
            vec![row(&[("connectionsCount", json!(2))])],
        );

    let provider = GraphProvider::new(
        Arc::new(MockIntrospector::new(employee_tables())),
        Arc::new(client),
        DataSourceInfo::default(),
    );
    let records = provider.fetch("SELECT * FROM COUNTRY", 1).await.unwrap();

    assert_eq!(records.nodes.len(), 1);
    assert_eq!(records.nodes[0].id, "0_10");
    assert_eq!(
        records.nodes[0].properties.get("@in"),
        Some(&json!({"HasCountry": 2}))
    );
}

#[tokio::test]
async fn fetching_an_aggregated_join_table_is_rejected() {
    let provider = GraphProvider::new(
        Arc::new(MockIntrospector::new(film_tables())),
        Arc::new(ScriptedClient::new()),
        DataSourceInfo::default(),
    );
    let result = provider.fetch("SELECT * FROM FILM_ACTOR", 0).await;

    assert!(matches!(
        result,
        Err(ProviderError::AggregatedTable { table, edge_type })
            if table == "FILM_ACTOR" && edge_type == "FilmActor"
    ));
}

#[tokio::test]
async fn fetching_an_unknown_table_is_rejected() {
    let provider = GraphProvider::new(
        Arc::new(MockIntrospector::new(employee_tables())),
        Arc::new(ScriptedClient::new()),
        DataSourceInfo::default(),
    );
    let result = provider.fetch("SELECT * FROM PAYROLL", 0).await;

    assert!(matches!(
        result,
        Err(ProviderError::UnknownTable { table }) if table == "PAYROLL"
    ));
}

#[tokio::test]
async fn execute_passes_raw_selects_through() -> anyhow::Result<()> {
    let client = ScriptedClient::new().on(
        "SELECT VERSION()",
        vec![row(&[("VERSION()", json!("8.0"))])],
    );
    let provider = GraphProvider::new(
        Arc::new(MockIntrospector::new(employee_tables())),
        Arc::new(client),
        DataSourceInfo::default(),
    );

    let rows = provider.execute("SELECT VERSION()").await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("VERSION()"), Some(&json!("8.0")));

    provider.test_connection().await?;
    Ok(())
}
