//! Shared introspection fixtures for the unit tests

#![allow(dead_code)]

use async_trait::async_trait;

use relgraph::database_schema::{
    ColumnMetadata, DatabaseSchemaError, ForeignKeyMetadata, PrimaryKeyMetadata,
    SchemaIntrospector, TableMetadata,
};

pub struct MockIntrospector {
    tables: Vec<TableMetadata>,
}

impl MockIntrospector {
    pub fn new(tables: Vec<TableMetadata>) -> Self {
        MockIntrospector { tables }
    }
}

#[async_trait]
impl SchemaIntrospector for MockIntrospector {
    async fn table_names(&self) -> Result<Vec<String>, DatabaseSchemaError> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn table(&self, name: &str) -> Result<TableMetadata, DatabaseSchemaError> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| DatabaseSchemaError::Introspection {
                error: format!("unknown table `{}`", name),
            })
    }
}

pub fn column(name: &str, data_type: &str, position: usize) -> ColumnMetadata {
    ColumnMetadata {
        name: name.to_string(),
        data_type: data_type.to_string(),
        ordinal_position: position,
    }
}

pub fn foreign_key(
    columns: &[&str],
    referenced_table: &str,
    referenced_columns: &[&str],
) -> ForeignKeyMetadata {
    ForeignKeyMetadata {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        referenced_table: referenced_table.to_string(),
        referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn table(
    name: &str,
    columns: Vec<ColumnMetadata>,
    primary_key: &[&str],
    foreign_keys: Vec<ForeignKeyMetadata>,
) -> TableMetadata {
    TableMetadata {
        name: name.to_string(),
        columns,
        primary_key: PrimaryKeyMetadata {
            columns: primary_key.iter().map(|c| c.to_string()).collect(),
        },
        foreign_keys,
    }
}

/// COUNTRY <- EMPLOYEE (with a self-referencing manager key)
pub fn employee_tables() -> Vec<TableMetadata> {
    vec![
        table(
            "COUNTRY",
            vec![column("ID", "INTEGER", 1), column("NAME", "VARCHAR", 2)],
            &["ID"],
            vec![],
        ),
        table(
            "EMPLOYEE",
            vec![
                column("ID", "INTEGER", 1),
                column("FIRST_NAME", "VARCHAR", 2),
                column("COUNTRY_ID", "INTEGER", 3),
                column("MANAGER_ID", "INTEGER", 4),
            ],
            &["ID"],
            vec![
                foreign_key(&["COUNTRY_ID"], "COUNTRY", &["ID"]),
                foreign_key(&["MANAGER_ID"], "EMPLOYEE", &["ID"]),
            ],
        ),
    ]
}

/// FILM and ACTOR bridged by a pure N:N join table carrying one payload
/// column
pub fn film_tables() -> Vec<TableMetadata> {
    vec![
        table(
            "FILM",
            vec![column("ID", "INTEGER", 1), column("TITLE", "VARCHAR", 2)],
            &["ID"],
            vec![],
        ),
        table(
            "ACTOR",
            vec![column("ID", "INTEGER", 1), column("NAME", "VARCHAR", 2)],
            &["ID"],
            vec![],
        ),
        table(
            "FILM_ACTOR",
            vec![
                column("FILM_ID", "INTEGER", 1),
                column("ACTOR_ID", "INTEGER", 2),
                column("ROLE", "VARCHAR", 3),
            ],
            &["FILM_ID", "ACTOR_ID"],
            vec![
                foreign_key(&["FILM_ID"], "FILM", &["ID"]),
                foreign_key(&["ACTOR_ID"], "ACTOR", &["ID"]),
            ],
        ),
    ]
}

/// Three-level PERSON > EMPLOYEE > MANAGER hierarchy for the join-based
/// patterns, plus a COUNTRY referenced from the root
pub fn person_hierarchy_tables() -> Vec<TableMetadata> {
    vec![
        table(
            "COUNTRY",
            vec![column("ID", "INTEGER", 1), column("NAME", "VARCHAR", 2)],
            &["ID"],
            vec![],
        ),
        table(
            "PERSON",
            vec![
                column("ID", "INTEGER", 1),
                column("NAME", "VARCHAR", 2),
                column("COUNTRY_ID", "INTEGER", 3),
            ],
            &["ID"],
            vec![foreign_key(&["COUNTRY_ID"], "COUNTRY", &["ID"])],
        ),
        table(
            "EMPLOYEE",
            vec![column("ID", "INTEGER", 1), column("SALARY", "DECIMAL", 2)],
            &["ID"],
            vec![],
        ),
        table(
            "MANAGER",
            vec![column("ID", "INTEGER", 1), column("BONUS", "DECIMAL", 2)],
            &["ID"],
            vec![],
        ),
    ]
}
