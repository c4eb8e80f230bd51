//! Database schema builder
//!
//! Combines the introspected source schema with the resolved inheritance
//! descriptor into a [`DatabaseSchema`]: entities with their own and
//! inherited attributes, primary/foreign keys, canonical relationships
//! classified as out/in per entity, and hierarchical bags. Include and
//! exclude table filters are applied before any entity is built, so
//! filtered tables never appear downstream.

use std::collections::HashSet;

use super::errors::DatabaseSchemaError;
use super::inheritance::{InheritanceDescriptor, InheritanceResolver};
use super::introspection::SchemaIntrospector;
use super::types::{
    Attribute, CanonicalRelationship, DatabaseSchema, Entity, ForeignKey, PrimaryKey,
};

pub struct DatabaseSchemaBuilder<'a> {
    introspector: &'a dyn SchemaIntrospector,
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
}

impl<'a> DatabaseSchemaBuilder<'a> {
    pub fn new(introspector: &'a dyn SchemaIntrospector) -> Self {
        DatabaseSchemaBuilder {
            introspector,
            include_tables: None,
            exclude_tables: None,
        }
    }

    /// Restrict the schema to these tables (intersection with the source
    /// tables). Wins over `with_excluded_tables` when both are set.
    pub fn with_included_tables(mut self, tables: Option<Vec<String>>) -> Self {
        self.include_tables = tables;
        self
    }

    /// Drop these tables from the schema.
    pub fn with_excluded_tables(mut self, tables: Option<Vec<String>>) -> Self {
        self.exclude_tables = tables;
        self
    }

    /// Introspect the source, apply filters, resolve inheritance and mark
    /// aggregable join tables.
    pub async fn build(
        &self,
        descriptor: Option<&InheritanceDescriptor>,
    ) -> Result<DatabaseSchema, DatabaseSchemaError> {
        let table_names = self.introspector.table_names().await?;
        let selected: Vec<String> = table_names
            .into_iter()
            .filter(|name| self.is_selected(name))
            .collect();
        let selected_set: HashSet<&str> = selected.iter().map(|s| s.as_str()).collect();

        let mut schema = DatabaseSchema::new();

        // One sequential introspection round per table; schema position is
        // the build order and stays stable for the lifetime of the schema.
        let mut foreign_keys_per_entity: Vec<Vec<ForeignKey>> = Vec::new();
        for (position, name) in selected.iter().enumerate() {
            let metadata = self.introspector.table(name).await?;

            let mut entity = Entity::new(name.clone(), position);
            entity.attributes = metadata
                .columns
                .iter()
                .map(|c| Attribute {
                    name: c.name.clone(),
                    data_type: c.data_type.clone(),
                    ordinal_position: c.ordinal_position,
                    entity_name: name.clone(),
                })
                .collect();
            entity.primary_key = PrimaryKey {
                attributes: metadata
                    .primary_key
                    .columns
                    .iter()
                    .filter_map(|col| entity.attribute(col).cloned())
                    .collect(),
            };

            let mut foreign_keys = Vec::new();
            for fk in &metadata.foreign_keys {
                // Foreign keys into filtered-out tables are dropped with
                // their relationships
                if !selected_set.contains(fk.referenced_table.as_str()) {
                    log::debug!(
                        "Dropping foreign key {}({}) -> {}: referenced table filtered out",
                        name,
                        fk.columns.join(","),
                        fk.referenced_table
                    );
                    continue;
                }
                foreign_keys.push(ForeignKey {
                    attributes: fk
                        .columns
                        .iter()
                        .filter_map(|col| entity.attribute(col).cloned())
                        .collect(),
                    referenced_entity: fk.referenced_table.clone(),
                    referenced_columns: fk.referenced_columns.clone(),
                });
            }
            entity.foreign_keys = foreign_keys.clone();
            foreign_keys_per_entity.push(foreign_keys);

            schema.add_entity(entity);
        }

        // Canonical relationships derive from foreign keys, deduplicated
        // structurally, classified out on the holder and in on the target
        for (position, foreign_keys) in foreign_keys_per_entity.iter().enumerate() {
            let entity_name = schema
                .entity_at(position)
                .expect("entity added above")
                .name
                .clone();
            for fk in foreign_keys {
                let relationship = CanonicalRelationship {
                    foreign_entity: entity_name.clone(),
                    parent_entity: fk.referenced_entity.clone(),
                    from_columns: fk.attributes.iter().map(|a| a.name.clone()).collect(),
                    to_columns: fk.referenced_columns.clone(),
                };
                schema.add_relationship(relationship.clone());
                if let Some(parent) = schema.entity_mut(&fk.referenced_entity) {
                    if !parent.in_relationships.contains(&relationship) {
                        parent.in_relationships.push(relationship.clone());
                    }
                }
                let entity = schema.entity_mut(&entity_name).expect("entity added above");
                if !entity.out_relationships.contains(&relationship) {
                    entity.out_relationships.push(relationship);
                }
            }
        }

        if let Some(descriptor) = descriptor {
            InheritanceResolver::resolve(&mut schema, descriptor)?;
        }

        Self::mark_aggregable_join_tables(&mut schema);

        Ok(schema)
    }

    /// An entity qualifies as an aggregable join table when it has exactly
    /// two outgoing relationships to distinct parents and their combined
    /// from-columns equal its full primary key: a pure N:N associative
    /// table with no independent identity.
    fn mark_aggregable_join_tables(schema: &mut DatabaseSchema) {
        let mut aggregable = Vec::new();
        for entity in schema.entities() {
            if entity.out_relationships.len() != 2 {
                continue;
            }
            let first = &entity.out_relationships[0];
            let second = &entity.out_relationships[1];
            if first.parent_entity == second.parent_entity {
                continue;
            }
            let mut from_columns: HashSet<&str> = HashSet::new();
            from_columns.extend(first.from_columns.iter().map(|s| s.as_str()));
            from_columns.extend(second.from_columns.iter().map(|s| s.as_str()));
            let pk_columns: HashSet<&str> =
                entity.primary_key.column_names().into_iter().collect();
            if !pk_columns.is_empty() && from_columns == pk_columns {
                aggregable.push(entity.name.clone());
            }
        }
        for name in aggregable {
            if let Some(entity) = schema.entity_mut(&name) {
                entity.is_aggregable_join_table = true;
            }
        }
    }

    fn is_selected(&self, table: &str) -> bool {
        if let Some(include) = &self.include_tables {
            return include.iter().any(|t| t.eq_ignore_ascii_case(table));
        }
        if let Some(exclude) = &self.exclude_tables {
            return !exclude.iter().any(|t| t.eq_ignore_ascii_case(table));
        }
        true
    }
}
