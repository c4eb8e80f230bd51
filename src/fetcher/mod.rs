//! Row-to-graph materialization
//!
//! Consumes row cursors plus entity/relationship metadata and produces
//! graph exchange records: node records annotated with `@out`/`@in`
//! cardinality maps and `@edgeCount`, and edge records derived from join
//! rows (plain foreign-key joins or aggregated join tables).

pub mod records;

use serde_json::{Map, Value};

use crate::database_schema::{Attribute, CanonicalRelationship, Entity};
use crate::graph_model::{EdgeType, SchemaMapper};
use crate::query_engine::sql::ROOT_KEY_ALIAS_PREFIX;
use crate::query_engine::{CountedRowSource, QueryEngineError, Row, RowCursor, SqlValue};

pub use records::{EdgeRecord, GraphRecordSet, NodeRecord, PropertySchema};
use records::{
    edge_record_id, node_record_id, EDGE_COUNT_PROPERTY, IN_PROPERTY, OUT_PROPERTY,
};

pub struct DataFetcher<'a> {
    mapper: &'a SchemaMapper,
}

impl<'a> DataFetcher<'a> {
    pub fn new(mapper: &'a SchemaMapper) -> Self {
        DataFetcher { mapper }
    }

    /// Key attributes used to build record ids for an entity: its own
    /// primary key, or the nearest ancestor's when the entity has none.
    pub fn key_attributes<'e>(&'e self, entity: &'e Entity) -> &'e [Attribute] {
        if !entity.primary_key.attributes.is_empty() {
            return &entity.primary_key.attributes;
        }
        for ancestor in self.mapper.schema.ancestors(entity) {
            if !ancestor.primary_key.attributes.is_empty() {
                return &ancestor.primary_key.attributes;
            }
        }
        &entity.primary_key.attributes
    }

    fn vertex_class(&self, entity: &Entity) -> Result<String, QueryEngineError> {
        self.mapper
            .vertex_for_entity(&entity.name)
            .map(|s| s.to_string())
            .ok_or_else(|| QueryEngineError::Execution {
                error: format!("entity `{}` has no vertex type", entity.name),
            })
    }

    /// Property schema of the vertex class backing an entity, including
    /// the synthetic cardinality properties.
    fn node_property_schema(&self, class: &str) -> PropertySchema {
        let mut schema = Map::new();
        if let Some(vertex) = self.mapper.model.vertex_type(class) {
            for property in vertex.all_properties() {
                schema.insert(property.name.clone(), Value::from(property.data_type.clone()));
            }
        }
        schema.insert(OUT_PROPERTY.to_string(), Value::from("map"));
        schema.insert(IN_PROPERTY.to_string(), Value::from("map"));
        schema.insert(EDGE_COUNT_PROPERTY.to_string(), Value::from("integer"));
        schema
    }

    /// Record id for one row of an entity
    fn row_node_id(&self, entity: &Entity, row: &Row) -> Result<String, QueryEngineError> {
        let mut key_values = Vec::new();
        for attribute in self.key_attributes(entity) {
            let value = row.get(&attribute.name).cloned().ok_or_else(|| {
                QueryEngineError::MissingColumn {
                    column: attribute.name.clone(),
                }
            })?;
            key_values.push(value);
        }
        Ok(node_record_id(entity.schema_position, &key_values))
    }

    /// Translate the raw columns of a row into the property bag of a node
    /// record. Array and object values are stringified to stay
    /// serializable.
    fn row_properties(&self, entity: &Entity, row: &Row) -> Map<String, Value> {
        let mut properties = Map::new();
        for attribute in entity.all_attributes() {
            let Some(property) = self.mapper.property_for_attribute(entity, &attribute.name)
            else {
                continue;
            };
            let Some(value) = row.get(&attribute.name) else {
                continue;
            };
            properties.insert(property.to_string(), stringify_composite(value));
        }
        properties
    }

    /// Advance the counted row source to exhaustion, emitting one node
    /// record per primary row. Cardinality contributions with the same
    /// relationship name merge by addition (inherited relationships are
    /// counted once per hierarchy level).
    pub async fn map_result_set(
        &self,
        source: &mut CountedRowSource,
        entity: &Entity,
    ) -> Result<GraphRecordSet, QueryEngineError> {
        let class = self.vertex_class(entity)?;
        let mut records = GraphRecordSet::new();
        records
            .node_classes
            .insert(class.clone(), self.node_property_schema(&class));

        while let Some(counted) = source.advance().await? {
            let id = self.row_node_id(entity, &counted.row)?;
            let mut properties = self.row_properties(entity, &counted.row);

            let out_map = accumulate_counts(&counted.out_counts);
            let in_map = accumulate_counts(&counted.in_counts);
            let edge_count: i64 = out_map.values().filter_map(Value::as_i64).sum::<i64>()
                + in_map.values().filter_map(Value::as_i64).sum::<i64>();
            properties.insert(OUT_PROPERTY.to_string(), Value::Object(out_map));
            properties.insert(IN_PROPERTY.to_string(), Value::Object(in_map));
            properties.insert(EDGE_COUNT_PROPERTY.to_string(), Value::from(edge_count));

            records.nodes.push(NodeRecord {
                id,
                class: class.clone(),
                properties,
            });
        }
        Ok(records)
    }

    /// Edge records from expand-join rows: the entering entity's columns
    /// plus the root's key values under `__root_<i>` aliases. The edge
    /// always runs from the foreign-key holder (the root here) to the
    /// entered parent rows.
    pub async fn map_join_rows_edges(
        &self,
        cursor: &mut Box<dyn RowCursor>,
        entering: &Entity,
        root: &Entity,
        edge_name: &str,
    ) -> Result<GraphRecordSet, QueryEngineError> {
        let mut records = GraphRecordSet::new();
        records.edge_classes.insert(edge_name.to_string(), Map::new());

        let root_key_len = self.key_attributes(root).len();
        while let Some(row) = cursor.advance().await? {
            let mut root_values = Vec::with_capacity(root_key_len);
            for i in 0..root_key_len {
                let alias = format!("{}{}", ROOT_KEY_ALIAS_PREFIX, i);
                let value = row.get(&alias).cloned().ok_or_else(|| {
                    QueryEngineError::MissingColumn { column: alias }
                })?;
                root_values.push(value);
            }
            let source = node_record_id(root.schema_position, &root_values);
            let target = self.row_node_id(entering, &row)?;
            records.edges.push(EdgeRecord {
                id: edge_record_id(edge_name, &source, &target),
                class: edge_name.to_string(),
                source,
                target,
                properties: Map::new(),
            });
        }
        Ok(records)
    }

    /// Edge records from direct-expansion rows: the entering entity holds
    /// the foreign key, so the parent's key values are readable straight
    /// from the entering columns.
    pub async fn map_direct_rows_edges(
        &self,
        cursor: &mut Box<dyn RowCursor>,
        entering: &Entity,
        relationship: &CanonicalRelationship,
        parent: &Entity,
        edge_name: &str,
    ) -> Result<GraphRecordSet, QueryEngineError> {
        let mut records = GraphRecordSet::new();
        records.edge_classes.insert(edge_name.to_string(), Map::new());

        while let Some(row) = cursor.advance().await? {
            let source = self.row_node_id(entering, &row)?;
            let Some(target_values) =
                referenced_key_values(&row, relationship, self.key_attributes(parent))
            else {
                log::debug!(
                    "Skipping edge row for `{}`: incomplete key values on {}",
                    edge_name,
                    relationship
                );
                continue;
            };
            let target = node_record_id(parent.schema_position, &target_values);
            records.edges.push(EdgeRecord {
                id: edge_record_id(edge_name, &source, &target),
                class: edge_name.to_string(),
                source,
                target,
                properties: Map::new(),
            });
        }
        Ok(records)
    }

    /// Edge records from aggregated join-table rows. Every non-key
    /// attribute of the join table is copied onto the edge as a property;
    /// the second hop's filter values (the far side's referenced keys)
    /// are collected for the caller.
    #[allow(clippy::too_many_arguments)]
    pub async fn map_aggregator_rows(
        &self,
        cursor: &mut Box<dyn RowCursor>,
        join_entity: &Entity,
        root_relationship: &CanonicalRelationship,
        root_entity: &Entity,
        far_relationship: &CanonicalRelationship,
        far_entity: &Entity,
        edge: &EdgeType,
        root_is_source: bool,
    ) -> Result<(GraphRecordSet, Vec<Vec<SqlValue>>), QueryEngineError> {
        let mut records = GraphRecordSet::new();
        let mut schema = Map::new();
        for property in &edge.properties {
            schema.insert(property.name.clone(), Value::from(property.data_type.clone()));
        }
        records.edge_classes.insert(edge.name.clone(), schema);

        // Property names align 1:1 with the join table's non-key
        // attributes, in ordinal order
        let property_names: Vec<(&str, &str)> = join_entity
            .non_key_attributes()
            .zip(edge.properties.iter())
            .map(|(attribute, property)| (attribute.name.as_str(), property.name.as_str()))
            .collect();

        let mut far_filter_values = Vec::new();
        while let Some(row) = cursor.advance().await? {
            let Some(root_values) =
                referenced_key_values(&row, root_relationship, self.key_attributes(root_entity))
            else {
                log::debug!("Skipping aggregated row: incomplete root key on {}", edge.name);
                continue;
            };
            let Some(far_values) =
                referenced_key_values(&row, far_relationship, self.key_attributes(far_entity))
            else {
                log::debug!("Skipping aggregated row: incomplete far key on {}", edge.name);
                continue;
            };

            far_filter_values.push(
                far_relationship
                    .from_columns
                    .iter()
                    .filter_map(|c| row.get(c))
                    .map(SqlValue::from_json)
                    .collect::<Vec<_>>(),
            );

            let root_id = node_record_id(root_entity.schema_position, &root_values);
            let far_id = node_record_id(far_entity.schema_position, &far_values);
            let (source, target) = if root_is_source {
                (root_id, far_id)
            } else {
                (far_id, root_id)
            };

            let mut properties = Map::new();
            for (attribute, property) in &property_names {
                if let Some(value) = row.get(*attribute) {
                    properties.insert(property.to_string(), stringify_composite(value));
                }
            }

            records.edges.push(EdgeRecord {
                id: edge_record_id(&edge.name, &source, &target),
                class: edge.name.clone(),
                source,
                target,
                properties,
            });
        }
        Ok((records, far_filter_values))
    }
}

/// Merge repeated relationship names by addition into a JSON map
fn accumulate_counts(counts: &[(String, i64)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, count) in counts {
        let current = map.get(name).and_then(Value::as_i64).unwrap_or(0);
        map.insert(name.clone(), Value::from(current + count));
    }
    map
}

fn stringify_composite(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

/// Read the referenced entity's key values out of a foreign-key holder's
/// row, reordered to the referenced primary-key column order. Returns
/// `None` when the relationship does not cover the full key or a value is
/// missing.
fn referenced_key_values(
    row: &Row,
    relationship: &CanonicalRelationship,
    key_attributes: &[Attribute],
) -> Option<Vec<Value>> {
    let mut values = Vec::with_capacity(key_attributes.len());
    for key_attribute in key_attributes {
        let position = relationship
            .to_columns
            .iter()
            .position(|c| c == &key_attribute.name)?;
        let from_column = relationship.from_columns.get(position)?;
        values.push(row.get(from_column)?.clone());
    }
    Some(values)
}
