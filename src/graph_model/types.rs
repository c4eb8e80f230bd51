use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::database_schema::CanonicalRelationship;

/// A property of a vertex or edge type, derived 1:1 from an attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    /// 1-based ordinal position carried over from the source attribute
    pub ordinal_position: usize,
    /// True when the source attribute belongs to the primary key of the
    /// entity (or ancestor) that owns it
    pub from_primary_key: bool,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexType {
    pub name: String,
    /// Properties derived from the entity's own attributes
    pub properties: Vec<ModelProperty>,
    /// Properties derived from ancestor attributes, root-most level first
    pub inherited_properties: Vec<ModelProperty>,
    /// Edge-type names where this vertex is the source
    pub out_edges: Vec<String>,
    /// Edge-type names where this vertex is the target
    pub in_edges: Vec<String>,
    pub parent_type: Option<String>,
}

impl VertexType {
    /// Inherited properties followed by own properties
    pub fn all_properties(&self) -> impl Iterator<Item = &ModelProperty> {
        self.inherited_properties.iter().chain(self.properties.iter())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeType {
    pub name: String,
    /// Non-empty only for aggregator edges, which carry the join table's
    /// non-key attributes
    pub properties: Vec<ModelProperty>,
    pub is_aggregator_edge: bool,
}

/// An edge type replacing a pure many-to-many join table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorEdge {
    pub edge_type: String,
    pub from_vertex: String,
    pub to_vertex: String,
    /// Name of the join-vertex type this edge replaces
    pub join_vertex: String,
    /// Name of the join table behind the edge
    pub join_table: String,
}

/// The derived property-graph schema.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    vertex_types: HashMap<String, VertexType>,
    edge_types: HashMap<String, EdgeType>,
    /// Relationship (by structural key) -> edge-type name; many-to-one
    relationship_to_edge: HashMap<String, String>,
    /// Edge-type name -> relationships that collapsed onto it, in
    /// schema-build order
    edge_to_relationships: HashMap<String, Vec<CanonicalRelationship>>,
    /// Join table name -> the aggregator edge that replaced it
    aggregator_edges: HashMap<String, AggregatorEdge>,
    /// Entity name -> vertex-type name for materialized entities
    entity_to_vertex: HashMap<String, String>,
    vertex_to_entity: HashMap<String, String>,
}

/// Structural key for relationship lookup maps
pub(crate) fn relationship_key(relationship: &CanonicalRelationship) -> String {
    format!(
        "{}>{}:{}>{}",
        relationship.foreign_entity,
        relationship.parent_entity,
        relationship.from_columns.join(","),
        relationship.to_columns.join(",")
    )
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_vertex_type(&mut self, entity_name: &str, vertex: VertexType) {
        self.entity_to_vertex
            .insert(entity_name.to_string(), vertex.name.clone());
        self.vertex_to_entity
            .insert(vertex.name.clone(), entity_name.to_string());
        self.vertex_types.insert(vertex.name.clone(), vertex);
    }

    pub(crate) fn add_edge_type(&mut self, edge: EdgeType) {
        self.edge_types.insert(edge.name.clone(), edge);
    }

    pub(crate) fn map_relationship(
        &mut self,
        relationship: &CanonicalRelationship,
        edge_name: &str,
    ) {
        self.relationship_to_edge
            .insert(relationship_key(relationship), edge_name.to_string());
        self.edge_to_relationships
            .entry(edge_name.to_string())
            .or_default()
            .push(relationship.clone());
    }

    pub(crate) fn add_aggregator_edge(&mut self, aggregator: AggregatorEdge) {
        self.aggregator_edges
            .insert(aggregator.join_table.clone(), aggregator);
    }

    pub(crate) fn vertex_type_mut(&mut self, name: &str) -> Option<&mut VertexType> {
        self.vertex_types.get_mut(name)
    }

    pub fn vertex_type(&self, name: &str) -> Option<&VertexType> {
        self.vertex_types.get(name)
    }

    pub fn edge_type(&self, name: &str) -> Option<&EdgeType> {
        self.edge_types.get(name)
    }

    pub fn vertex_types(&self) -> impl Iterator<Item = &VertexType> {
        self.vertex_types.values()
    }

    pub fn edge_types(&self) -> impl Iterator<Item = &EdgeType> {
        self.edge_types.values()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_types.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_types.len()
    }

    /// Edge-type name a relationship was mapped onto, if its endpoints
    /// were materialized
    pub fn edge_for_relationship(&self, relationship: &CanonicalRelationship) -> Option<&str> {
        self.relationship_to_edge
            .get(&relationship_key(relationship))
            .map(|s| s.as_str())
    }

    /// All relationships that collapsed onto an edge type, in
    /// schema-build order
    pub fn relationships_for_edge(&self, edge_name: &str) -> &[CanonicalRelationship] {
        self.edge_to_relationships
            .get(edge_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The aggregator edge that replaced a join table, if any
    pub fn aggregator_for_table(&self, table: &str) -> Option<&AggregatorEdge> {
        self.aggregator_edges.get(table)
    }

    pub fn aggregator_for_edge(&self, edge_name: &str) -> Option<&AggregatorEdge> {
        self.aggregator_edges
            .values()
            .find(|a| a.edge_type == edge_name)
    }

    pub fn aggregator_edges(&self) -> impl Iterator<Item = &AggregatorEdge> {
        self.aggregator_edges.values()
    }

    pub fn vertex_for_entity(&self, entity: &str) -> Option<&str> {
        self.entity_to_vertex.get(entity).map(|s| s.as_str())
    }

    pub fn entity_for_vertex(&self, vertex: &str) -> Option<&str> {
        self.vertex_to_entity.get(vertex).map(|s| s.as_str())
    }
}
