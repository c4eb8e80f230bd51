//! Graph model builder
//!
//! Maps a [`DatabaseSchema`] to a [`GraphModel`]: one vertex type per
//! non-aggregated entity, properties derived 1:1 from own and inherited
//! attributes, one edge type per canonical relationship with materialized
//! endpoints, and one aggregator edge per qualifying many-to-many join
//! table when aggregation is enabled.

use crate::database_schema::{DatabaseSchema, Entity};

use super::errors::GraphModelError;
use super::naming::NameResolver;
use super::types::{AggregatorEdge, EdgeType, GraphModel, ModelProperty, VertexType};

pub struct GraphModelBuilder<'a> {
    schema: &'a DatabaseSchema,
    resolver: &'a dyn NameResolver,
    aggregation_enabled: bool,
}

impl<'a> GraphModelBuilder<'a> {
    pub fn new(
        schema: &'a DatabaseSchema,
        resolver: &'a dyn NameResolver,
        aggregation_enabled: bool,
    ) -> Self {
        GraphModelBuilder {
            schema,
            resolver,
            aggregation_enabled,
        }
    }

    pub fn build(&self) -> Result<GraphModel, GraphModelError> {
        let mut model = GraphModel::new();

        // Vertex types first: every entity not folded into an aggregator
        // edge becomes one vertex type
        for entity in self.schema.entities() {
            if self.aggregation_enabled && entity.is_aggregable_join_table {
                log::debug!(
                    "Skipping vertex type for join table {}: selected for aggregation",
                    entity.name
                );
                continue;
            }
            let vertex = self.build_vertex_type(entity);
            model.add_vertex_type(&entity.name, vertex);
        }

        // Edge types in schema-build order; the first relationship mapped
        // to an edge type names it, later ones collapse onto it
        for relationship in self.schema.relationships() {
            let (Some(from_vertex), Some(to_vertex)) = (
                model.vertex_for_entity(&relationship.foreign_entity),
                model.vertex_for_entity(&relationship.parent_entity),
            ) else {
                continue;
            };
            let from_vertex = from_vertex.to_string();
            let to_vertex = to_vertex.to_string();

            let edge_name = self.resolver.edge_name(relationship);
            if model.edge_type(&edge_name).is_none() {
                model.add_edge_type(EdgeType {
                    name: edge_name.clone(),
                    properties: Vec::new(),
                    is_aggregator_edge: false,
                });
            }
            model.map_relationship(relationship, &edge_name);
            Self::link_edge(&mut model, &edge_name, &from_vertex, &to_vertex);
        }

        // Vertex inheritance mirrors entity inheritance: a descendant
        // vertex lists its inherited relationships' edges among its own
        // out-edges
        for entity in self.schema.entities() {
            let Some(from_vertex) = model.vertex_for_entity(&entity.name).map(str::to_string)
            else {
                continue;
            };
            for relationship in &entity.inherited_out_relationships {
                let (Some(edge_name), Some(to_vertex)) = (
                    model.edge_for_relationship(relationship).map(str::to_string),
                    model
                        .vertex_for_entity(&relationship.parent_entity)
                        .map(str::to_string),
                ) else {
                    continue;
                };
                Self::link_edge(&mut model, &edge_name, &from_vertex, &to_vertex);
            }
        }

        if self.aggregation_enabled {
            for entity in self.schema.entities() {
                if entity.is_aggregable_join_table {
                    self.build_aggregator_edge(&mut model, entity)?;
                }
            }
        }

        Ok(model)
    }

    fn build_vertex_type(&self, entity: &Entity) -> VertexType {
        let name = self.resolver.vertex_name(&entity.name);
        let properties = entity
            .attributes
            .iter()
            .map(|a| self.build_property(&name, a))
            .collect();
        let inherited_properties = entity
            .inherited_attributes
            .iter()
            .map(|a| self.build_property(&name, a))
            .collect();
        VertexType {
            name,
            properties,
            inherited_properties,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            parent_type: entity
                .parent_entity
                .as_deref()
                .map(|p| self.resolver.vertex_name(p)),
        }
    }

    fn build_property(
        &self,
        owner: &str,
        attribute: &crate::database_schema::Attribute,
    ) -> ModelProperty {
        ModelProperty {
            name: self.resolver.property_name(&attribute.name),
            data_type: attribute.data_type.clone(),
            ordinal_position: attribute.ordinal_position,
            from_primary_key: self.schema.is_primary_key_attribute(attribute),
            owner: owner.to_string(),
        }
    }

    /// Fold a join table into a single aggregator edge bridging its two
    /// parent vertex types; non-key attributes become edge properties.
    fn build_aggregator_edge(
        &self,
        model: &mut GraphModel,
        entity: &Entity,
    ) -> Result<(), GraphModelError> {
        if entity.out_relationships.len() != 2 {
            return Err(GraphModelError::aggregation_violation(
                &entity.name,
                format!(
                    "expected exactly 2 outgoing relationships, found {}",
                    entity.out_relationships.len()
                ),
            ));
        }
        let first = &entity.out_relationships[0];
        let second = &entity.out_relationships[1];
        let from_vertex = model
            .vertex_for_entity(&first.parent_entity)
            .ok_or_else(|| {
                GraphModelError::aggregation_violation(
                    &entity.name,
                    format!("no vertex type for referenced entity `{}`", first.parent_entity),
                )
            })?
            .to_string();
        let to_vertex = model
            .vertex_for_entity(&second.parent_entity)
            .ok_or_else(|| {
                GraphModelError::aggregation_violation(
                    &entity.name,
                    format!(
                        "no vertex type for referenced entity `{}`",
                        second.parent_entity
                    ),
                )
            })?
            .to_string();

        let edge_name = self.resolver.vertex_name(&entity.name);
        let properties = entity
            .non_key_attributes()
            .map(|a| self.build_property(&edge_name, a))
            .collect();

        model.add_edge_type(EdgeType {
            name: edge_name.clone(),
            properties,
            is_aggregator_edge: true,
        });
        model.add_aggregator_edge(AggregatorEdge {
            edge_type: edge_name.clone(),
            from_vertex: from_vertex.clone(),
            to_vertex: to_vertex.clone(),
            join_vertex: self.resolver.vertex_name(&entity.name),
            join_table: entity.name.clone(),
        });
        Self::link_edge(model, &edge_name, &from_vertex, &to_vertex);
        Ok(())
    }

    fn link_edge(model: &mut GraphModel, edge_name: &str, from_vertex: &str, to_vertex: &str) {
        if let Some(vertex) = model.vertex_type_mut(from_vertex) {
            if !vertex.out_edges.iter().any(|e| e == edge_name) {
                vertex.out_edges.push(edge_name.to_string());
            }
        }
        if let Some(vertex) = model.vertex_type_mut(to_vertex) {
            if !vertex.in_edges.iter().any(|e| e == edge_name) {
                vertex.in_edges.push(edge_name.to_string());
            }
        }
    }
}
