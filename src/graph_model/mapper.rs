//! Per-call mapper bundle
//!
//! A [`SchemaMapper`] bundles the resolved [`DatabaseSchema`], the derived
//! [`GraphModel`] and one [`EVClassMapper`] per materialized entity. It is
//! rebuilt from the live schema on every top-level provider call and never
//! cached across calls.

use std::collections::HashMap;

use crate::config::DataSourceInfo;
use crate::database_schema::{
    DatabaseSchema, DatabaseSchemaBuilder, Entity, SchemaIntrospector,
};

use super::class_mapper::EVClassMapper;
use super::errors::GraphModelError;
use super::naming::NameResolver;
use super::types::GraphModel;
use super::GraphModelBuilder;

pub struct SchemaMapper {
    pub schema: DatabaseSchema,
    pub model: GraphModel,
    /// Entity name -> class mapper, for materialized entities only
    class_mappers: HashMap<String, EVClassMapper>,
}

impl SchemaMapper {
    /// Introspect the source, resolve inheritance, derive the graph model
    /// and build the class mappers. One sequential pass, no caching.
    pub async fn build(
        introspector: &dyn SchemaIntrospector,
        datasource: &DataSourceInfo,
        resolver: &dyn NameResolver,
    ) -> Result<Self, GraphModelError> {
        let descriptor = datasource.inheritance_descriptor()?;
        let include = (!datasource.include_tables.is_empty())
            .then(|| datasource.include_tables.clone());
        let exclude = (!datasource.exclude_tables.is_empty())
            .then(|| datasource.exclude_tables.clone());
        let schema = DatabaseSchemaBuilder::new(introspector)
            .with_included_tables(include)
            .with_excluded_tables(exclude)
            .build(descriptor.as_ref())
            .await?;

        let model =
            GraphModelBuilder::new(&schema, resolver, datasource.aggregation_enabled).build()?;

        let mut class_mappers = HashMap::new();
        for entity in schema.entities() {
            let Some(vertex_name) = model.vertex_for_entity(&entity.name) else {
                continue;
            };
            let vertex = model.vertex_type(vertex_name).ok_or_else(|| {
                GraphModelError::MissingVertexType {
                    entity: entity.name.clone(),
                }
            })?;
            class_mappers.insert(entity.name.clone(), EVClassMapper::build(entity, vertex));
        }

        Ok(SchemaMapper {
            schema,
            model,
            class_mappers,
        })
    }

    pub fn class_mapper(&self, entity_name: &str) -> Option<&EVClassMapper> {
        self.class_mappers.get(entity_name)
    }

    /// Translate a raw column name into its property name, walking the
    /// entity's mapper first and then its ancestors' (inherited columns
    /// belong to ancestor mappers).
    pub fn property_for_attribute(&self, entity: &Entity, attribute: &str) -> Option<&str> {
        if let Some(property) = self
            .class_mappers
            .get(&entity.name)
            .and_then(|m| m.property_for_attribute(attribute))
        {
            return Some(property);
        }
        for ancestor in self.schema.ancestors(entity) {
            if let Some(property) = self
                .class_mappers
                .get(&ancestor.name)
                .and_then(|m| m.property_for_attribute(attribute))
            {
                return Some(property);
            }
        }
        None
    }

    /// Vertex-type name of a materialized entity
    pub fn vertex_for_entity(&self, entity_name: &str) -> Option<&str> {
        self.model.vertex_for_entity(entity_name)
    }
}
