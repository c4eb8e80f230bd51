//! Entity <-> vertex-type class mapping
//!
//! Per entity/vertex-type pair, a bidirectional map from raw attribute
//! name to derived property name. The fetch layer uses it to translate
//! rows into graph records without re-deriving naming rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::database_schema::Entity;

use super::types::VertexType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EVClassMapper {
    pub entity_name: String,
    pub vertex_type_name: String,
    /// Raw attribute name -> property name; covers own attributes only
    /// (inherited attributes are covered by the ancestor's mapper)
    pub attribute2property: HashMap<String, String>,
    /// Exact inverse of `attribute2property`
    pub property2attribute: HashMap<String, String>,
}

impl EVClassMapper {
    /// Build the 1:1 map by ordinal alignment: the vertex type's own
    /// properties were derived from the entity's own attributes in order.
    pub fn build(entity: &Entity, vertex: &VertexType) -> Self {
        debug_assert_eq!(entity.attributes.len(), vertex.properties.len());
        let mut attribute2property = HashMap::new();
        let mut property2attribute = HashMap::new();
        for (attribute, property) in entity.attributes.iter().zip(vertex.properties.iter()) {
            attribute2property.insert(attribute.name.clone(), property.name.clone());
            property2attribute.insert(property.name.clone(), attribute.name.clone());
        }
        EVClassMapper {
            entity_name: entity.name.clone(),
            vertex_type_name: vertex.name.clone(),
            attribute2property,
            property2attribute,
        }
    }

    pub fn property_for_attribute(&self, attribute: &str) -> Option<&str> {
        self.attribute2property.get(attribute).map(|s| s.as_str())
    }

    pub fn attribute_for_property(&self, property: &str) -> Option<&str> {
        self.property2attribute.get(property).map(|s| s.as_str())
    }
}
