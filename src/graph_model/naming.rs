//! Naming conventions for graph-model identifiers
//!
//! Turning raw SQL identifiers into vertex-type, edge-type and property
//! names is a pluggable capability: implement [`NameResolver`] to swap in
//! a different convention. [`DefaultNameResolver`] is deterministic:
//!
//! - vertex types capitalize underscore segments (`REGULAR_EMPLOYEE` ->
//!   `RegularEmployee`)
//! - properties are lower camelCase (`FIRST_NAME` -> `firstName`)
//! - foreign-key edges are `Has` + parent vertex (`HasManager`)
//! - aggregator edges take the join-vertex name

use crate::database_schema::CanonicalRelationship;

pub trait NameResolver: Send + Sync {
    /// Vertex-type name for a table identifier
    fn vertex_name(&self, table: &str) -> String;

    /// Property name for a column identifier
    fn property_name(&self, column: &str) -> String;

    /// Edge-type name for a foreign-key-backed relationship
    fn edge_name(&self, relationship: &CanonicalRelationship) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct DefaultNameResolver;

impl DefaultNameResolver {
    fn capitalize_segment(segment: &str) -> String {
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) => {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            }
            None => String::new(),
        }
    }
}

impl NameResolver for DefaultNameResolver {
    fn vertex_name(&self, table: &str) -> String {
        table
            .split('_')
            .map(Self::capitalize_segment)
            .collect::<Vec<_>>()
            .join("")
    }

    fn property_name(&self, column: &str) -> String {
        let mut segments = column.split('_').filter(|s| !s.is_empty());
        let mut result = match segments.next() {
            Some(first) => first.to_lowercase(),
            None => return String::new(),
        };
        for segment in segments {
            result.push_str(&Self::capitalize_segment(segment));
        }
        result
    }

    fn edge_name(&self, relationship: &CanonicalRelationship) -> String {
        format!("Has{}", self.vertex_name(&relationship.parent_entity))
    }
}
