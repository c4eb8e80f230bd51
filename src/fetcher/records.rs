//! Graph exchange records
//!
//! The node/edge/class-schema bundle returned by every fetch, expand and
//! load call. Records are created fresh per call and merged by record id
//! when one operation produces partial results from several queries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use crate::query_engine::QueryEngineError;

/// Synthetic node property: out-relationship name -> joinable-record count
pub const OUT_PROPERTY: &str = "@out";
/// Synthetic node property: in-relationship name -> joinable-record count
pub const IN_PROPERTY: &str = "@in";
/// Synthetic node property: total joinable-record count
pub const EDGE_COUNT_PROPERTY: &str = "@edgeCount";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub class: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeRecord {
    pub id: String,
    pub class: String,
    pub source: String,
    pub target: String,
    pub properties: Map<String, Value>,
}

/// Per-class property schema: property name -> declared data type
pub type PropertySchema = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphRecordSet {
    /// Node class name -> property schema
    pub node_classes: HashMap<String, PropertySchema>,
    /// Edge class name -> property schema
    pub edge_classes: HashMap<String, PropertySchema>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set-union merge: class maps are extended, node and edge records
    /// de-duplicated by record id.
    pub fn merge(&mut self, other: GraphRecordSet) {
        self.node_classes.extend(other.node_classes);
        self.edge_classes.extend(other.edge_classes);

        let node_ids: HashSet<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
        for node in other.nodes {
            if !node_ids.contains(&node.id) {
                self.nodes.push(node);
            }
        }
        let edge_ids: HashSet<String> = self.edges.iter().map(|e| e.id.clone()).collect();
        for edge in other.edges {
            if !edge_ids.contains(&edge.id) {
                self.edges.push(edge);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Render one key value as an id fragment. Arrays and objects are
/// stringified so composite ids stay serializable.
pub fn id_fragment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Node record id: the entity's schema position concatenated with its
/// primary-key values, joined by underscores.
pub fn node_record_id(schema_position: usize, key_values: &[Value]) -> String {
    let mut id = schema_position.to_string();
    for value in key_values {
        id.push('_');
        id.push_str(&id_fragment(value));
    }
    id
}

/// Edge record id: class name plus both endpoint ids with their
/// composite-key separators stripped, keeping the id stable for any key
/// arity.
pub fn edge_record_id(class: &str, source: &str, target: &str) -> String {
    format!(
        "{}_{}_{}",
        class,
        source.replace('_', ""),
        target.replace('_', "")
    )
}

/// Parse an externally supplied node id of the form
/// `<schemaPosition>_<value>[_<value>...]` back into its parts.
pub fn parse_node_id(id: &str) -> Result<(usize, Vec<String>), QueryEngineError> {
    let mut parts = id.split('_');
    let position = parts
        .next()
        .and_then(|p| p.parse::<usize>().ok())
        .ok_or_else(|| QueryEngineError::MalformedQuery {
            message: format!("invalid record id `{}`", id),
        })?;
    let values: Vec<String> = parts.map(|s| s.to_string()).collect();
    if values.is_empty() {
        return Err(QueryEngineError::MalformedQuery {
            message: format!("record id `{}` carries no key values", id),
        });
    }
    Ok((position, values))
}
