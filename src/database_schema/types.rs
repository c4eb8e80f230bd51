use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single column of an entity, with its declared (dialect-neutral) data
/// type and 1-based ordinal position. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    /// 1-based, stable within the owning entity
    pub ordinal_position: usize,
    /// Name of the entity that physically owns this attribute. For
    /// inherited attributes this is the ancestor, not the inheriting
    /// entity.
    pub entity_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PrimaryKey {
    pub attributes: Vec<Attribute>,
}

impl PrimaryKey {
    pub fn column_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.attributes.iter().any(|a| a.name == column)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKey {
    pub attributes: Vec<Attribute>,
    /// Entity owning the referenced primary key
    pub referenced_entity: String,
    pub referenced_columns: Vec<String>,
}

/// Directed edge at the relational level, from the entity holding the
/// foreign key to the entity holding the referenced primary key.
///
/// Endpoints are stored as entity *names* and resolved by lookup on the
/// [`DatabaseSchema`]; equality is structural.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalRelationship {
    /// Entity holding the foreign key
    pub foreign_entity: String,
    /// Entity holding the referenced primary key
    pub parent_entity: String,
    /// Ordered columns on the foreign-key side
    pub from_columns: Vec<String>,
    /// Ordered columns on the primary-key side
    pub to_columns: Vec<String>,
}

impl fmt::Display for CanonicalRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) -> {}({})",
            self.foreign_entity,
            self.from_columns.join(","),
            self.parent_entity,
            self.to_columns.join(",")
        )
    }
}

/// Inheritance pattern of a [`HierarchicalBag`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InheritancePattern {
    #[serde(rename = "table-per-hierarchy")]
    TablePerHierarchy,
    #[serde(rename = "table-per-type")]
    TablePerType,
    #[serde(rename = "table-per-concrete-type")]
    TablePerConcreteType,
}

impl InheritancePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            InheritancePattern::TablePerHierarchy => "table-per-hierarchy",
            InheritancePattern::TablePerType => "table-per-type",
            InheritancePattern::TablePerConcreteType => "table-per-concrete-type",
        }
    }
}

/// One inheritance group: its pattern, entities grouped by depth (depth 0
/// holds exactly one root), and - for table-per-hierarchy only - the
/// discriminator column and per-entity discriminator values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalBag {
    /// Bag name (the root entity name)
    pub name: String,
    pub pattern: InheritancePattern,
    /// Entities grouped by inheritance depth; index = depth
    pub depth_levels: Vec<Vec<String>>,
    /// Only set for table-per-hierarchy
    pub discriminator_column: Option<String>,
    /// Entity name -> discriminator value; only populated for
    /// table-per-hierarchy
    pub discriminator_values: HashMap<String, String>,
}

impl HierarchicalBag {
    pub fn depth_of(&self, entity: &str) -> Option<usize> {
        self.depth_levels
            .iter()
            .position(|level| level.iter().any(|e| e == entity))
    }

    pub fn root(&self) -> Option<&str> {
        self.depth_levels
            .first()
            .and_then(|level| level.first())
            .map(|s| s.as_str())
    }
}

/// A table of the source schema, with its own and inherited attributes,
/// keys, and the canonical relationships it participates in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Stable integer position within the schema (0-based build order).
    /// Exposed to callers as the prefix of every node record id.
    pub schema_position: usize,
    /// Own attributes, in ordinal order
    pub attributes: Vec<Attribute>,
    /// Attributes of all ancestor entities, root-most first, ordinal
    /// order preserved per level. Recomputed when the hierarchy resolves.
    pub inherited_attributes: Vec<Attribute>,
    pub primary_key: PrimaryKey,
    pub foreign_keys: Vec<ForeignKey>,
    /// Relationships where this entity holds the foreign key
    pub out_relationships: Vec<CanonicalRelationship>,
    /// Relationships where this entity holds the referenced primary key
    pub in_relationships: Vec<CanonicalRelationship>,
    /// Relationships owned by the nearest ancestor that are not already
    /// present locally, plus the synthesized parent-join relationship for
    /// table-per-type / table-per-concrete-type children
    pub inherited_out_relationships: Vec<CanonicalRelationship>,
    pub parent_entity: Option<String>,
    /// Root entities have level 0
    pub inheritance_level: usize,
    /// Name of the hierarchical bag this entity belongs to, if any.
    /// An entity belongs to at most one bag.
    pub hierarchical_bag: Option<String>,
    /// True when this entity is a pure N:N associative table that can be
    /// folded into a single aggregator edge
    pub is_aggregable_join_table: bool,
}

impl Entity {
    pub fn new(name: String, schema_position: usize) -> Self {
        Entity {
            name,
            schema_position,
            attributes: Vec::new(),
            inherited_attributes: Vec::new(),
            primary_key: PrimaryKey::default(),
            foreign_keys: Vec::new(),
            out_relationships: Vec::new(),
            in_relationships: Vec::new(),
            inherited_out_relationships: Vec::new(),
            parent_entity: None,
            inheritance_level: 0,
            hierarchical_bag: None,
            is_aggregable_join_table: false,
        }
    }

    /// Own attribute lookup by column name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Inherited attributes followed by own attributes, the order every
    /// downstream property derivation uses
    pub fn all_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.inherited_attributes.iter().chain(self.attributes.iter())
    }

    /// Own out-relationships followed by inherited ones
    pub fn all_out_relationships(&self) -> impl Iterator<Item = &CanonicalRelationship> {
        self.out_relationships
            .iter()
            .chain(self.inherited_out_relationships.iter())
    }

    /// Attributes that are not part of the primary key, in ordinal order
    pub fn non_key_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .filter(|a| !self.primary_key.contains_column(&a.name))
    }
}

/// The resolved relational schema: entities with lookup by exact name,
/// case-insensitive name and stable schema position, the deduplicated
/// flat relationship list, and the hierarchical bags.
#[derive(Debug, Clone, Default)]
pub struct DatabaseSchema {
    entities: Vec<Entity>,
    name_index: HashMap<String, usize>,
    relationships: Vec<CanonicalRelationship>,
    bags: HashMap<String, HierarchicalBag>,
}

impl DatabaseSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity; its `schema_position` must equal the current
    /// entity count.
    pub(crate) fn add_entity(&mut self, entity: Entity) {
        debug_assert_eq!(entity.schema_position, self.entities.len());
        self.name_index
            .insert(entity.name.clone(), entity.schema_position);
        self.entities.push(entity);
    }

    /// Register a relationship unless it is already present (structural
    /// equality). Returns true when the relationship was added.
    pub(crate) fn add_relationship(&mut self, relationship: CanonicalRelationship) -> bool {
        if self.relationships.contains(&relationship) {
            return false;
        }
        self.relationships.push(relationship);
        true
    }

    pub(crate) fn add_bag(&mut self, bag: HierarchicalBag) {
        self.bags.insert(bag.name.clone(), bag);
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.name_index.get(name).map(|&i| &self.entities[i])
    }

    pub fn entity_ignore_case(&self, name: &str) -> Option<&Entity> {
        self.entity(name).or_else(|| {
            self.entities
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn entity_at(&self, schema_position: usize) -> Option<&Entity> {
        self.entities.get(schema_position)
    }

    pub(crate) fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        let idx = *self.name_index.get(name)?;
        self.entities.get_mut(idx)
    }

    /// Entities in schema position order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relationships(&self) -> &[CanonicalRelationship] {
        &self.relationships
    }

    pub fn bags(&self) -> impl Iterator<Item = &HierarchicalBag> {
        self.bags.values()
    }

    pub fn bag(&self, name: &str) -> Option<&HierarchicalBag> {
        self.bags.get(name)
    }

    /// Walk the parent chain of an entity, nearest ancestor first
    pub fn ancestors<'a>(&'a self, entity: &'a Entity) -> Vec<&'a Entity> {
        let mut result = Vec::new();
        let mut current = entity.parent_entity.as_deref();
        while let Some(parent_name) = current {
            match self.entity(parent_name) {
                Some(parent) => {
                    result.push(parent);
                    current = parent.parent_entity.as_deref();
                }
                None => break,
            }
        }
        result
    }

    /// True when the column belongs to the primary key of the entity that
    /// physically owns the attribute (the entity itself or an ancestor).
    pub fn is_primary_key_attribute(&self, attribute: &Attribute) -> bool {
        self.entity(&attribute.entity_name)
            .map(|owner| owner.primary_key.contains_column(&attribute.name))
            .unwrap_or(false)
    }
}
