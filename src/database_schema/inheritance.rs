//! Inheritance descriptor parsing and resolution
//!
//! An inheritance descriptor names, per inheritance group, a root entity,
//! its pattern and the child entities (with discriminator values where the
//! pattern requires them). Descriptors are defined in YAML (or JSON with
//! the same shape):
//!
//! ```yaml
//! hierarchies:
//!   - pattern: table-per-hierarchy
//!     root: EMPLOYEE
//!     discriminator_column: TYPE
//!     discriminator_value: emp
//!     children:
//!       - name: REGULAR_EMPLOYEE
//!         discriminator_value: reg_emp
//!       - name: CONTRACT_EMPLOYEE
//!         discriminator_value: cont_emp
//! ```
//!
//! `table-per-type` and `table-per-concrete-type` groups omit the
//! discriminator fields; children may nest further `children` for deeper
//! hierarchies.
//!
//! Resolution mutates the in-progress [`DatabaseSchema`]: entities are
//! tagged with inheritance level and parent, one [`HierarchicalBag`] per
//! group records the depth-ordered entity sets, and - for the join-based
//! patterns - a canonical relationship from each child's primary key to
//! its parent's primary key is synthesized and registered as inherited on
//! the child.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::errors::DatabaseSchemaError;
use super::types::{CanonicalRelationship, DatabaseSchema, HierarchicalBag, InheritancePattern};

/// Child entity entry within a hierarchy definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildDefinition {
    pub name: String,
    /// Required for table-per-hierarchy, ignored otherwise
    #[serde(default)]
    pub discriminator_value: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildDefinition>,
}

/// One inheritance group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyDefinition {
    pub pattern: InheritancePattern,
    pub root: String,
    /// Required for table-per-hierarchy, must be absent otherwise
    #[serde(default)]
    pub discriminator_column: Option<String>,
    /// Discriminator value of the root entity (table-per-hierarchy)
    #[serde(default)]
    pub discriminator_value: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildDefinition>,
}

/// Structured inheritance input, format-neutral (YAML or JSON)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InheritanceDescriptor {
    #[serde(default)]
    pub hierarchies: Vec<HierarchyDefinition>,
}

impl InheritanceDescriptor {
    pub fn from_yaml_str(content: &str) -> Result<Self, DatabaseSchemaError> {
        serde_yaml::from_str(content).map_err(|e| DatabaseSchemaError::DescriptorParse {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DatabaseSchemaError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DatabaseSchemaError::DescriptorRead {
                error: format!("{}: {}", path.as_ref().display(), e),
            }
        })?;
        Self::from_yaml_str(&content)
    }
}

/// Resolves an [`InheritanceDescriptor`] against an in-progress schema.
pub struct InheritanceResolver;

impl InheritanceResolver {
    /// Apply every hierarchy of the descriptor to the schema, then
    /// recompute inherited attributes and relationships for all entities.
    pub fn resolve(
        schema: &mut DatabaseSchema,
        descriptor: &InheritanceDescriptor,
    ) -> Result<(), DatabaseSchemaError> {
        for hierarchy in &descriptor.hierarchies {
            Self::resolve_hierarchy(schema, hierarchy)?;
        }
        Self::recompute_inherited(schema);
        Ok(())
    }

    fn resolve_hierarchy(
        schema: &mut DatabaseSchema,
        hierarchy: &HierarchyDefinition,
    ) -> Result<(), DatabaseSchemaError> {
        if schema.entity(&hierarchy.root).is_none() {
            return Err(DatabaseSchemaError::UnknownEntity {
                entity: hierarchy.root.clone(),
            });
        }

        let is_tph = hierarchy.pattern == InheritancePattern::TablePerHierarchy;
        if is_tph && hierarchy.discriminator_column.is_none() {
            return Err(DatabaseSchemaError::InvalidDescriptor {
                message: format!(
                    "table-per-hierarchy group rooted at `{}` has no discriminator column",
                    hierarchy.root
                ),
            });
        }

        let bag_name = hierarchy.root.clone();
        let mut depth_levels: Vec<Vec<String>> = vec![vec![hierarchy.root.clone()]];
        let mut discriminator_values = HashMap::new();

        if is_tph {
            let value = hierarchy.discriminator_value.as_ref().ok_or_else(|| {
                DatabaseSchemaError::InvalidDescriptor {
                    message: format!(
                        "table-per-hierarchy root `{}` has no discriminator value",
                        hierarchy.root
                    ),
                }
            })?;
            discriminator_values.insert(hierarchy.root.clone(), value.clone());
        }

        Self::claim_entity(schema, &hierarchy.root, &bag_name, None, 0)?;

        // Depth-first walk of the children tree; each child at depth d+1
        Self::resolve_children(
            schema,
            hierarchy,
            &bag_name,
            &hierarchy.root,
            &hierarchy.children,
            1,
            &mut depth_levels,
            &mut discriminator_values,
        )?;

        schema.add_bag(HierarchicalBag {
            name: bag_name,
            pattern: hierarchy.pattern,
            depth_levels,
            discriminator_column: if is_tph {
                hierarchy.discriminator_column.clone()
            } else {
                None
            },
            discriminator_values,
        });

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_children(
        schema: &mut DatabaseSchema,
        hierarchy: &HierarchyDefinition,
        bag_name: &str,
        parent_name: &str,
        children: &[ChildDefinition],
        depth: usize,
        depth_levels: &mut Vec<Vec<String>>,
        discriminator_values: &mut HashMap<String, String>,
    ) -> Result<(), DatabaseSchemaError> {
        for child in children {
            if schema.entity(&child.name).is_none() {
                return Err(DatabaseSchemaError::UnknownEntity {
                    entity: child.name.clone(),
                });
            }

            if hierarchy.pattern == InheritancePattern::TablePerHierarchy {
                let value = child.discriminator_value.as_ref().ok_or_else(|| {
                    DatabaseSchemaError::InvalidDescriptor {
                        message: format!(
                            "table-per-hierarchy entity `{}` has no discriminator value",
                            child.name
                        ),
                    }
                })?;
                discriminator_values.insert(child.name.clone(), value.clone());
            }

            Self::claim_entity(schema, &child.name, bag_name, Some(parent_name), depth)?;

            if depth_levels.len() <= depth {
                depth_levels.push(Vec::new());
            }
            depth_levels[depth].push(child.name.clone());

            if hierarchy.pattern != InheritancePattern::TablePerHierarchy {
                Self::synthesize_parent_join(schema, &child.name, parent_name)?;
            }

            Self::resolve_children(
                schema,
                hierarchy,
                bag_name,
                &child.name,
                &child.children,
                depth + 1,
                depth_levels,
                discriminator_values,
            )?;
        }
        Ok(())
    }

    /// Tag an entity with its bag, parent and level. An entity may belong
    /// to at most one bag.
    fn claim_entity(
        schema: &mut DatabaseSchema,
        entity_name: &str,
        bag_name: &str,
        parent: Option<&str>,
        level: usize,
    ) -> Result<(), DatabaseSchemaError> {
        let entity = schema
            .entity_mut(entity_name)
            .expect("entity existence checked by caller");
        if let Some(existing) = &entity.hierarchical_bag {
            return Err(DatabaseSchemaError::DuplicateBagMembership {
                entity: entity_name.to_string(),
                bag: existing.clone(),
            });
        }
        entity.hierarchical_bag = Some(bag_name.to_string());
        entity.parent_entity = parent.map(|p| p.to_string());
        entity.inheritance_level = level;
        Ok(())
    }

    /// For table-per-type / table-per-concrete-type: the child's primary
    /// key references the parent's primary key. Synthesize the canonical
    /// relationship, register it globally and mark it inherited on the
    /// child.
    fn synthesize_parent_join(
        schema: &mut DatabaseSchema,
        child_name: &str,
        parent_name: &str,
    ) -> Result<(), DatabaseSchemaError> {
        let child_pk: Vec<String> = schema
            .entity(child_name)
            .expect("entity existence checked by caller")
            .primary_key
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let parent_pk: Vec<String> = schema
            .entity(parent_name)
            .expect("parent claimed before children")
            .primary_key
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if child_pk.is_empty() || child_pk.len() != parent_pk.len() {
            return Err(DatabaseSchemaError::InvalidDescriptor {
                message: format!(
                    "primary keys of `{}` and `{}` cannot form a hierarchical join",
                    child_name, parent_name
                ),
            });
        }

        let relationship = CanonicalRelationship {
            foreign_entity: child_name.to_string(),
            parent_entity: parent_name.to_string(),
            from_columns: child_pk,
            to_columns: parent_pk,
        };

        schema.add_relationship(relationship.clone());

        if let Some(parent) = schema.entity_mut(parent_name) {
            if !parent.in_relationships.contains(&relationship) {
                parent.in_relationships.push(relationship.clone());
            }
        }
        let child = schema
            .entity_mut(child_name)
            .expect("entity existence checked by caller");
        if !child.inherited_out_relationships.contains(&relationship) {
            child.inherited_out_relationships.push(relationship);
        }
        Ok(())
    }

    /// Recompute inherited attributes and inherited out-relationships for
    /// every entity by walking its parent chain. Ancestor attributes come
    /// first, root-most level first, ordinal order preserved per level.
    fn recompute_inherited(schema: &mut DatabaseSchema) {
        // Level order guarantees ancestors are final before descendants
        let mut names: Vec<(usize, String)> = schema
            .entities()
            .iter()
            .filter(|e| e.parent_entity.is_some())
            .map(|e| (e.inheritance_level, e.name.clone()))
            .collect();
        names.sort();

        for (_, name) in names {
            let entity = schema.entity(&name).expect("entity listed above");
            let ancestors = schema.ancestors(entity);

            let mut inherited_attributes = Vec::new();
            for ancestor in ancestors.iter().rev() {
                inherited_attributes.extend(ancestor.attributes.iter().cloned());
            }

            // Relationships of the nearest ancestor not already local,
            // appended after any synthesized parent-join relationship
            let mut inherited_out = entity.inherited_out_relationships.clone();
            if let Some(nearest) = ancestors.first() {
                for relationship in &nearest.out_relationships {
                    let already_local = entity.out_relationships.contains(relationship)
                        || inherited_out.contains(relationship);
                    if !already_local {
                        inherited_out.push(relationship.clone());
                    }
                }
            }

            let entity = schema.entity_mut(&name).expect("entity listed above");
            entity.inherited_attributes = inherited_attributes;
            entity.inherited_out_relationships = inherited_out;
        }
    }
}
