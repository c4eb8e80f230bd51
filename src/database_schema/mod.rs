//! Relational-side schema model
//!
//! Builds a [`DatabaseSchema`] (entities, attributes, keys, canonical
//! relationships, hierarchical bags) from an introspected relational
//! schema and an optional inheritance descriptor.

pub mod builder;
pub mod errors;
pub mod inheritance;
pub mod introspection;
pub mod types;

pub use builder::DatabaseSchemaBuilder;
pub use errors::DatabaseSchemaError;
pub use inheritance::{InheritanceDescriptor, InheritanceResolver};
pub use introspection::{
    ColumnMetadata, ForeignKeyMetadata, PrimaryKeyMetadata, SchemaIntrospector, TableMetadata,
};
pub use types::{
    Attribute, CanonicalRelationship, DatabaseSchema, Entity, ForeignKey, HierarchicalBag,
    InheritancePattern, PrimaryKey,
};
