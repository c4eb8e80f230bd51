//! Graph-side schema model
//!
//! Derives a [`GraphModel`] (vertex types, edge types, aggregator edges)
//! from a [`crate::database_schema::DatabaseSchema`], with pluggable
//! naming conventions and bidirectional entity/vertex class mapping.

pub mod builder;
pub mod class_mapper;
pub mod errors;
pub mod mapper;
pub mod naming;
pub mod types;

pub use builder::GraphModelBuilder;
pub use class_mapper::EVClassMapper;
pub use errors::GraphModelError;
pub use mapper::SchemaMapper;
pub use naming::{DefaultNameResolver, NameResolver};
pub use types::{AggregatorEdge, EdgeType, GraphModel, ModelProperty, VertexType};
