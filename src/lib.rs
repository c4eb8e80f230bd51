//! Relgraph - Property-graph layer over relational databases
//!
//! This crate derives a property-graph schema (vertex types, edge types,
//! inherited properties, discriminator-based dispatch) from an arbitrary
//! relational schema, optionally annotated with an object-relational
//! inheritance descriptor, and answers graph-shaped queries against the
//! live relational store through:
//! - Schema-to-graph mapping (entities, relationships, hierarchies)
//! - SQL translation of model-level operations (fetch, expand, load)
//! - Row materialization into a node/edge exchange format annotated with
//!   relationship cardinalities

pub mod config;
pub mod database_schema;
pub mod fetcher;
pub mod graph_model;
pub mod provider;
pub mod query_engine;
