use thiserror::Error;

use crate::database_schema::DatabaseSchemaError;
use crate::graph_model::GraphModelError;
use crate::query_engine::QueryEngineError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Schema(#[from] DatabaseSchemaError),

    #[error(transparent)]
    Model(#[from] GraphModelError),

    #[error(transparent)]
    Query(#[from] QueryEngineError),

    #[error("Table `{table}` is not part of the derived graph model")]
    UnknownTable { table: String },

    #[error("No edge type named `{edge}` in the derived graph model")]
    UnknownEdge { edge: String },

    #[error("Table `{table}` is aggregated into edge type `{edge_type}`; query the edge instead")]
    AggregatedTable { table: String, edge_type: String },

    #[error("Invalid record id `{id}`: {message}")]
    InvalidRecordId { id: String, message: String },
}

impl ProviderError {
    pub fn invalid_record_id(id: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::InvalidRecordId {
            id: id.into(),
            message: message.into(),
        }
    }
}
