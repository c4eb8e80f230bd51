use thiserror::Error;

use crate::database_schema::DatabaseSchemaError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphModelError {
    #[error(transparent)]
    Schema(#[from] DatabaseSchemaError),
    #[error(
        "Aggregation violation on join table `{table}`: {reason}. \
         Disable aggregation or fix the schema mapping."
    )]
    AggregationViolation { table: String, reason: String },
    #[error("No vertex type found for entity `{entity}`")]
    MissingVertexType { entity: String },
}

impl GraphModelError {
    pub fn aggregation_violation(table: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphModelError::AggregationViolation {
            table: table.into(),
            reason: reason.into(),
        }
    }
}
