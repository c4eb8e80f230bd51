use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DatabaseSchemaError {
    #[error("Failed to introspect source schema: {error}")]
    Introspection { error: String },
    #[error("Failed to read inheritance descriptor: {error}")]
    DescriptorRead { error: String },
    #[error("Failed to parse inheritance descriptor: {error}")]
    DescriptorParse { error: String },
    #[error("Inheritance descriptor references unknown entity `{entity}`")]
    UnknownEntity { entity: String },
    #[error("Invalid inheritance descriptor: {message}")]
    InvalidDescriptor { message: String },
    #[error("Entity `{entity}` already belongs to hierarchical bag `{bag}`")]
    DuplicateBagMembership { entity: String, bag: String },
}
