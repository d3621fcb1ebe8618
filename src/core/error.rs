use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    #[error("Property '{0}' is already declared")]
    DuplicateProperty(String),

    #[error("Relation target '{0}' is not registered")]
    InvalidRelationTarget(String),

    #[error("Relation target '{target}' has no method '{method}'")]
    InvalidRelationMethod { target: String, method: String },

    #[error("Required property '{0}' has no value")]
    RequiredPropertyMissing(String),

    #[error("Validation failed for '{property}': {message}")]
    Validation { property: String, message: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Table '{0}' not found")]
    UnknownTable(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl<T> From<std::sync::PoisonError<T>> for ModelError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
