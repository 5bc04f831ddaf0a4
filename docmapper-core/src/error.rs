//! Error types and result types for mapper operations.
//!
//! This module provides error handling for schema binding, query translation,
//! and session commits. Use [`MapperResult<T>`] as the return type for
//! fallible operations.

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when mapping records to and
/// from a document store.
///
/// This enum covers schema binding, filter construction, record lifecycle
/// issues, and engine-specific errors.
#[derive(Error, Debug)]
pub enum MapperError {
    /// The model does not declare both a database name and a collection name.
    #[error("Model {0} is not bound to a database and collection")]
    UnboundModel(&'static str),
    /// A filter call supplied no predicates.
    #[error("Filter requires at least one predicate")]
    EmptyFilter,
    /// No document matched the query. The argument is the collection name.
    #[error("No matching document in collection {0}")]
    NotFound(String),
    /// A pending update or delete referenced a record that has no identity.
    /// The argument is the collection name.
    #[error("Record in collection {0} has no identity")]
    MissingIdentity(String),
    /// A filter document used an operator token the engine does not recognize.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// Serialization/deserialization error when converting a record to or from
    /// its document form.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A transaction scope was misused or could not complete.
    #[error("Transaction error: {0}")]
    Transaction(String),
    /// An error occurred in the underlying storage engine.
    #[error("Engine error: {0}")]
    Engine(String),
}

/// A specialized `Result` type for mapper operations.
///
/// This type alias is used throughout the crate to indicate operations that
/// may fail with a [`MapperError`].
pub type MapperResult<T> = Result<T, MapperError>;

impl From<BsonError> for MapperError {
    fn from(err: BsonError) -> Self {
        MapperError::Serialization(err.to_string())
    }
}
