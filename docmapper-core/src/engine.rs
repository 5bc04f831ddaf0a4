//! Storage engine traits for pluggable document store implementations.
//!
//! This module defines the abstract interface that all storage engines must
//! implement. Sessions and query builders are written against these traits,
//! so the same mapping layer runs unchanged on top of an in-memory store or
//! a real document database.

use async_trait::async_trait;
use bson::Document;
use std::any::Any;
use std::fmt::Debug;

use crate::error::MapperResult;
use crate::model::Namespace;

/// Backend interface every storage engine must implement.
///
/// An engine is a handle to one document store and exposes the small set of
/// primitives sessions and queries are built from. Engines are safe to share:
/// one engine value (or clones of it) may serve several sessions concurrently.
/// All mutating primitives go through a [`TransactionScope`] so a session can
/// apply its pending operations atomically.
#[async_trait]
pub trait StorageEngine: Send + Sync + Debug {
    /// Opens a new transaction scope on this engine.
    ///
    /// Operations staged in the scope take effect only when the scope is
    /// committed; an aborted scope leaves the store untouched.
    async fn begin(&self) -> MapperResult<Box<dyn TransactionScope>>;

    /// Returns the first document in the namespace matching the filter, in
    /// the engine's natural order.
    async fn find_one(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> MapperResult<Option<Document>>;

    /// Returns the documents in the namespace matching the filter, skipping
    /// the first `offset` matches and returning at most `limit` documents.
    async fn find_many(
        &self,
        namespace: &Namespace,
        filter: Document,
        offset: u64,
        limit: Option<u64>,
    ) -> MapperResult<Vec<Document>>;

    /// Stages an insert of the document within the scope and returns the
    /// stringified identity assigned to the new document.
    async fn insert_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        document: Document,
    ) -> MapperResult<String>;

    /// Stages a field-level update of the identified document within the
    /// scope. Keys of `set` are field names and values are the replacement
    /// field values; fields not named in `set` are left as they are.
    async fn update_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        identity: &str,
        set: Document,
    ) -> MapperResult<()>;

    /// Stages a delete of the identified document within the scope.
    async fn delete_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        identity: &str,
    ) -> MapperResult<()>;
}

/// A single atomic unit of work on a storage engine.
///
/// Scopes are created by [`StorageEngine::begin`] and consumed by exactly one
/// of [`commit`](TransactionScope::commit) or
/// [`abort`](TransactionScope::abort). A scope must only be handed back to
/// the engine that created it; engines reject foreign scopes with a
/// transaction error.
#[async_trait]
pub trait TransactionScope: Send {
    /// Commits the scope, making every staged operation visible atomically.
    async fn commit(self: Box<Self>) -> MapperResult<()>;

    /// Aborts the scope, discarding every staged operation.
    async fn abort(self: Box<Self>) -> MapperResult<()>;

    /// Returns a mutable reference to the scope as a generic `Any` type.
    ///
    /// Engines use this to recover their concrete scope type from the trait
    /// object sessions carry.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Builder trait for constructing storage engine instances.
///
/// Implementations hold engine-specific configuration, such as a connection
/// string, and produce a ready-to-use engine.
///
/// # Example
///
/// ```ignore
/// use docmapper::engine::EngineBuilder;
/// use docmapper::mongodb::MongoEngineBuilder;
///
/// let engine = MongoEngineBuilder::new("mongodb://localhost:27017")
///     .build()
///     .await?;
/// ```
#[async_trait]
pub trait EngineBuilder {
    /// The engine type this builder produces.
    type Engine: StorageEngine;

    /// Consumes the builder and constructs the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be initialized, for example when
    /// a connection string cannot be parsed.
    async fn build(self) -> MapperResult<Self::Engine>;
}
