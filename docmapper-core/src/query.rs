//! Typed query construction and execution against a storage engine.
//!
//! This module provides the fluent builder that turns field predicates into a
//! filter document and runs it through an engine:
//!
//! ```ignore
//! let seniors = session
//!     .query::<User>()?
//!     .filter([User::FIELDS.age.gte(65)])?
//!     .offset(10)
//!     .limit(5)
//!     .all()
//!     .await?;
//! ```
//!
//! Builders are usually obtained from a session, which attaches every loaded
//! record to its unit of work. [`QueryBuilder::detached`] reads the same way
//! without a session for one-off lookups.

use std::sync::Arc;

use bson::Bson;

use crate::engine::StorageEngine;
use crate::error::{MapperError, MapperResult};
use crate::field::{Field, Predicate, filter_document};
use crate::model::{Model, Namespace};
use crate::record::Record;
use crate::session::SessionShared;

/// Number of documents [`QueryBuilder::all`] returns when no explicit limit
/// is set. The cap keeps an unconstrained query from dragging a whole
/// collection into memory.
pub const DEFAULT_LIMIT: u64 = 10;

/// A fluent query over the records of one model.
///
/// The builder accumulates predicates, an offset, and a limit, then executes
/// with [`first`](QueryBuilder::first) or [`all`](QueryBuilder::all).
/// Predicates against the same field merge into one operator map; see
/// [`filter_document`] for the translation rules.
pub struct QueryBuilder<'a, E: StorageEngine, M: Model> {
    engine: &'a E,
    namespace: Namespace,
    session: Option<Arc<SessionShared>>,
    predicates: Vec<Predicate<M>>,
    limit: u64,
    offset: u64,
}

impl<'a, E: StorageEngine, M: Model> QueryBuilder<'a, E, M> {
    pub(crate) fn new(
        engine: &'a E,
        namespace: Namespace,
        session: Option<Arc<SessionShared>>,
    ) -> Self {
        Self {
            engine,
            namespace,
            session,
            predicates: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Creates a query that reads directly from an engine, outside any
    /// session.
    ///
    /// Records loaded through a detached query are not attached to a unit of
    /// work; mutating them stays local.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::UnboundModel`] if the model does not declare a
    /// database and collection.
    pub fn detached(engine: &'a E) -> MapperResult<Self> {
        Ok(Self::new(engine, M::namespace()?, None))
    }

    /// Appends predicates to the query.
    ///
    /// # Arguments
    ///
    /// * `predicates` - One or more field predicates, all of which must match
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::EmptyFilter`] if the call contributes no
    /// predicates.
    pub fn filter(mut self, predicates: impl IntoIterator<Item = Predicate<M>>) -> MapperResult<Self> {
        let before = self.predicates.len();
        self.predicates.extend(predicates);
        if self.predicates.len() == before {
            return Err(MapperError::EmptyFilter);
        }
        Ok(self)
    }

    /// Appends an equality predicate on one field.
    ///
    /// # Arguments
    ///
    /// * `field` - The field descriptor to compare
    /// * `value` - The value the field must equal
    pub fn filter_by(mut self, field: Field<M>, value: impl Into<Bson>) -> Self {
        self.predicates.push(field.eq(value));
        self
    }

    /// Sets the maximum number of records [`all`](QueryBuilder::all) returns.
    ///
    /// Defaults to [`DEFAULT_LIMIT`].
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the number of matching records to skip before returning any.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Executes the query and returns the first matching record.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::NotFound`] if no document matches.
    pub async fn first(self) -> MapperResult<Record<M>> {
        let filter = filter_document(&self.predicates);
        tracing::debug!(namespace = %self.namespace, "executing first() query");
        match self.engine.find_one(&self.namespace, filter).await? {
            Some(raw) => self.make_record(raw),
            None => Err(MapperError::NotFound(self.namespace.collection.to_string())),
        }
    }

    /// Executes the query and returns every matching record within the
    /// offset and limit window, in the engine's natural order.
    ///
    /// An empty result is not an error.
    pub async fn all(self) -> MapperResult<Vec<Record<M>>> {
        let filter = filter_document(&self.predicates);
        tracing::debug!(
            namespace = %self.namespace,
            offset = self.offset,
            limit = self.limit,
            "executing all() query"
        );
        let raws = self
            .engine
            .find_many(&self.namespace, filter, self.offset, Some(self.limit))
            .await?;
        raws.into_iter().map(|raw| self.make_record(raw)).collect()
    }

    fn make_record(&self, raw: bson::Document) -> MapperResult<Record<M>> {
        let record = Record::from_document(raw)?;
        if let Some(session) = &self.session {
            record.attach(Arc::downgrade(session));
        }
        Ok(record)
    }
}
