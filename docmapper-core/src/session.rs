//! Unit-of-work sessions batching writes against a storage engine.
//!
//! A [`Session`] collects inserts, field-level updates, and deletes in three
//! ordered pending logs and applies them in one transaction scope when
//! committed. Records loaded through a session are attached to it, so
//! mutating them logs updates into the same unit of work.

use bson::{Bson, doc};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::engine::{StorageEngine, TransactionScope};
use crate::error::{MapperError, MapperResult};
use crate::model::{Model, Namespace};
use crate::query::QueryBuilder;
use crate::record::{AnyRecord, Record};

#[derive(Clone)]
pub(crate) struct PendingInsert {
    pub(crate) namespace: Namespace,
    pub(crate) record: Box<dyn AnyRecord>,
}

#[derive(Clone)]
pub(crate) struct PendingUpdate {
    pub(crate) namespace: Namespace,
    pub(crate) record: Box<dyn AnyRecord>,
    pub(crate) field: String,
    pub(crate) value: Bson,
}

#[derive(Clone)]
pub(crate) struct PendingDelete {
    pub(crate) namespace: Namespace,
    pub(crate) record: Box<dyn AnyRecord>,
}

/// The three pending logs of a session, in the order they are applied.
#[derive(Default, Clone)]
pub(crate) struct PendingOps {
    pub(crate) inserts: Vec<PendingInsert>,
    pub(crate) updates: Vec<PendingUpdate>,
    pub(crate) deletes: Vec<PendingDelete>,
}

impl PendingOps {
    fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// State shared between a session and the records attached to it.
///
/// Records hold this behind a `Weak`, so a dropped session detaches its
/// records instead of being kept alive by them.
pub(crate) struct SessionShared {
    pending: Mutex<PendingOps>,
}

impl SessionShared {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(PendingOps::default()),
        }
    }

    pub(crate) fn log_insert(&self, namespace: Namespace, record: Box<dyn AnyRecord>) {
        self.pending
            .lock()
            .inserts
            .push(PendingInsert { namespace, record });
    }

    pub(crate) fn log_update(
        &self,
        namespace: Namespace,
        record: Box<dyn AnyRecord>,
        field: String,
        value: Bson,
    ) {
        self.pending.lock().updates.push(PendingUpdate {
            namespace,
            record,
            field,
            value,
        });
    }

    pub(crate) fn log_delete(&self, namespace: Namespace, record: Box<dyn AnyRecord>) {
        self.pending
            .lock()
            .deletes
            .push(PendingDelete { namespace, record });
    }

    pub(crate) fn snapshot(&self) -> PendingOps {
        self.pending.lock().clone()
    }

    pub(crate) fn clear(&self) {
        let mut pending = self.pending.lock();
        pending.inserts.clear();
        pending.updates.clear();
        pending.deletes.clear();
    }
}

/// A unit of work over one storage engine.
///
/// Sessions batch writes: [`add`](Session::add) and
/// [`delete`](Session::delete) only log pending operations, and mutating an
/// attached record logs a field update. Nothing reaches the store until
/// [`commit`](Session::commit), which applies all pending operations inside a
/// single transaction scope, in log order: inserts, then updates, then
/// deletes. The logs are cleared only after the scope commits, so a failed
/// commit can be retried with the unit of work intact.
///
/// # Example
///
/// ```ignore
/// use docmapper::prelude::*;
/// use docmapper::memory::MemoryEngine;
///
/// let mut session = Session::new(MemoryEngine::new());
///
/// let user = Record::new(User {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
/// });
/// session.add(&user)?;
/// session.commit().await?;
///
/// let found = session
///     .query::<User>()?
///     .filter_by(User::FIELDS.name, "Ada")
///     .first()
///     .await?;
/// found.set(User::FIELDS.email, "ada@example.org")?;
/// session.commit().await?;
/// ```
pub struct Session<E: StorageEngine> {
    engine: E,
    shared: Arc<SessionShared>,
    scope: Option<Box<dyn TransactionScope>>,
}

impl<E: StorageEngine> Session<E> {
    /// Creates a session over the given engine with empty pending logs.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            shared: Arc::new(SessionShared::new()),
            scope: None,
        }
    }

    /// Starts a query for records of `M` through this session.
    ///
    /// Records returned by the query are attached to this session.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::UnboundModel`] if the model does not declare a
    /// database and collection.
    pub fn query<M: Model>(&self) -> MapperResult<QueryBuilder<'_, E, M>> {
        Ok(QueryBuilder::new(
            &self.engine,
            M::namespace()?,
            Some(self.shared.clone()),
        ))
    }

    /// Logs a pending insert of the record.
    ///
    /// The record is written to the store on the next commit, which also
    /// assigns its identity and attaches it to this session.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::UnboundModel`] if the model does not declare a
    /// database and collection.
    pub fn add<M: Model>(&self, record: &Record<M>) -> MapperResult<()> {
        let namespace = M::namespace()?;
        self.shared.log_insert(namespace, Box::new(record.clone()));
        Ok(())
    }

    /// Logs a pending delete of the record.
    ///
    /// The record must have an identity by the time the session commits.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::UnboundModel`] if the model does not declare a
    /// database and collection.
    pub fn delete<M: Model>(&self, record: &Record<M>) -> MapperResult<()> {
        let namespace = M::namespace()?;
        self.shared.log_delete(namespace, Box::new(record.clone()));
        Ok(())
    }

    /// Returns whether an explicitly opened transaction scope is active.
    pub fn in_transaction(&self) -> bool {
        self.scope.is_some()
    }

    /// Opens a transaction scope that the next commit will use.
    ///
    /// Without an explicit scope, [`commit`](Session::commit) opens and
    /// commits one by itself.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Transaction`] if a scope is already open on
    /// this session.
    pub async fn begin(&mut self) -> MapperResult<()> {
        if self.scope.is_some() {
            return Err(MapperError::Transaction(
                "a transaction scope is already open on this session".to_string(),
            ));
        }
        self.scope = Some(self.engine.begin().await?);
        Ok(())
    }

    /// Applies all pending operations and commits them atomically.
    ///
    /// Uses the explicitly opened scope if there is one, otherwise opens a
    /// scope just for this commit. On success the pending logs are cleared;
    /// on failure the scope is aborted, the logs are kept, and the commit can
    /// be retried.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered while applying or committing. A
    /// record pending update or delete without an identity produces
    /// [`MapperError::MissingIdentity`].
    pub async fn commit(&mut self) -> MapperResult<()> {
        let mut scope = match self.scope.take() {
            Some(scope) => scope,
            None => self.engine.begin().await?,
        };
        match self.apply_pending(scope.as_mut()).await {
            Ok(()) => {
                scope.commit().await?;
                self.shared.clear();
                Ok(())
            }
            Err(err) => {
                if let Err(abort_err) = scope.abort().await {
                    tracing::debug!(error = %abort_err, "scope abort after failed apply also failed");
                }
                Err(err)
            }
        }
    }

    /// Discards all pending operations and aborts any open scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the open scope fails to abort. The pending logs
    /// are cleared regardless.
    pub async fn rollback(&mut self) -> MapperResult<()> {
        tracing::debug!("rolling back session");
        let scope = self.scope.take();
        self.shared.clear();
        if let Some(scope) = scope {
            scope.abort().await?;
        }
        Ok(())
    }

    /// Closes the session, aborting any open scope.
    ///
    /// Dropping the session detaches every record that was attached to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the open scope fails to abort.
    pub async fn close(mut self) -> MapperResult<()> {
        if let Some(scope) = self.scope.take() {
            scope.abort().await?;
        }
        Ok(())
    }

    async fn apply_pending(&self, scope: &mut dyn TransactionScope) -> MapperResult<()> {
        let pending = self.shared.snapshot();
        if !pending.is_empty() {
            tracing::debug!(
                inserts = pending.inserts.len(),
                updates = pending.updates.len(),
                deletes = pending.deletes.len(),
                "applying pending operations"
            );
        }
        for insert in &pending.inserts {
            let document = insert.record.dump()?;
            let identity = self
                .engine
                .insert_one(scope, &insert.namespace, document)
                .await?;
            insert.record.assign_identity(identity);
            insert.record.attach(Arc::downgrade(&self.shared));
        }
        for update in &pending.updates {
            let identity = update.record.identity().ok_or_else(|| {
                MapperError::MissingIdentity(update.namespace.collection.to_string())
            })?;
            let set = doc! { update.field.clone(): update.value.clone() };
            self.engine
                .update_one(scope, &update.namespace, &identity, set)
                .await?;
        }
        for delete in &pending.deletes {
            let identity = delete.record.identity().ok_or_else(|| {
                MapperError::MissingIdentity(delete.namespace.collection.to_string())
            })?;
            self.engine
                .delete_one(scope, &delete.namespace, &identity)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Contact, Draft, StubEngine};

    fn contact() -> Record<Contact> {
        Record::new(Contact::sample())
    }

    #[test]
    fn add_logs_a_pending_insert_under_the_model_namespace() {
        let session = Session::new(StubEngine);
        session.add(&contact()).unwrap();

        let pending = session.shared.snapshot();
        assert_eq!(pending.inserts.len(), 1);
        assert_eq!(pending.inserts[0].namespace.to_string(), "crm.contacts");
        assert!(pending.updates.is_empty());
        assert!(pending.deletes.is_empty());
    }

    #[test]
    fn delete_logs_a_pending_delete() {
        let session = Session::new(StubEngine);
        session.delete(&contact()).unwrap();

        let pending = session.shared.snapshot();
        assert_eq!(pending.deletes.len(), 1);
        assert!(pending.inserts.is_empty());
    }

    #[test]
    fn unbound_models_are_rejected_before_anything_is_logged() {
        let session = Session::new(StubEngine);
        let draft = Record::new(Draft {
            title: "untitled".to_string(),
        });

        let err = session.add(&draft).unwrap_err();
        assert!(matches!(err, MapperError::UnboundModel("Draft")));
        let err = session.delete(&draft).unwrap_err();
        assert!(matches!(err, MapperError::UnboundModel("Draft")));
        let Err(err) = session.query::<Draft>() else {
            panic!("query over an unbound model must fail");
        };
        assert!(matches!(err, MapperError::UnboundModel("Draft")));
        assert!(session.shared.snapshot().is_empty());
    }

    #[test]
    fn records_loaded_through_a_query_share_the_session_log() {
        let session = Session::new(StubEngine);
        let record = contact();
        record.attach(Arc::downgrade(&session.shared));

        record.set(Contact::AGE, 40).unwrap();
        let pending = session.shared.snapshot();
        assert_eq!(pending.updates.len(), 1);
        assert_eq!(pending.updates[0].field, "age");
    }

    #[test]
    fn sessions_do_not_share_pending_logs() {
        let first = Session::new(StubEngine);
        let second = Session::new(StubEngine);
        first.add(&contact()).unwrap();

        assert_eq!(first.shared.snapshot().inserts.len(), 1);
        assert!(second.shared.snapshot().is_empty());
    }
}
