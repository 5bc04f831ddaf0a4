//! Record handles pairing a model value with identity and session state.
//!
//! A [`Record`] wraps one model value together with the store identity it was
//! loaded or inserted under, and an optional binding to the session that owns
//! its pending writes. Records are the unit sessions insert, update, and
//! delete.

use bson::{Bson, Document};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::error::MapperResult;
use crate::field::Field;
use crate::model::{Model, ModelExt};
use crate::session::SessionShared;

struct RecordState<M> {
    inner: M,
    identity: Option<String>,
    session: Option<Weak<SessionShared>>,
}

/// A shared handle to one mapped record.
///
/// Cloning a record clones the handle, not the value: every clone observes
/// the same model state, identity, and session binding. A freshly constructed
/// record is detached and has no identity; loading through a session query or
/// committing a pending insert attaches it and fills the identity in.
///
/// The session binding is weak. When the owning session goes away the record
/// simply becomes detached again; it never keeps a session alive.
pub struct Record<M> {
    state: Arc<Mutex<RecordState<M>>>,
}

impl<M: Model> Record<M> {
    /// Creates a detached record holding the given model value.
    pub fn new(inner: M) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecordState {
                inner,
                identity: None,
                session: None,
            })),
        }
    }

    /// Creates a record from a stored document.
    ///
    /// The reserved `_id` entry is split off and kept as the record identity:
    /// native object ids are stringified to their hex form and string ids are
    /// kept as-is. A document with no `_id`, or an `_id` of any other type,
    /// produces a record without identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the remaining document does not deserialize into
    /// the model type.
    pub fn from_document(mut document: Document) -> MapperResult<Self> {
        let identity = match document.remove("_id") {
            Some(Bson::ObjectId(oid)) => Some(oid.to_hex()),
            Some(Bson::String(id)) => Some(id),
            _ => None,
        };
        let inner = M::from_document(document)?;
        Ok(Self {
            state: Arc::new(Mutex::new(RecordState {
                inner,
                identity,
                session: None,
            })),
        })
    }

    /// Returns a clone of the current model value.
    pub fn snapshot(&self) -> M {
        self.state.lock().inner.clone()
    }

    /// Returns the record's store identity, if it has one.
    pub fn identity(&self) -> Option<String> {
        self.state.lock().identity.clone()
    }

    /// Returns whether the record is currently bound to a live session.
    pub fn is_attached(&self) -> bool {
        self.state
            .lock()
            .session
            .as_ref()
            .is_some_and(|session| session.strong_count() > 0)
    }

    /// Writes a new value into one field of the record.
    ///
    /// The write is validated by round-tripping the model through its
    /// document form, so a value the field's type cannot represent is
    /// rejected and the record is left unchanged. On an attached record the
    /// write is also logged in the owning session's pending updates; on a
    /// detached record it only mutates the local value.
    ///
    /// # Arguments
    ///
    /// * `field` - Descriptor of the field to write.
    /// * `value` - The new field value.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Serialization`](crate::error::MapperError) if
    /// the model does not accept the new value.
    pub fn set(&self, field: Field<M>, value: impl Into<Bson>) -> MapperResult<()> {
        let value = value.into();
        let session = {
            let mut state = self.state.lock();
            let mut document = state.inner.to_document()?;
            document.insert(field.name(), value.clone());
            state.inner = M::from_document(document)?;
            state.session.as_ref().and_then(Weak::upgrade)
        };
        if let Some(shared) = session {
            shared.log_update(
                M::namespace()?,
                Box::new(self.clone()),
                field.name().to_string(),
                value,
            );
        }
        Ok(())
    }

    pub(crate) fn attach(&self, session: Weak<SessionShared>) {
        self.state.lock().session = Some(session);
    }
}

impl<M> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

/// Type-erased record handle used by session pending logs.
///
/// Sessions log records of different model types in one queue; this trait is
/// the narrow surface the commit routine needs from them.
pub(crate) trait AnyRecord: Send + Sync {
    /// Serializes the current model value to its document form.
    fn dump(&self) -> MapperResult<Document>;

    /// Returns the record's identity, if it has one.
    fn identity(&self) -> Option<String>;

    /// Stores the identity assigned by the engine.
    fn assign_identity(&self, identity: String);

    /// Binds the record to a session's pending log.
    fn attach(&self, session: Weak<SessionShared>);

    /// Clones the handle into a new boxed `AnyRecord`.
    fn clone_box(&self) -> Box<dyn AnyRecord>;
}

impl<M: Model> AnyRecord for Record<M> {
    fn dump(&self) -> MapperResult<Document> {
        self.state.lock().inner.to_document()
    }

    fn identity(&self) -> Option<String> {
        Record::identity(self)
    }

    fn assign_identity(&self, identity: String) {
        self.state.lock().identity = Some(identity);
    }

    fn attach(&self, session: Weak<SessionShared>) {
        Record::attach(self, session);
    }

    fn clone_box(&self) -> Box<dyn AnyRecord> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn AnyRecord> {
    fn clone(&self) -> Box<dyn AnyRecord> {
        self.clone_box()
    }
}
