//! Core traits and types for model declaration and document conversion.
//!
//! This module provides the fundamental trait that all mapped record types must
//! implement, as well as the namespace binding that ties a model to a database
//! and collection in the backing store.

use bson::{Document, de::deserialize_from_document, ser::serialize_to_document};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MapperError, MapperResult};

/// Core trait that all mapped record types must implement.
///
/// This trait defines the minimal interface required for a type to be used as
/// a model: a set of named, typed fields (via serde) and an optional binding
/// to a database and collection. A model whose binding is incomplete can still
/// be constructed and mutated locally, but any operation that needs to reach
/// the store will fail with [`MapperError::UnboundModel`].
///
/// # Deriving with `#[derive]`
///
/// The usual way to implement this trait is the `Model` derive macro together
/// with the serde derives for its super-traits:
///
/// # Example
///
/// ```ignore
/// use docmapper::Model;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Model)]
/// #[model(database = "appdb", collection = "users")]
/// pub struct User {
///     pub name: String,
///     pub email: String,
/// }
/// ```
pub trait Model: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns the name of the database this model is bound to, if declared.
    fn database_name() -> Option<&'static str>;

    /// Returns the name of the collection this model is bound to, if declared.
    fn collection_name() -> Option<&'static str>;

    /// Returns the name of the model type, used in error messages.
    fn model_name() -> &'static str;

    /// Resolves the fully qualified namespace for this model.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::UnboundModel`] if the model does not declare
    /// both a database name and a collection name.
    fn namespace() -> MapperResult<Namespace> {
        match (Self::database_name(), Self::collection_name()) {
            (Some(database), Some(collection)) => Ok(Namespace {
                database,
                collection,
            }),
            _ => Err(MapperError::UnboundModel(Self::model_name())),
        }
    }
}

/// A fully qualified storage location: a database name paired with a
/// collection name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// The database the collection lives in.
    pub database: &'static str,
    /// The collection documents are read from and written to.
    pub collection: &'static str,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Extension trait providing document conversion utilities for models.
///
/// This trait is automatically implemented for all types that implement
/// [`Model`]. Field names in the document form match the field names of the
/// struct, which is also how field descriptors address them in filters.
pub trait ModelExt: Model {
    /// Converts this model to its BSON document form for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_document(&self) -> MapperResult<Document>;

    /// Creates a model from its BSON document form.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_document(document: Document) -> MapperResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> MapperResult<Document> {
        Ok(serialize_to_document(self)?)
    }

    fn from_document(document: Document) -> MapperResult<Self> {
        Ok(deserialize_from_document(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Contact, Draft};

    #[test]
    fn namespace_resolves_for_bound_model() {
        let namespace = Contact::namespace().unwrap();
        assert_eq!(namespace.database, "crm");
        assert_eq!(namespace.collection, "contacts");
        assert_eq!(namespace.to_string(), "crm.contacts");
    }

    #[test]
    fn namespace_fails_for_unbound_model() {
        let err = Draft::namespace().unwrap_err();
        assert!(matches!(err, MapperError::UnboundModel("Draft")));
    }

    #[test]
    fn model_round_trips_through_document_form() {
        let contact = Contact::sample();
        let document = contact.to_document().unwrap();
        assert_eq!(document.get_str("name").unwrap(), "Ada");
        let restored = Contact::from_document(document).unwrap();
        assert_eq!(restored, contact);
    }
}
