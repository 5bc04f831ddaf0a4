//! Shared fixtures for the crate's unit tests.

use async_trait::async_trait;
use bson::Document;
use serde::{Deserialize, Serialize};

use crate::engine::{StorageEngine, TransactionScope};
use crate::error::{MapperError, MapperResult};
use crate::field::Field;
use crate::model::{Model, Namespace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Contact {
    pub(crate) name: String,
    pub(crate) age: i64,
}

impl Contact {
    pub(crate) const NAME: Field<Contact> = Field::new("name");
    pub(crate) const AGE: Field<Contact> = Field::new("age");

    pub(crate) fn sample() -> Self {
        Contact {
            name: "Ada".to_string(),
            age: 36,
        }
    }
}

impl Model for Contact {
    fn database_name() -> Option<&'static str> {
        Some("crm")
    }

    fn collection_name() -> Option<&'static str> {
        Some("contacts")
    }

    fn model_name() -> &'static str {
        "Contact"
    }
}

/// A model that declares a collection but no database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Draft {
    pub(crate) title: String,
}

impl Model for Draft {
    fn database_name() -> Option<&'static str> {
        None
    }

    fn collection_name() -> Option<&'static str> {
        Some("drafts")
    }

    fn model_name() -> &'static str {
        "Draft"
    }
}

/// Engine stub for tests that never reach a store.
#[derive(Debug)]
pub(crate) struct StubEngine;

#[async_trait]
impl StorageEngine for StubEngine {
    async fn begin(&self) -> MapperResult<Box<dyn TransactionScope>> {
        Err(MapperError::Engine("stub engine".to_string()))
    }

    async fn find_one(
        &self,
        _namespace: &Namespace,
        _filter: Document,
    ) -> MapperResult<Option<Document>> {
        Err(MapperError::Engine("stub engine".to_string()))
    }

    async fn find_many(
        &self,
        _namespace: &Namespace,
        _filter: Document,
        _offset: u64,
        _limit: Option<u64>,
    ) -> MapperResult<Vec<Document>> {
        Err(MapperError::Engine("stub engine".to_string()))
    }

    async fn insert_one(
        &self,
        _scope: &mut dyn TransactionScope,
        _namespace: &Namespace,
        _document: Document,
    ) -> MapperResult<String> {
        Err(MapperError::Engine("stub engine".to_string()))
    }

    async fn update_one(
        &self,
        _scope: &mut dyn TransactionScope,
        _namespace: &Namespace,
        _identity: &str,
        _set: Document,
    ) -> MapperResult<()> {
        Err(MapperError::Engine("stub engine".to_string()))
    }

    async fn delete_one(
        &self,
        _scope: &mut dyn TransactionScope,
        _namespace: &Namespace,
        _identity: &str,
    ) -> MapperResult<()> {
        Err(MapperError::Engine("stub engine".to_string()))
    }
}
