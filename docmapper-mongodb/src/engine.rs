//! MongoDB storage engine backed by the official async driver.

use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, ClientSession, Collection};
use std::any::Any;

use docmapper_core::engine::{EngineBuilder, StorageEngine, TransactionScope};
use docmapper_core::error::{MapperError, MapperResult};
use docmapper_core::model::Namespace;

use crate::filter::{identity_bson, rewrite_identity, stringify_identity};

/// Storage engine over a MongoDB deployment.
///
/// The engine holds one client and addresses whichever database and
/// collection each model's namespace names. Cloning shares the underlying
/// connection pool.
#[derive(Clone, Debug)]
pub struct MongoEngine {
    client: Client,
}

impl MongoEngine {
    /// Creates an engine over an already-connected client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a builder that connects via a connection string.
    pub fn builder(dsn: impl Into<String>) -> MongoEngineBuilder {
        MongoEngineBuilder::new(dsn)
    }

    fn collection(&self, namespace: &Namespace) -> Collection<Document> {
        self.client
            .database(namespace.database)
            .collection(namespace.collection)
    }
}

fn downcast_scope(scope: &mut dyn TransactionScope) -> MapperResult<&mut MongoScope> {
    scope
        .as_any_mut()
        .downcast_mut::<MongoScope>()
        .ok_or_else(|| {
            MapperError::Transaction("transaction scope was not opened by this engine".to_string())
        })
}

#[async_trait]
impl StorageEngine for MongoEngine {
    async fn begin(&self) -> MapperResult<Box<dyn TransactionScope>> {
        tracing::debug!("starting mongodb transaction");
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))?;
        session
            .start_transaction()
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))?;
        Ok(Box::new(MongoScope { session }))
    }

    async fn find_one(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> MapperResult<Option<Document>> {
        self.collection(namespace)
            .find_one(rewrite_identity(filter))
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))
    }

    async fn find_many(
        &self,
        namespace: &Namespace,
        filter: Document,
        offset: u64,
        limit: Option<u64>,
    ) -> MapperResult<Vec<Document>> {
        let mut options = FindOptions::default();
        if offset > 0 {
            options.skip = Some(offset);
        }
        options.limit = limit.map(|limit| limit as i64);

        self.collection(namespace)
            .find(rewrite_identity(filter))
            .with_options(options)
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))
    }

    async fn insert_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        document: Document,
    ) -> MapperResult<String> {
        let scope = downcast_scope(scope)?;
        let result = self
            .collection(namespace)
            .insert_one(document)
            .session(&mut scope.session)
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))?;
        stringify_identity(result.inserted_id)
    }

    async fn update_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        identity: &str,
        set: Document,
    ) -> MapperResult<()> {
        let scope = downcast_scope(scope)?;
        self.collection(namespace)
            .update_one(doc! { "_id": identity_bson(identity) }, doc! { "$set": set })
            .session(&mut scope.session)
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))?;
        Ok(())
    }

    async fn delete_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        identity: &str,
    ) -> MapperResult<()> {
        let scope = downcast_scope(scope)?;
        self.collection(namespace)
            .delete_one(doc! { "_id": identity_bson(identity) })
            .session(&mut scope.session)
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))?;
        Ok(())
    }
}

/// Transaction scope wrapping one MongoDB client session.
pub struct MongoScope {
    session: ClientSession,
}

#[async_trait]
impl TransactionScope for MongoScope {
    async fn commit(mut self: Box<Self>) -> MapperResult<()> {
        self.session
            .commit_transaction()
            .await
            .map_err(|e| MapperError::Transaction(e.to_string()))
    }

    async fn abort(mut self: Box<Self>) -> MapperResult<()> {
        self.session
            .abort_transaction()
            .await
            .map_err(|e| MapperError::Transaction(e.to_string()))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Builder for [`MongoEngine`] instances from a connection string.
pub struct MongoEngineBuilder {
    dsn: String,
}

impl MongoEngineBuilder {
    /// Creates a builder for the given connection string.
    pub fn new(dsn: impl Into<String>) -> Self {
        Self { dsn: dsn.into() }
    }
}

#[async_trait]
impl EngineBuilder for MongoEngineBuilder {
    type Engine = MongoEngine;

    async fn build(self) -> MapperResult<Self::Engine> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| MapperError::Engine(e.to_string()))?;
        let client =
            Client::with_options(options).map_err(|e| MapperError::Engine(e.to_string()))?;
        Ok(MongoEngine::new(client))
    }
}
