//! Thread-safe in-memory storage engine.

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use docmapper_core::engine::{EngineBuilder, StorageEngine, TransactionScope};
use docmapper_core::error::{MapperError, MapperResult};
use docmapper_core::model::Namespace;

use crate::matcher;

/// Documents of one collection, keyed by identity, in insertion order.
type CollectionEntries = Vec<(String, Document)>;
/// Collections keyed by their fully qualified namespace.
type StoreMap = HashMap<String, CollectionEntries>;

/// A thread-safe, in-memory storage engine.
///
/// Collections keep documents in insertion order, so paging through an
/// unfiltered query is deterministic. Cloning the engine clones a handle to
/// the same store, which lets several sessions share one store.
///
/// Writes are buffered in a [`MemoryScope`] and applied under a single write
/// lock on commit; readers never observe a half-applied commit.
#[derive(Default, Clone, Debug)]
pub struct MemoryEngine {
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryEngine {
    /// Creates an engine over a fresh, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder producing engines over fresh stores.
    pub fn builder() -> MemoryEngineBuilder {
        MemoryEngineBuilder
    }
}

fn downcast_scope(scope: &mut dyn TransactionScope) -> MapperResult<&mut MemoryScope> {
    scope
        .as_any_mut()
        .downcast_mut::<MemoryScope>()
        .ok_or_else(|| {
            MapperError::Transaction("transaction scope was not opened by this engine".to_string())
        })
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    async fn begin(&self) -> MapperResult<Box<dyn TransactionScope>> {
        Ok(Box::new(MemoryScope {
            store: self.store.clone(),
            ops: Vec::new(),
        }))
    }

    async fn find_one(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> MapperResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(entries) = store.get(&namespace.to_string()) else {
            return Ok(None);
        };
        for (_, document) in entries {
            if matcher::matches(document, &filter)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn find_many(
        &self,
        namespace: &Namespace,
        filter: Document,
        offset: u64,
        limit: Option<u64>,
    ) -> MapperResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(entries) = store.get(&namespace.to_string()) else {
            return Ok(Vec::new());
        };
        let mut matched = Vec::new();
        for (_, document) in entries {
            if matcher::matches(document, &filter)? {
                matched.push(document.clone());
            }
        }
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(limit.map_or(usize::MAX, |limit| limit as usize))
            .collect())
    }

    async fn insert_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        document: Document,
    ) -> MapperResult<String> {
        let scope = downcast_scope(scope)?;
        // The identity is generated at staging time so callers can hold it
        // before the scope commits.
        let identity = ObjectId::new().to_hex();
        scope.ops.push(BufferedOp::Insert {
            namespace: namespace.to_string(),
            identity: identity.clone(),
            document,
        });
        Ok(identity)
    }

    async fn update_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        identity: &str,
        set: Document,
    ) -> MapperResult<()> {
        let scope = downcast_scope(scope)?;
        scope.ops.push(BufferedOp::Update {
            namespace: namespace.to_string(),
            identity: identity.to_string(),
            set,
        });
        Ok(())
    }

    async fn delete_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        identity: &str,
    ) -> MapperResult<()> {
        let scope = downcast_scope(scope)?;
        scope.ops.push(BufferedOp::Delete {
            namespace: namespace.to_string(),
            identity: identity.to_string(),
        });
        Ok(())
    }
}

enum BufferedOp {
    Insert {
        namespace: String,
        identity: String,
        document: Document,
    },
    Update {
        namespace: String,
        identity: String,
        set: Document,
    },
    Delete {
        namespace: String,
        identity: String,
    },
}

/// Buffered unit of work over a [`MemoryEngine`] store.
///
/// Updates and deletes addressing an identity that no longer exists at
/// commit time are applied as no-ops, matching how a document database
/// treats writes to missing documents.
pub struct MemoryScope {
    store: Arc<RwLock<StoreMap>>,
    ops: Vec<BufferedOp>,
}

#[async_trait]
impl TransactionScope for MemoryScope {
    async fn commit(self: Box<Self>) -> MapperResult<()> {
        tracing::debug!(operations = self.ops.len(), "committing buffered operations");
        let mut store = self.store.write().await;
        for op in self.ops {
            match op {
                BufferedOp::Insert {
                    namespace,
                    identity,
                    mut document,
                } => {
                    document.insert("_id", identity.clone());
                    store
                        .entry(namespace)
                        .or_default()
                        .push((identity, document));
                }
                BufferedOp::Update {
                    namespace,
                    identity,
                    set,
                } => {
                    if let Some((_, document)) = store
                        .get_mut(&namespace)
                        .and_then(|entries| entries.iter_mut().find(|(id, _)| *id == identity))
                    {
                        for (field, value) in set {
                            document.insert(field, value);
                        }
                    }
                }
                BufferedOp::Delete {
                    namespace,
                    identity,
                } => {
                    if let Some(entries) = store.get_mut(&namespace) {
                        entries.retain(|(id, _)| *id != identity);
                    }
                }
            }
        }
        Ok(())
    }

    async fn abort(self: Box<Self>) -> MapperResult<()> {
        tracing::debug!(operations = self.ops.len(), "discarding buffered operations");
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Builder for [`MemoryEngine`] instances.
#[derive(Default)]
pub struct MemoryEngineBuilder;

#[async_trait]
impl EngineBuilder for MemoryEngineBuilder {
    type Engine = MemoryEngine;

    async fn build(self) -> MapperResult<Self::Engine> {
        Ok(MemoryEngine::new())
    }
}
