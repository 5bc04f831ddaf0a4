//! Integration tests driving the session and query surface end to end
//! against the in-memory engine.

use async_trait::async_trait;
use bson::Document;
use chrono::{DateTime, TimeZone, Utc};
use docmapper::memory::MemoryEngine;
use docmapper::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Model, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[model(database = "crm", collection = "users")]
struct User {
    name: String,
    email: String,
    age: i64,
    created_at: DateTime<Utc>,
}

fn user(name: &str, age: i64) -> User {
    User {
        name: name.to_string(),
        email: format!("{name}@example.com"),
        age,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
    }
}

async fn seeded_session(users: Vec<User>) -> Session<MemoryEngine> {
    let mut session = Session::new(MemoryEngine::new());
    for value in users {
        session.add(&Record::new(value)).unwrap();
    }
    session.commit().await.unwrap();
    session
}

#[tokio::test]
async fn added_records_round_trip_through_commit() {
    let mut session = Session::new(MemoryEngine::new());
    let record = Record::new(user("ada", 36));
    session.add(&record).unwrap();

    // Nothing reaches the store before commit.
    assert!(record.identity().is_none());
    session.commit().await.unwrap();
    assert!(record.identity().is_some_and(|id| !id.is_empty()));
    assert!(record.is_attached());

    let loaded = session
        .query::<User>()
        .unwrap()
        .filter_by(User::FIELDS.name, "ada")
        .first()
        .await
        .unwrap();
    assert_eq!(loaded.snapshot(), user("ada", 36));
    assert_eq!(loaded.identity(), record.identity());
}

#[tokio::test]
async fn first_without_match_is_not_found_but_all_is_empty() {
    let session = Session::new(MemoryEngine::new());

    let result = session
        .query::<User>()
        .unwrap()
        .filter_by(User::FIELDS.name, "nobody")
        .first()
        .await;
    assert!(matches!(result, Err(MapperError::NotFound(_))));

    let all = session
        .query::<User>()
        .unwrap()
        .filter_by(User::FIELDS.name, "nobody")
        .all()
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn mutations_on_loaded_records_persist_only_that_field() {
    let mut session = seeded_session(vec![user("ada", 36)]).await;

    let loaded = session
        .query::<User>()
        .unwrap()
        .filter_by(User::FIELDS.name, "ada")
        .first()
        .await
        .unwrap();
    assert!(loaded.is_attached());

    loaded.set(User::FIELDS.email, "ada@example.org").unwrap();
    session.commit().await.unwrap();

    let reread = session
        .query::<User>()
        .unwrap()
        .filter_by(User::FIELDS.name, "ada")
        .first()
        .await
        .unwrap()
        .snapshot();
    assert_eq!(reread.email, "ada@example.org");
    assert_eq!(reread.name, "ada");
    assert_eq!(reread.age, 36);
}

#[tokio::test]
async fn detached_records_never_join_a_unit_of_work() {
    let engine = MemoryEngine::new();
    let mut session = Session::new(engine.clone());
    session.add(&Record::new(user("ada", 36))).unwrap();
    session.commit().await.unwrap();

    let detached = QueryBuilder::<MemoryEngine, User>::detached(&engine)
        .unwrap()
        .filter_by(User::FIELDS.name, "ada")
        .first()
        .await
        .unwrap();
    assert!(!detached.is_attached());

    // Mutations stay local and survive no commit.
    detached.set(User::FIELDS.age, 99).unwrap();
    assert_eq!(detached.snapshot().age, 99);
    session.commit().await.unwrap();

    let reread = QueryBuilder::<MemoryEngine, User>::detached(&engine)
        .unwrap()
        .filter_by(User::FIELDS.name, "ada")
        .first()
        .await
        .unwrap();
    assert_eq!(reread.snapshot().age, 36);
}

#[tokio::test]
async fn deletes_remove_the_document() {
    let mut session = seeded_session(vec![user("ada", 36), user("grace", 41)]).await;

    let loaded = session
        .query::<User>()
        .unwrap()
        .filter_by(User::FIELDS.name, "ada")
        .first()
        .await
        .unwrap();
    let identity = loaded.identity().unwrap();

    session.delete(&loaded).unwrap();
    session.commit().await.unwrap();

    let result = session
        .query::<User>()
        .unwrap()
        .filter([Field::identity().eq(identity)])
        .unwrap()
        .first()
        .await;
    assert!(matches!(result, Err(MapperError::NotFound(_))));

    let remaining = session.query::<User>().unwrap().all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].snapshot().name, "grace");
}

#[tokio::test]
async fn sessions_are_independent_units_of_work() {
    let engine = MemoryEngine::new();
    let mut first = Session::new(engine.clone());
    let second = Session::new(engine.clone());

    first.add(&Record::new(user("ada", 36))).unwrap();

    // Staged work is invisible to the other session until commit.
    let before = second.query::<User>().unwrap().all().await.unwrap();
    assert!(before.is_empty());

    first.commit().await.unwrap();

    let after = second.query::<User>().unwrap().all().await.unwrap();
    assert_eq!(after.len(), 1);
}

#[tokio::test]
async fn offset_and_limit_window_results_in_insertion_order() {
    let users: Vec<User> = (0..10)
        .map(|i| user(&format!("user-{i}"), 20 + i))
        .collect();
    let session = seeded_session(users).await;

    let page = session
        .query::<User>()
        .unwrap()
        .offset(2)
        .limit(3)
        .all()
        .await
        .unwrap();

    let names: Vec<String> = page.iter().map(|record| record.snapshot().name).collect();
    assert_eq!(names, ["user-2", "user-3", "user-4"]);
}

#[tokio::test]
async fn explicit_scopes_commit_once_and_do_not_nest() {
    let mut session = Session::new(MemoryEngine::new());

    assert!(!session.in_transaction());
    session.begin().await.unwrap();
    assert!(session.in_transaction());

    let err = session.begin().await.unwrap_err();
    assert!(matches!(err, MapperError::Transaction(_)));
    assert!(session.in_transaction());

    session.add(&Record::new(user("ada", 36))).unwrap();
    session.commit().await.unwrap();
    assert!(!session.in_transaction());

    let found = session
        .query::<User>()
        .unwrap()
        .filter_by(User::FIELDS.name, "ada")
        .first()
        .await
        .unwrap();
    assert_eq!(found.snapshot().age, 36);
}

#[tokio::test]
async fn rollback_discards_staged_work_and_the_open_scope() {
    let mut session = Session::new(MemoryEngine::new());
    session.begin().await.unwrap();
    session.add(&Record::new(user("ada", 36))).unwrap();

    session.rollback().await.unwrap();
    assert!(!session.in_transaction());

    session.commit().await.unwrap();
    let all = session.query::<User>().unwrap().all().await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn closed_sessions_detach_their_records() {
    let engine = MemoryEngine::new();
    let mut session = Session::new(engine.clone());
    let record = Record::new(user("ada", 36));
    session.add(&record).unwrap();
    session.commit().await.unwrap();
    assert!(record.is_attached());

    session.close().await.unwrap();
    assert!(!record.is_attached());

    // Mutations after detach stay local.
    record.set(User::FIELDS.age, 99).unwrap();
    let reread = QueryBuilder::<MemoryEngine, User>::detached(&engine)
        .unwrap()
        .first()
        .await
        .unwrap();
    assert_eq!(reread.snapshot().age, 36);
}

/// Engine wrapper that fails the next insert once the fuse is lit.
#[derive(Clone, Debug)]
struct FlakyEngine {
    inner: MemoryEngine,
    fail_next_insert: Arc<AtomicBool>,
}

impl FlakyEngine {
    fn new() -> Self {
        Self {
            inner: MemoryEngine::new(),
            fail_next_insert: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl StorageEngine for FlakyEngine {
    async fn begin(&self) -> MapperResult<Box<dyn TransactionScope>> {
        self.inner.begin().await
    }

    async fn find_one(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> MapperResult<Option<Document>> {
        self.inner.find_one(namespace, filter).await
    }

    async fn find_many(
        &self,
        namespace: &Namespace,
        filter: Document,
        offset: u64,
        limit: Option<u64>,
    ) -> MapperResult<Vec<Document>> {
        self.inner.find_many(namespace, filter, offset, limit).await
    }

    async fn insert_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        document: Document,
    ) -> MapperResult<String> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(MapperError::Engine("injected insert failure".to_string()));
        }
        self.inner.insert_one(scope, namespace, document).await
    }

    async fn update_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        identity: &str,
        set: Document,
    ) -> MapperResult<()> {
        self.inner.update_one(scope, namespace, identity, set).await
    }

    async fn delete_one(
        &self,
        scope: &mut dyn TransactionScope,
        namespace: &Namespace,
        identity: &str,
    ) -> MapperResult<()> {
        self.inner.delete_one(scope, namespace, identity).await
    }
}

#[tokio::test]
async fn failed_commits_keep_the_unit_of_work_for_retry() {
    let engine = FlakyEngine::new();
    let mut session = Session::new(engine.clone());

    let record = Record::new(user("ada", 36));
    session.add(&record).unwrap();

    engine.fail_next_insert.store(true, Ordering::SeqCst);
    let err = session.commit().await.unwrap_err();
    assert!(matches!(err, MapperError::Engine(_)));

    // Nothing reached the store and the staged insert survived the failure.
    let all = QueryBuilder::<MemoryEngine, User>::detached(&engine.inner)
        .unwrap()
        .all()
        .await
        .unwrap();
    assert!(all.is_empty());

    session.commit().await.unwrap();

    let all = QueryBuilder::<MemoryEngine, User>::detached(&engine.inner)
        .unwrap()
        .all()
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(record.identity().is_some());
}
