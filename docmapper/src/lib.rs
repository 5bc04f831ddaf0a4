//! Main docmapper crate providing a typed object-document mapper.
//!
//! This crate is the primary entry point for users of the docmapper framework.
//! It re-exports the core types from the sub-crates, the `Model` derive, and
//! the storage engines.
//!
//! # Features
//!
//! - **Typed schemas** - Declare records with Serde and `#[derive(Model)]`
//! - **Typed predicates** - Build filters from generated field descriptors instead of raw documents
//! - **Unit-of-work sessions** - Batch inserts, updates, and deletes and commit them in one transaction
//! - **Multiple engines** - In-memory and MongoDB storage behind one narrow trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::prelude::*;
//! use docmapper::memory::MemoryEngine;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Model, Serialize, Deserialize, Clone, Debug)]
//! #[model(database = "crm", collection = "users")]
//! pub struct User {
//!     pub name: String,
//!     pub email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = MemoryEngine::builder().build().await.unwrap();
//!     let mut session = Session::new(engine);
//!
//!     // Writes are staged on the session and applied atomically on commit.
//!     let user = Record::new(User {
//!         name: "Ada".to_string(),
//!         email: "ada@example.com".to_string(),
//!     });
//!     session.add(&user).unwrap();
//!     session.commit().await.unwrap();
//!
//!     // Generated field descriptors build typed predicates.
//!     let loaded = session
//!         .query::<User>()
//!         .unwrap()
//!         .filter([User::FIELDS.name.eq("Ada")])
//!         .unwrap()
//!         .first()
//!         .await
//!         .unwrap();
//!
//!     // Mutations on session-loaded records join the unit of work.
//!     loaded.set(User::FIELDS.email, "ada@example.org").unwrap();
//!     session.commit().await.unwrap();
//! }
//! ```
//!
//! # Transactions
//!
//! `commit()` opens and commits a transaction scope by itself. For explicit
//! control, open the scope first; the next commit then uses it:
//!
//! ```ignore
//! session.begin().await?;
//! session.add(&user)?;
//! session.commit().await?;
//!
//! // Or discard the staged work instead of committing it.
//! session.rollback().await?;
//! ```
//!
//! # Engines
//!
//! - [`memory`] - Insertion-ordered in-memory engine for tests and embedded use
//! - [`mongodb`] - Persistent MongoDB engine (requires the `mongodb` feature)

pub mod prelude;

pub use docmapper_core::{engine, error, field, model, query, record, session};

pub use docmapper_macros::Model;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage engine implementations.
pub mod memory {
    pub use docmapper_memory::{MemoryEngine, MemoryEngineBuilder};
}

/// MongoDB storage engine implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmapper_mongodb::{MongoEngine, MongoEngineBuilder};
}
