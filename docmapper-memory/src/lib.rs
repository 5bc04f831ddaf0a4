//! In-memory storage engine for docmapper.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StorageEngine` trait. It matches filter documents with the same operator
//! tokens a real document database understands and keeps collections in
//! insertion order, which makes it ideal for development and tests.
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::prelude::*;
//! use docmapper::memory::MemoryEngine;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! #[model(database = "appdb", collection = "users")]
//! pub struct User {
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::new(MemoryEngine::new());
//!
//!     let user = Record::new(User { name: "Alice".to_string() });
//!     session.add(&user)?;
//!     session.commit().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_memory;

pub mod engine;
pub mod matcher;

pub use engine::{MemoryEngine, MemoryEngineBuilder};
