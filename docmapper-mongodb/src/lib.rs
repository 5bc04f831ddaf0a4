//! MongoDB storage engine for docmapper.
//!
//! This crate provides a MongoDB-backed implementation of the
//! `StorageEngine` trait. Each transaction scope wraps one driver client
//! session, so a session commit lands as a single multi-document
//! transaction.
//!
//! To use this engine, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmapper = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! Multi-document transactions require a replica set or sharded cluster; a
//! standalone `mongod` rejects them.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::engine::EngineBuilder;
//! use docmapper::mongodb::MongoEngineBuilder;
//! use docmapper::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MongoEngineBuilder::new("mongodb://localhost:27017")
//!         .build()
//!         .await?;
//!     let mut session = Session::new(engine);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_mongodb;

pub mod engine;
pub mod filter;

pub use engine::{MongoEngine, MongoEngineBuilder};
