//! A typed object-document mapper core that maps record structs onto document store collections.
//!
//! This crate is the core of the docmapper project and provides:
//!
//! - **Model traits** ([`model`]) - Core traits for declaring mapped record types and their store binding
//! - **Field descriptors** ([`field`]) - Typed per-field descriptors and filter predicate construction
//! - **Record handles** ([`record`]) - Shared handles pairing a model value with identity and session state
//! - **Storage engine abstraction** ([`engine`]) - Traits for implementing different storage engines
//! - **Query API** ([`query`]) - Fluent, typed query construction and execution
//! - **Sessions** ([`session`]) - Unit-of-work sessions batching writes into atomic commits
//! - **Error handling** ([`error`]) - Error types and result types for mapper operations
//!
//! # Example
//!
//! ```ignore
//! use docmapper::Model;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! #[model(database = "appdb", collection = "users")]
//! pub struct User {
//!     pub name: String,
//!     pub email: String,
//! }
//!
//! let ada = session
//!     .query::<User>()?
//!     .filter_by(User::FIELDS.name, "Ada")
//!     .first()
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_core;

pub mod engine;
pub mod error;
pub mod field;
pub mod model;
pub mod query;
pub mod record;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
