//! Convenient re-exports of commonly used types from docmapper.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmapper::prelude::*;
//! ```
//!
//! This provides access to:
//! - Model declaration (the trait and its derive)
//! - Records and unit-of-work sessions
//! - Field descriptors and predicate construction
//! - Engine traits and builders
//! - Error types

pub use docmapper_core::{
    engine::{EngineBuilder, StorageEngine, TransactionScope},
    error::{MapperError, MapperResult},
    field::{Field, FieldOp, Predicate, filter_document},
    model::{Model, ModelExt, Namespace},
    query::{DEFAULT_LIMIT, QueryBuilder},
    record::Record,
    session::Session,
};

pub use docmapper_macros::Model;
