//! Procedural macros for the docmapper project.
//!
//! This crate provides the `Model` derive, which binds a record struct to
//! its database and collection names and generates the typed field
//! descriptors used to build query predicates.

#[allow(unused_extern_crates)]
extern crate self as docmapper_macros;

use proc_macro::TokenStream;

mod model;

#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive_model(input.into()).into()
}
