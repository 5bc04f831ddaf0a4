//! Filter document matching for in-memory collections.
//!
//! This module evaluates the operator-token filter documents produced by the
//! query layer against stored documents, with the comparison semantics of a
//! document database: numbers compare by value across integer widths, values
//! of different shapes never order, and a missing field is matched as null.

use bson::{Bson, Document, datetime::DateTime};
use std::cmp::Ordering;
use std::collections::HashMap;

use docmapper_core::error::{MapperError, MapperResult};

/// Returns whether the document satisfies every condition in the filter.
///
/// Conditions are combined conjunctively. A condition document whose keys
/// are operator tokens applies each of them to the field; any other
/// condition, including a document without a leading `$` key, is an implicit
/// equality.
///
/// # Errors
///
/// Returns [`MapperError::UnsupportedOperator`] when a condition uses an
/// operator token outside the supported set.
pub(crate) fn matches(document: &Document, filter: &Document) -> MapperResult<bool> {
    for (field, condition) in filter.iter() {
        let actual = document.get(field).unwrap_or(&Bson::Null);
        match condition {
            Bson::Document(operators)
                if operators
                    .keys()
                    .next()
                    .is_some_and(|token| token.starts_with('$')) =>
            {
                for (token, operand) in operators.iter() {
                    if !apply_operator(actual, token, operand)? {
                        return Ok(false);
                    }
                }
            }
            operand => {
                if !apply_operator(actual, "$eq", operand)? {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

fn apply_operator(actual: &Bson, token: &str, operand: &Bson) -> MapperResult<bool> {
    match token {
        "$eq" => Ok(Comparable::from(actual) == Comparable::from(operand)),
        "$ne" => Ok(Comparable::from(actual) != Comparable::from(operand)),
        "$gt" | "$gte" | "$lt" | "$lte" => {
            match Comparable::from(actual).partial_cmp(&Comparable::from(operand)) {
                Some(ordering) => Ok(match token {
                    "$gt" => ordering == Ordering::Greater,
                    "$gte" => ordering != Ordering::Less,
                    "$lt" => ordering == Ordering::Less,
                    "$lte" => ordering != Ordering::Greater,
                    _ => unreachable!(),
                }),
                None => Ok(false),
            }
        }
        "$in" => Ok(member_of(actual, operand)),
        "$nin" => Ok(!member_of(actual, operand)),
        other => Err(MapperError::UnsupportedOperator(other.to_string())),
    }
}

/// Membership test for `$in` and `$nin`. An array field matches when any of
/// its items is in the operand list; any other field matches when the field
/// value itself is.
fn member_of(actual: &Bson, operand: &Bson) -> bool {
    let Bson::Array(values) = operand else {
        return false;
    };
    match Comparable::from(actual) {
        Comparable::Array(items) => items
            .iter()
            .any(|item| values.iter().any(|value| *item == Comparable::from(value))),
        item => values.iter().any(|value| item == Comparable::from(value)),
    }
}

/// Type-erased, comparable view over BSON values.
///
/// Numeric types are normalized to f64 so mixed integer and double fields
/// compare by value. Shapes not listed here are treated as null: they are
/// never stored by this engine's write path.
#[derive(Debug)]
enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(items) => {
                Comparable::Array(items.iter().map(Comparable::from).collect())
            }
            Bson::Document(map) => Comparable::Map(
                map.iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}
