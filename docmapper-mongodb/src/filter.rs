//! Identity translation between mapper string form and MongoDB `_id` values.

use bson::oid::ObjectId;
use bson::{Bson, Document};

use docmapper_core::error::{MapperError, MapperResult};

/// Converts a mapper identity string into the `_id` value to match against.
///
/// Identities produced by inserts are ObjectId hex strings, so those parse
/// back into real ObjectIds. Anything else is matched as a plain string.
pub(crate) fn identity_bson(identity: &str) -> Bson {
    match ObjectId::parse_str(identity) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(identity.to_string()),
    }
}

/// Converts a stored `_id` value back into the mapper's string form.
pub(crate) fn stringify_identity(identity: Bson) -> MapperResult<String> {
    match identity {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(id) => Ok(id),
        other => Err(MapperError::Serialization(format!(
            "unsupported identity type: {other:?}"
        ))),
    }
}

/// Rewrites `_id` conditions in a filter so hex strings match stored ObjectIds.
///
/// Filters built from typed fields carry identities as strings. Stored
/// documents keep real ObjectIds, so string conditions under `_id` are
/// re-parsed before the filter reaches the server.
pub(crate) fn rewrite_identity(mut filter: Document) -> Document {
    if let Some(condition) = filter.remove("_id") {
        filter.insert("_id", rewrite_condition(condition));
    }
    filter
}

fn rewrite_condition(condition: Bson) -> Bson {
    match condition {
        Bson::Document(operators) => Bson::Document(
            operators
                .into_iter()
                .map(|(token, operand)| (token, rewrite_condition(operand)))
                .collect(),
        ),
        Bson::Array(items) => Bson::Array(items.into_iter().map(rewrite_condition).collect()),
        Bson::String(value) => match ObjectId::parse_str(&value) {
            Ok(oid) => Bson::ObjectId(oid),
            Err(_) => Bson::String(value),
        },
        other => other,
    }
}
