//! Typed field descriptors and filter predicate construction.
//!
//! This module provides the building blocks for queries: a [`Field`]
//! descriptor names one field of one model, comparison calls on a descriptor
//! produce [`Predicate`] values, and [`filter_document`] translates a list of
//! predicates into the operator-token document form engines consume.

use bson::{Bson, Document, doc};
use std::fmt;
use std::marker::PhantomData;

use crate::model::Model;

/// Comparison operators available on field descriptors.
///
/// The set is closed: every variant maps to exactly one operator token in the
/// translated filter document, and engines reject any other token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    /// Equal to the operand.
    Eq,
    /// Not equal to the operand.
    Ne,
    /// Strictly greater than the operand.
    Gt,
    /// Greater than or equal to the operand.
    Gte,
    /// Strictly less than the operand.
    Lt,
    /// Less than or equal to the operand.
    Lte,
    /// Member of the operand list.
    In,
    /// Not a member of the operand list.
    NotIn,
}

impl FieldOp {
    /// Returns the operator token this operator translates to.
    pub const fn token(self) -> &'static str {
        match self {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
            FieldOp::Gt => "$gt",
            FieldOp::Gte => "$gte",
            FieldOp::Lt => "$lt",
            FieldOp::Lte => "$lte",
            FieldOp::In => "$in",
            FieldOp::NotIn => "$nin",
        }
    }
}

/// A typed descriptor for one named field of a model.
///
/// Descriptors are declared once per model; the `Model` derive macro emits a
/// `FIELDS` constant holding one descriptor per struct field. Comparison calls
/// consume a copy of the descriptor and produce [`Predicate`] values:
///
/// ```ignore
/// let adults = User::FIELDS.age.gte(18);
/// let named = User::FIELDS.name.is_in(["Ada", "Grace"]);
/// ```
pub struct Field<M> {
    name: &'static str,
    _marker: PhantomData<M>,
}

impl<M: Model> Field<M> {
    /// Creates a descriptor for the field with the given name.
    ///
    /// The name must match the field's key in the model's document form.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the descriptor for the store identity field.
    ///
    /// Identities are addressed as strings; engines that keep identities in a
    /// native format translate the operand on their side.
    pub const fn identity() -> Self {
        Self::new("_id")
    }

    /// Returns the name of the field this descriptor addresses.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Builds an equality predicate for this field.
    pub fn eq(self, value: impl Into<Bson>) -> Predicate<M> {
        self.compare(FieldOp::Eq, value.into())
    }

    /// Builds an inequality predicate for this field.
    pub fn ne(self, value: impl Into<Bson>) -> Predicate<M> {
        self.compare(FieldOp::Ne, value.into())
    }

    /// Builds a strictly-greater-than predicate for this field.
    pub fn gt(self, value: impl Into<Bson>) -> Predicate<M> {
        self.compare(FieldOp::Gt, value.into())
    }

    /// Builds a greater-than-or-equal predicate for this field.
    pub fn gte(self, value: impl Into<Bson>) -> Predicate<M> {
        self.compare(FieldOp::Gte, value.into())
    }

    /// Builds a strictly-less-than predicate for this field.
    pub fn lt(self, value: impl Into<Bson>) -> Predicate<M> {
        self.compare(FieldOp::Lt, value.into())
    }

    /// Builds a less-than-or-equal predicate for this field.
    pub fn lte(self, value: impl Into<Bson>) -> Predicate<M> {
        self.compare(FieldOp::Lte, value.into())
    }

    /// Builds a membership predicate matching any of the given values.
    pub fn is_in<I, V>(self, values: I) -> Predicate<M>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.compare(
            FieldOp::In,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Builds an exclusion predicate matching none of the given values.
    pub fn not_in<I, V>(self, values: I) -> Predicate<M>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.compare(
            FieldOp::NotIn,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    fn compare(self, op: FieldOp, value: Bson) -> Predicate<M> {
        Predicate {
            field: self.name,
            op,
            value,
            _marker: PhantomData,
        }
    }
}

impl<M> Clone for Field<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Field<M> {}

impl<M> fmt::Debug for Field<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

/// One comparison against one field: the field name, the operator, and the
/// operand value.
///
/// Predicates are immutable once constructed and carry the model type they
/// were built from, so filters for one model cannot be mixed into a query
/// over another.
pub struct Predicate<M> {
    field: &'static str,
    op: FieldOp,
    value: Bson,
    _marker: PhantomData<M>,
}

impl<M> Predicate<M> {
    /// Returns the name of the field this predicate compares.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Returns the comparison operator.
    pub fn op(&self) -> FieldOp {
        self.op
    }

    /// Returns the operand value.
    pub fn value(&self) -> &Bson {
        &self.value
    }
}

impl<M> Clone for Predicate<M> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            op: self.op,
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Predicate<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("field", &self.field)
            .field("op", &self.op)
            .field("value", &self.value)
            .finish()
    }
}

/// Translates a list of predicates into a filter document.
///
/// Predicates are grouped by field name in order of first appearance, so
/// several comparisons against one field merge into a single operator map.
/// Repeating the same operator for the same field keeps the value given last.
/// An empty list produces an empty filter, which matches every document.
pub fn filter_document<M>(predicates: &[Predicate<M>]) -> Document {
    let mut filter = Document::new();
    for predicate in predicates {
        match filter.get_mut(predicate.field) {
            Some(Bson::Document(operators)) => {
                operators.insert(predicate.op.token(), predicate.value.clone());
            }
            _ => {
                filter.insert(
                    predicate.field,
                    doc! { predicate.op.token(): predicate.value.clone() },
                );
            }
        }
    }
    filter
}
