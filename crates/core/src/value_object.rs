//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**; they represent
/// concepts where identity doesn't matter. To "modify" one, create a new one
/// with the new values.
///
/// The trait requires `Clone + PartialEq + Debug` so values stay cheap to
/// copy, comparable by attributes, and debuggable in logs and tests.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
