//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**; two instances
/// with the same attributes are the same value. To "modify" one, construct a
/// new one — which is also where validation lives (e.g. [`crate::Quantity`]
/// rejects non-positive amounts at construction, so a held value is always
/// valid).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
