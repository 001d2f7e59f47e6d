//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two instances
/// holding the same attributes are interchangeable. To "modify" one, build a
/// new one (e.g. `balance.add(amount)` returns a fresh `Balance`).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
