//! Cross-crate integration tests.

pub mod aggregation;
pub mod extraction;
pub mod lifecycle;
pub mod resolution;
pub mod selection;
