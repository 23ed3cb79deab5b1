//! Game implementations.

pub mod hard_to_get;
