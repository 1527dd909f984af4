//! Domain records and domain-level errors.

pub mod error;
pub mod recipes;
