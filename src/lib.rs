//! Semantic equivalence checking for tabular query results.
//!
//! Two query results produced by different engines or query texts may be
//! the same data despite permuted rows, permuted columns, renamed
//! columns and differing column types. This crate normalizes raw engine
//! responses into typed frames, aligns columns by name or by value-set
//! evidence, and checks row-multiset equivalence under 4-decimal float
//! rounding.

pub mod align;
pub mod equiv;
pub mod error;
pub mod schema;
