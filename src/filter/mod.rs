//! JSON where-objects compiled to parameterized SQL or evaluated in memory.
//!
//! A where-object is `{field: value}` for equality or `{field: {"$op": value}}`
//! with `$eq $ne $gt $gte $lt $lte $ilike $in`. Top-level keys are ANDed.

pub mod error;
pub mod filter_match;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter_match::FilterMatch;
pub use filter_where::FilterWhere;
pub use types::{ColumnSpec, FilterOp};
