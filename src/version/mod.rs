//! Semantic version handling for the relational store:
//! - `padding`: order-preserving fixed-width encoding (`PaddingSemVer`)
//! - `range`: npm range grammar and in-memory satisfaction
//! - `sql_range`: range to column condition compiler (`SqlRange`)
//! - `spec`: `name@spec` classification

pub mod padding;
pub mod range;
pub mod spec;
pub mod sql_range;

pub use padding::{ANY_VERSION, PaddingSemVer, parse_strict};
pub use range::{Comparator, Operator, Range, precedence};
pub use spec::{PackageSpec, SpecKind, fullname, split_fullname};
pub use sql_range::{Condition, SqlRange};
