//! Operator semantics shared by expression evaluation and builtins
//!
//! - [`binary`]: arithmetic, bitwise, comparison and membership
//! - [`unary`]: `-`, `+`, `not`, `~`
//! - [`access`]: subscripts, slices, item assignment and unpacking
//!
//! These are free functions over [`Object`](crate::interpreter::object::Object);
//! none of them need interpreter state.

pub mod access;
pub mod binary;
pub mod unary;

pub use access::{get_item, get_slice, set_item, unpack};
pub use binary::{binary_op, compare, compare_objects, contains, inplace_op, unhashable};
pub use unary::unary_op;
