//! Value snapshot model
//!
//! - [`value`]: the closed [`Value`](value::Value) sum type stored in step records
//! - [`env`]: the declared-order [`Environment`](env::Environment) of named values
//!
//! # Isolation
//!
//! Neither type contains shared or interior-mutable state. A live program keeps its
//! own representation (the interpreter's objects, or a step machine's working
//! environment) and converts into these types at capture time, so every recorded
//! environment is an independent tree by construction.

pub mod env;
pub mod value;

pub use env::Environment;
pub use value::Value;
