//! Interpreter for the scripting subset
//!
//! This module provides the execution side of source tracing:
//! - [`engine`]: the [`Interpreter`] with scopes, calls and line reporting
//! - [`observer`]: the [`LineObserver`] hook fired before each line
//! - [`object`]: live runtime objects and their snapshot into [`Value`](crate::memory::Value)
//! - [`errors`]: exceptions and traceback rendering
//! - [`builtins`], [`format`]: the builtin functions and format specifications
//!
//! # Execution Model
//!
//! The interpreter walks the AST and executes statements one at a time. Before
//! a statement that begins a physical line runs, the observer is handed the
//! active scope and may halt execution. Loop headers are reported before each
//! test, so a loop is visible on every iteration.
//!
//! Library functions such as `sum` and `abs` are written in the scripting
//! language and loaded from a prelude; their lines are tagged
//! [`SourceUnit::Prelude`] so a tracer can skip them.

pub mod builtins;
pub mod engine;
pub mod errors;
mod expressions;
pub mod format;
mod loops;
mod methods;
pub mod object;
pub mod observer;
pub(crate) mod ops;
mod prelude;
mod statements;

pub use engine::Interpreter;
pub use errors::{ExceptionKind, RuntimeError};
pub use object::Object;
pub use observer::{Control, LineEvent, LineObserver, SourceUnit};
