//! Source parser for the scripting subset
//!
//! This module transforms program text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, with indent/dedent layout)
//! - [`parse`]: Parser coordination and the [`parse()`] entry point
//! - [`ast`]: AST node definitions
//!
//! # Supported Subset
//!
//! The parser accepts the indentation-structured teaching language traced by
//! the engine:
//! - Values: integers, floats, strings and f-strings, booleans, `None`, lists,
//!   tuples, dicts
//! - Statements: assignment (chained, tuple unpacking, subscript targets),
//!   augmented assignment, `if`/`elif`/`else`, `while`, `for`, `def`, `return`,
//!   `global`, `assert`, `pass`, `break`, `continue`
//! - Expressions: arithmetic, bitwise, chained comparisons, `and`/`or`/`not`,
//!   conditional expressions, calls with keyword arguments, slices, list
//!   comprehensions
//! - No classes, imports, exception handling, lambdas, or set literals
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{parse, ParseError, Parser};
