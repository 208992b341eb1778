//! # Introduction
//!
//! steptrace turns a short program into an ordered, replayable sequence of
//! execution steps. Each step carries the current line, an immutable snapshot
//! of the variables, the output so far and, at the end, an optional error.
//! The sequence is navigated forward and backward through a terminal viewer
//! or exported as JSON.
//!
//! ## Backends
//!
//! ```text
//! Source    → Lexer → Parser → AST → Interpreter + observer ─┐
//!                                                              ├→ Trace → Sequencer → TUI / JSON
//! Algorithm → Descriptor tables → Step machine + frame stack ─┘
//! ```
//!
//! 1. [`parser`] tokenises a Python-flavoured scripting subset and builds an
//!    AST.
//! 2. [`interpreter`] walks the AST and notifies an observer before each line.
//! 3. [`tracer`] hooks that observer and records a [`snapshot::StepRecord`]
//!    per line, with output captured through a redirected sink.
//! 4. [`machine`] runs the curated algorithm library: per-line mutators and
//!    control transfers with an explicit frame stack for recursion.
//! 5. [`sequencer`] is the uniform stepping protocol over either backend,
//!    including preset/variant selection and readiness gating.
//! 6. [`memory`] is the value model shared by everything above.
//! 7. [`ui`] is the ratatui viewer; not part of the stable library API.

pub mod config;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod parser;
pub mod sequencer;
pub mod snapshot;
pub mod tracer;
pub mod ui;
