//! Declarative step machine
//!
//! Algorithms written as pseudocode are not parsed. Each one is a
//! [`Descriptor`]: a table of line rules that say how the variables change and
//! which line comes next. The [`StepMachine`] walks that table and produces the
//! same kind of [`Trace`](crate::snapshot::Trace) as the source tracer.
//!
//! - [`descriptor`]: line rules, flows, presets and variants
//! - [`frames`]: the explicit call stack for recursive tables
//! - [`runner`]: the [`StepMachine`] and the [`Scope`] rules operate on
//! - [`library`]: the built-in algorithms

pub mod descriptor;
pub mod frames;
pub mod library;
pub mod runner;

pub use descriptor::{
    Descriptor, DescriptorError, Entry, Flow, LineRule, Navigation, Preset, Resume, Variant,
    PAST_END,
};
pub use library::Library;
pub use runner::{Scope, StepMachine};
