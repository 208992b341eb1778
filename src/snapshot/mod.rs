//! Step records and traces
//!
//! A [`Trace`] is the finished product of either backend: an ordered list of
//! [`StepRecord`]s, index 0 being the state before the first line runs. Records
//! are immutable once pushed and each owns its own [`Environment`].
//!
//! The [`capture`] submodule holds the output sink used to isolate program output
//! while a trace is being recorded.

pub mod capture;

use crate::memory::Environment;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// Status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Normal,
    Error,
    Finished,
}

impl StepKind {
    /// Event name used in the JSON export
    pub fn event_name(self) -> &'static str {
        match self {
            StepKind::Normal => "step",
            StepKind::Error => "error",
            StepKind::Finished => "finish",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, StepKind::Normal)
    }
}

/// Where a terminal error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The traced program raised an uncaught fault
    Program,
    /// The trace hit a step or output limit
    Truncated,
    /// The engine itself failed while recording
    Engine,
}

impl ErrorOrigin {
    pub fn name(self) -> &'static str {
        match self {
            ErrorOrigin::Program => "program",
            ErrorOrigin::Truncated => "truncated",
            ErrorOrigin::Engine => "engine",
        }
    }
}

/// Error attached to a terminal step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub origin: ErrorOrigin,
    pub message: String,
}

impl StepError {
    pub fn program(message: impl Into<String>) -> Self {
        StepError {
            origin: ErrorOrigin::Program,
            message: message.into(),
        }
    }

    pub fn truncated(message: impl Into<String>) -> Self {
        StepError {
            origin: ErrorOrigin::Truncated,
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        StepError {
            origin: ErrorOrigin::Engine,
            message: message.into(),
        }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// One checkpoint of program execution
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// 1-based line about to execute; `None` means no line is highlighted
    pub line: Option<usize>,
    pub variables: Environment,
    /// Everything the program has printed so far
    pub output: String,
    pub error: Option<StepError>,
    pub kind: StepKind,
}

impl StepRecord {
    pub fn normal(line: usize, variables: Environment, output: impl Into<String>) -> Self {
        StepRecord {
            line: Some(line),
            variables,
            output: output.into(),
            error: None,
            kind: StepKind::Normal,
        }
    }

    pub fn error(variables: Environment, output: impl Into<String>, error: StepError) -> Self {
        StepRecord {
            line: None,
            variables,
            output: output.into(),
            error: Some(error),
            kind: StepKind::Error,
        }
    }

    pub fn finished(variables: Environment, output: impl Into<String>) -> Self {
        StepRecord {
            line: None,
            variables,
            output: output.into(),
            error: None,
            kind: StepKind::Finished,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

impl Serialize for StepRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self.line {
            Some(line) => map.serialize_entry("line", &line)?,
            None => map.serialize_entry("line", &-1)?,
        }
        map.serialize_entry("variables", &self.variables)?;
        map.serialize_entry("stdout", &self.output)?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", &error.message)?;
            map.serialize_entry("origin", error.origin.name())?;
        }
        map.serialize_entry("event", self.kind.event_name())?;
        map.end()
    }
}

/// Ordered, append-only list of step records
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trace {
    steps: Vec<StepRecord>,
    /// Output bytes held across all records
    output_bytes: usize,
}

impl Trace {
    pub fn new() -> Self {
        Trace {
            steps: Vec::new(),
            output_bytes: 0,
        }
    }

    /// Append a record. Records pushed after a terminal record are dropped.
    pub fn push(&mut self, record: StepRecord) {
        if self.is_terminated() {
            tracing::warn!(kind = ?record.kind, "record pushed after terminal step ignored");
            return;
        }
        self.output_bytes += record.output.len();
        self.steps.push(record);
    }

    pub fn get(&self, index: usize) -> Option<&StepRecord> {
        self.steps.get(index)
    }

    pub fn first(&self) -> Option<&StepRecord> {
        self.steps.first()
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether the last record is an Error or Finished step
    pub fn is_terminated(&self) -> bool {
        self.steps.last().is_some_and(StepRecord::is_terminal)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepRecord> {
        self.steps.iter()
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Sum of the cumulative output stored by every record
    pub fn output_bytes(&self) -> usize {
        self.output_bytes
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a StepRecord;
    type IntoIter = std::slice::Iter<'a, StepRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl Serialize for Trace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.steps.len()))?;
        for step in &self.steps {
            seq.serialize_element(step)?;
        }
        seq.end()
    }
}

/// A trace together with any engine diagnostics raised while producing it.
///
/// Diagnostics are the out-of-band channel for engine faults; they never appear
/// as step records unless a partial trace exists to attach them to.
#[derive(Debug, Clone, Default)]
pub struct TraceOutcome {
    pub trace: Trace,
    pub diagnostics: Vec<String>,
}

impl TraceOutcome {
    pub fn new(trace: Trace) -> Self {
        TraceOutcome {
            trace,
            diagnostics: Vec::new(),
        }
    }
}
