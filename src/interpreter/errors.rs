//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], which represents everything that can stop
//! a program once it is running (as opposed to parse errors). Scripting-level
//! exceptions carry a traceback collected while the error unwinds through call
//! frames; [`RuntimeError::Halted`] is the internal signal raised when the line
//! observer asks execution to stop.

use crate::interpreter::observer::SourceUnit;
use crate::parser::ParseError;
use std::fmt;
use thiserror::Error;

/// Exception classes the interpreter can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    NameError,
    TypeError,
    ValueError,
    ZeroDivisionError,
    IndexError,
    KeyError,
    AttributeError,
    RecursionError,
    OverflowError,
    AssertionError,
    MemoryError,
    SyntaxError,
}

impl ExceptionKind {
    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::NameError => "NameError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::AssertionError => "AssertionError",
            ExceptionKind::MemoryError => "MemoryError",
            ExceptionKind::SyntaxError => "SyntaxError",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One line of a traceback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub unit: SourceUnit,
    pub line: usize,
    /// Function name, or `<module>` at top level
    pub scope: String,
}

/// Errors that stop execution
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// An uncaught exception. `traceback` is innermost frame first.
    #[error("{kind}: {message}")]
    Exception {
        kind: ExceptionKind,
        message: String,
        traceback: Vec<TraceEntry>,
    },

    /// The line observer stopped execution
    #[error("execution halted by observer")]
    Halted,
}

impl RuntimeError {
    pub fn exception(kind: ExceptionKind, message: impl Into<String>) -> Self {
        RuntimeError::Exception {
            kind,
            message: message.into(),
            traceback: Vec::new(),
        }
    }

    pub fn name_error(name: &str) -> Self {
        Self::exception(
            ExceptionKind::NameError,
            format!("name '{}' is not defined", name),
        )
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::exception(ExceptionKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::exception(ExceptionKind::ValueError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::exception(ExceptionKind::IndexError, message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::exception(ExceptionKind::ZeroDivisionError, message)
    }

    pub fn overflow() -> Self {
        Self::exception(
            ExceptionKind::OverflowError,
            "integer result exceeds 64-bit range",
        )
    }

    /// A parse failure reported as an exception at the offending line
    pub fn syntax(err: &ParseError, unit: SourceUnit) -> Self {
        RuntimeError::Exception {
            kind: ExceptionKind::SyntaxError,
            message: err.message.clone(),
            traceback: vec![TraceEntry {
                unit,
                line: err.location.line,
                scope: String::new(),
            }],
        }
    }

    pub fn kind(&self) -> Option<ExceptionKind> {
        match self {
            RuntimeError::Exception { kind, .. } => Some(*kind),
            RuntimeError::Halted => None,
        }
    }

    /// Record the frame an exception is passing through
    pub(crate) fn push_frame(&mut self, entry: TraceEntry) {
        if let RuntimeError::Exception { traceback, .. } = self {
            traceback.push(entry);
        }
    }

    /// Render as a scripting-language traceback
    pub fn traceback_text(&self) -> String {
        match self {
            RuntimeError::Exception {
                kind,
                message,
                traceback,
            } => {
                let mut text = String::from("Traceback (most recent call last):\n");
                let mut previous: Option<&TraceEntry> = None;
                let mut repeats = 0usize;
                for entry in traceback.iter().rev() {
                    if previous == Some(entry) {
                        repeats += 1;
                        if repeats >= REPEAT_LIMIT {
                            continue;
                        }
                    } else {
                        flush_repeats(&mut text, repeats);
                        repeats = 0;
                    }
                    previous = Some(entry);
                    text.push_str(&format!(
                        "  File \"{}\", line {}",
                        entry.unit.file_name(),
                        entry.line
                    ));
                    if !entry.scope.is_empty() {
                        text.push_str(&format!(", in {}", entry.scope));
                    }
                    text.push('\n');
                }
                flush_repeats(&mut text, repeats);
                if message.is_empty() {
                    text.push_str(kind.name());
                } else {
                    text.push_str(&format!("{}: {}", kind, message));
                }
                text
            }
            RuntimeError::Halted => self.to_string(),
        }
    }
}

/// Identical consecutive frames printed before collapsing
const REPEAT_LIMIT: usize = 3;

fn flush_repeats(text: &mut String, repeats: usize) {
    if repeats >= REPEAT_LIMIT {
        let hidden = repeats + 1 - REPEAT_LIMIT;
        text.push_str(&format!(
            "  [Previous line repeated {} more time{}]\n",
            hidden,
            if hidden == 1 { "" } else { "s" }
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traceback_outermost_first() {
        let mut err = RuntimeError::zero_division("division by zero");
        err.push_frame(TraceEntry {
            unit: SourceUnit::User,
            line: 2,
            scope: "f".to_string(),
        });
        err.push_frame(TraceEntry {
            unit: SourceUnit::User,
            line: 4,
            scope: "<module>".to_string(),
        });

        let text = err.traceback_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Traceback (most recent call last):");
        assert_eq!(lines[1], "  File \"<string>\", line 4, in <module>");
        assert_eq!(lines[2], "  File \"<string>\", line 2, in f");
        assert_eq!(lines[3], "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_repeated_frames_collapse() {
        let mut err = RuntimeError::exception(ExceptionKind::RecursionError, "maximum recursion depth exceeded");
        for _ in 0..10 {
            err.push_frame(TraceEntry {
                unit: SourceUnit::User,
                line: 2,
                scope: "f".to_string(),
            });
        }
        let text = err.traceback_text();
        assert_eq!(text.matches("line 2, in f").count(), 3);
        assert!(text.contains("[Previous line repeated 7 more times]"));
    }

    #[test]
    fn test_bare_assertion_has_no_message() {
        let err = RuntimeError::exception(ExceptionKind::AssertionError, "");
        assert!(err.traceback_text().ends_with("\nAssertionError"));
    }
}
