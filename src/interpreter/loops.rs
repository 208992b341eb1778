//! Loop statement execution (`while`, `for`) and iteration.
//!
//! Adds `impl Interpreter` methods for the two loop forms. `break` and
//! `continue` are propagated via `LoopBodyResult` so the loop driver can react
//! without inspecting `control_flow` directly.
//!
//! `return` inside a loop body is handled by returning `LoopBodyResult::Exit`,
//! which causes the loop to unwind immediately and let the enclosing call
//! observe the pending return.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{ExceptionKind, RuntimeError};
use crate::interpreter::object::{range_len, ListRef, Object};
use crate::parser::ast::{Expr, Stmt, Target};
use std::rc::Rc;

/// Largest sequence materialized from a range or string in one go
const MAX_MATERIALIZED: usize = 10_000_000;

/// Result returned by [`Interpreter::execute_loop_body`] to signal how the body ended.
pub(crate) enum LoopBodyResult {
    /// Body completed normally or via `continue`; the loop should iterate again.
    Continue,
    /// `break` was encountered; the loop should exit cleanly.
    Break,
    /// `return` was triggered; the loop driver should unwind and let the
    /// caller pick up `self.control_flow`.
    Exit,
}

/// Lazy iteration state for `for` loops and comprehensions
pub(crate) enum LoopIter {
    /// Lists are iterated live, so appends during the loop are seen
    List { items: ListRef, index: usize },
    Range { next: i64, stop: i64, step: i64 },
    Values(std::vec::IntoIter<Object>),
}

impl LoopIter {
    pub(crate) fn new(iterable: &Object) -> Result<Self, RuntimeError> {
        match iterable {
            Object::List(items) => Ok(LoopIter::List {
                items: Rc::clone(items),
                index: 0,
            }),
            Object::Range { start, stop, step } => Ok(LoopIter::Range {
                next: *start,
                stop: *stop,
                step: *step,
            }),
            other => Ok(LoopIter::Values(iterate(other)?.into_iter())),
        }
    }
}

impl Iterator for LoopIter {
    type Item = Object;

    fn next(&mut self) -> Option<Object> {
        match self {
            LoopIter::List { items, index } => {
                let item = items.borrow().get(*index).cloned()?;
                *index += 1;
                Some(item)
            }
            LoopIter::Range { next, stop, step } => {
                let in_range = (*step > 0 && *next < *stop) || (*step < 0 && *next > *stop);
                if !in_range {
                    return None;
                }
                let current = *next;
                *next = next.checked_add(*step).unwrap_or(*stop);
                Some(Object::Int(current))
            }
            LoopIter::Values(values) => values.next(),
        }
    }
}

/// Materialize an iterable into its items
pub(crate) fn iterate(iterable: &Object) -> Result<Vec<Object>, RuntimeError> {
    match iterable {
        Object::List(items) => Ok(items.borrow().clone()),
        Object::Tuple(items) => Ok(items.as_ref().clone()),
        Object::Str(s) => Ok(s.chars().map(|c| Object::Str(c.to_string())).collect()),
        Object::Dict(entries) => Ok(entries.borrow().keys().map(|k| k.to_object()).collect()),
        Object::Range { start, stop, step } => {
            if range_len(*start, *stop, *step) > MAX_MATERIALIZED {
                return Err(RuntimeError::exception(
                    ExceptionKind::MemoryError,
                    "range too large to materialize",
                ));
            }
            Ok(LoopIter::Range {
                next: *start,
                stop: *stop,
                step: *step,
            }
            .collect())
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

impl<'a> Interpreter<'a> {
    /// Executes all statements in `body` and classifies how it ended.
    pub(crate) fn execute_loop_body(
        &mut self,
        body: &[Stmt],
    ) -> Result<LoopBodyResult, RuntimeError> {
        self.execute_block(body)?;
        match self.control_flow {
            ControlFlow::Normal => Ok(LoopBodyResult::Continue),
            ControlFlow::Continue => {
                self.control_flow = ControlFlow::Normal;
                Ok(LoopBodyResult::Continue)
            }
            ControlFlow::Break => {
                self.control_flow = ControlFlow::Normal;
                Ok(LoopBodyResult::Break)
            }
            ControlFlow::Return(_) => Ok(LoopBodyResult::Exit),
        }
    }

    /// Executes a `while condition:` loop.
    ///
    /// The header line is reported before every test, including the final
    /// failing one.
    pub(crate) fn execute_while(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        line: usize,
    ) -> Result<(), RuntimeError> {
        self.loop_depth += 1;
        let result = self.run_while(test, body, line);
        self.loop_depth -= 1;
        result
    }

    fn run_while(&mut self, test: &Expr, body: &[Stmt], line: usize) -> Result<(), RuntimeError> {
        loop {
            self.set_line(line);
            self.fire_line(line)?;
            if !self.evaluate(test)?.is_truthy() {
                return Ok(());
            }
            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit | LoopBodyResult::Break => return Ok(()),
                LoopBodyResult::Continue => {}
            }
        }
    }

    /// Executes a `for target in iterable:` loop.
    ///
    /// The header line is reported once before the iterable is evaluated and
    /// again after every iteration, so a loop over `n` items reports it `n + 1`
    /// times when it runs to exhaustion.
    pub(crate) fn execute_for(
        &mut self,
        target: &Target,
        iter: &Expr,
        body: &[Stmt],
        line: usize,
    ) -> Result<(), RuntimeError> {
        self.loop_depth += 1;
        let result = self.run_for(target, iter, body, line);
        self.loop_depth -= 1;
        result
    }

    fn run_for(
        &mut self,
        target: &Target,
        iter: &Expr,
        body: &[Stmt],
        line: usize,
    ) -> Result<(), RuntimeError> {
        self.set_line(line);
        self.fire_line(line)?;
        let iterable = self.evaluate(iter)?;

        for item in LoopIter::new(&iterable)? {
            self.assign(target, item)?;
            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit | LoopBodyResult::Break => return Ok(()),
                LoopBodyResult::Continue => {}
            }
            self.set_line(line);
            self.fire_line(line)?;
        }

        Ok(())
    }
}
