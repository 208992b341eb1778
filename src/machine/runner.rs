//! Step machine runner
//!
//! [`StepMachine::run`] walks a [`Descriptor`] from its entry line and records
//! the state before every executed line. The run ends in exactly one terminal
//! record:
//!
//! - `Finished` once the frame stack empties, on [`Flow::End`], or on a
//!   transfer past the last line
//! - `Error` with origin `Truncated` when a step or output limit is hit
//! - `Error` with origin `Engine` when required inputs are missing or the
//!   table misbehaves (undeclared decision, runaway recursion)
//!
//! # Scoping
//!
//! Reads resolve against the top frame's locals first, then the globals.
//! Every record lists globals, then top-frame locals, then (for descriptors
//! that call procedures) a `callStack` variable.

use crate::config::{Limit, TraceConfig};
use crate::machine::descriptor::{Descriptor, Flow, Resume, PAST_END};
use crate::machine::frames::{Frame, FrameStack};
use crate::memory::{Environment, Value};
use crate::snapshot::{StepError, StepRecord, Trace};
use std::fmt;

/// Variables visible to a line rule
pub struct Scope<'a> {
    globals: &'a mut Environment,
    locals: Option<&'a mut Environment>,
    output: &'a mut String,
    variant: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn new(
        globals: &'a mut Environment,
        locals: Option<&'a mut Environment>,
        output: &'a mut String,
        variant: Option<&'a str>,
    ) -> Self {
        Scope {
            globals,
            locals,
            output,
            variant,
        }
    }

    /// Value of `name`; unbound names read as [`Value::Unset`]
    pub fn get(&self, name: &str) -> &Value {
        match self.locals.as_deref().and_then(|locals| locals.get(name)) {
            Some(value) => value,
            None => self.globals.value(name),
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        if let Some(locals) = self.locals.as_deref_mut() {
            if locals.contains(name) {
                return locals.get_mut(name);
            }
        }
        self.globals.get_mut(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_set()
    }

    /// Integer view of `name`, 0 when unset
    pub fn int(&self, name: &str) -> i64 {
        self.get(name).as_int().unwrap_or(0)
    }

    pub fn real(&self, name: &str) -> f64 {
        self.get(name).as_real().unwrap_or(0.0)
    }

    pub fn list(&self, name: &str) -> &[Value] {
        self.get(name).as_list().unwrap_or(&[])
    }

    /// Element `index` (1-based) of list `name`
    pub fn item(&self, name: &str, index: i64) -> Value {
        usize::try_from(index - 1)
            .ok()
            .and_then(|i| self.list(name).get(i))
            .cloned()
            .unwrap_or_default()
    }

    /// Rebind `name` in the scope that already holds it, else in the globals
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(locals) = self.locals.as_deref_mut() {
            if locals.contains(name) {
                locals.set(name, value);
                return;
            }
        }
        self.globals.set(name, value);
    }

    /// Bind `name` in the current frame
    pub fn set_local(&mut self, name: &str, value: Value) {
        match self.locals.as_deref_mut() {
            Some(locals) => locals.set(name, value),
            None => self.globals.set(name, value),
        }
    }

    /// Replace element `index` (1-based) of list `name`; out-of-range
    /// indexes are ignored
    pub fn set_item(&mut self, name: &str, index: i64, value: Value) -> bool {
        let Ok(i) = usize::try_from(index - 1) else {
            return false;
        };
        match self.get_mut(name).and_then(Value::as_list_mut) {
            Some(items) if i < items.len() => {
                items[i] = value;
                true
            }
            _ => false,
        }
    }

    /// Append to list `name`, creating the list if unset
    pub fn push(&mut self, name: &str, value: Value) {
        if !self.get(name).is_set() {
            self.set(name, Value::List(Vec::new()));
        }
        if let Some(items) = self.get_mut(name).and_then(Value::as_list_mut) {
            items.push(value);
        }
    }

    /// Write one line of program output
    pub fn print(&mut self, text: impl fmt::Display) {
        self.output.push_str(&text.to_string());
        self.output.push('\n');
    }

    /// Print a value the way output statements show it: strings unquoted
    pub fn print_value(&mut self, value: &Value) {
        match value.as_str() {
            Some(text) => {
                let text = text.to_string();
                self.print(text);
            }
            None => self.print(value),
        }
    }

    pub fn variant(&self) -> Option<&'a str> {
        self.variant
    }
}

/// Executes descriptors into traces
pub struct StepMachine<'a> {
    descriptor: &'a Descriptor,
    config: TraceConfig,
    variant: Option<&'a str>,
    globals: Environment,
    stack: FrameStack,
    output: String,
    trace: Trace,
}

impl<'a> StepMachine<'a> {
    /// Run `descriptor` with `bindings` layered over its initial environment.
    ///
    /// `variant` falls back to the descriptor's default.
    pub fn run(
        descriptor: &'a Descriptor,
        bindings: &Environment,
        variant: Option<&'a str>,
        config: &TraceConfig,
    ) -> Trace {
        let mut globals = descriptor.initial.clone();
        globals.merge(bindings);

        let mut machine = StepMachine {
            descriptor,
            config: *config,
            variant: variant.or(descriptor.default_variant),
            globals,
            stack: FrameStack::new(),
            output: String::new(),
            trace: Trace::new(),
        };
        tracing::info!(id = descriptor.id, variant = ?machine.variant, "running step machine");

        if let Some(variant) = variant {
            if descriptor.variant(variant).is_none() {
                machine.fail(format!("unknown variant '{}'", variant));
                return machine.trace;
            }
        }

        let missing = descriptor.missing(&machine.globals);
        if !missing.is_empty() {
            machine.fail(format!("missing required inputs: {}", missing.join(", ")));
            return machine.trace;
        }

        let mut locals = Environment::new();
        for param in descriptor.entry.params {
            if let Some(value) = machine.globals.remove(param) {
                locals.set(*param, value);
            }
        }
        machine.stack.push(Frame::new(
            descriptor.entry.procedure,
            descriptor.entry.line,
            locals,
        ));

        machine.execute();
        let last = machine.trace.last().map(|record| record.kind);
        tracing::info!(id = descriptor.id, steps = machine.trace.len(), kind = ?last, "step machine done");
        machine.trace
    }

    fn scope(&mut self) -> Scope<'_> {
        Scope::new(
            &mut self.globals,
            self.stack.top_mut().map(|frame| &mut frame.locals),
            &mut self.output,
            self.variant,
        )
    }

    /// Globals, then top-frame locals, then the call stack
    fn view(&self) -> Environment {
        let mut view = self.globals.snapshot();
        if let Some(frame) = self.stack.top() {
            view.merge(&frame.locals);
        }
        if self.descriptor.uses_calls() {
            view.set("callStack", self.stack.to_value());
        }
        view
    }

    fn execute(&mut self) {
        let len = self.descriptor.len();
        loop {
            let Some(frame) = self.stack.top() else {
                let record = if self.output.len() > self.config.max_output_bytes {
                    let message = Limit::Output(self.config.max_output_bytes).message();
                    tracing::warn!(id = self.descriptor.id, %message, "trace truncated");
                    let output = self.config.clip_output(&self.output);
                    StepRecord::error(self.view(), output, StepError::truncated(message))
                } else {
                    StepRecord::finished(self.view(), self.output.clone())
                };
                self.trace.push(record);
                return;
            };
            let line = frame.pc;

            if line == PAST_END || line > len {
                if self.stack.depth() > 1 {
                    let message = format!(
                        "procedure '{}' ran past the last line with {} frames active",
                        frame.procedure,
                        self.stack.depth()
                    );
                    self.fail(message);
                    return;
                }
                self.stack.clear();
                continue;
            }

            if let Some(limit) = self.config.limit_reached(&self.trace, self.output.len()) {
                self.truncate(limit);
                return;
            }

            let Some(rule) = self.descriptor.rule(line).copied() else {
                self.fail(format!("no rule for line {}", line));
                return;
            };
            self.trace
                .push(StepRecord::normal(line, self.view(), self.output.clone()));

            if let Some(mutate) = rule.mutate {
                mutate(&mut self.scope());
            }

            let next = match rule.flow {
                Flow::Next => line + 1,
                Flow::Goto(target) => target,
                Flow::Branch {
                    test,
                    then,
                    otherwise,
                } => {
                    if test(&self.scope()) {
                        then
                    } else {
                        otherwise
                    }
                }
                Flow::Decide { decide, targets } => {
                    let target = decide(&self.scope());
                    if !targets.contains(&target) {
                        self.fail(format!(
                            "line {} chose line {}, which is not among its declared targets",
                            line, target
                        ));
                        return;
                    }
                    target
                }
                Flow::Call {
                    procedure,
                    entry,
                    bind,
                    resume,
                } => {
                    if self.stack.depth() >= self.config.max_call_depth {
                        self.fail(format!(
                            "call depth limit of {} exceeded",
                            self.config.max_call_depth
                        ));
                        return;
                    }
                    let locals = bind(&self.scope());
                    if let Some(caller) = self.stack.top_mut() {
                        caller.resume = Some(resume);
                    }
                    self.stack.push(Frame::new(procedure, entry, locals));
                    tracing::debug!(from = line, procedure, entry, depth = self.stack.depth(), "call");
                    continue;
                }
                Flow::Return { value } => {
                    let value = value.map(|f| f(&self.scope())).unwrap_or_default();
                    if let Err(message) = self.unwind(value) {
                        self.fail(message);
                        return;
                    }
                    tracing::debug!(from = line, depth = self.stack.depth(), "return");
                    continue;
                }
                Flow::End => {
                    tracing::debug!(from = line, "end");
                    self.stack.clear();
                    continue;
                }
            };

            tracing::debug!(from = line, to = next, "transfer");
            if let Some(frame) = self.stack.top_mut() {
                frame.pc = next;
            }
        }
    }

    /// Pop the returning frame and hand `value` to its caller. Tail resumes
    /// keep unwinding without recording a step.
    fn unwind(&mut self, value: Value) -> Result<(), String> {
        let mut value = value;
        loop {
            let returning = self.stack.pop().map(|frame| frame.procedure);
            let resume = match self.stack.top_mut() {
                Some(caller) => caller.resume.take(),
                None => {
                    if let Some(name) = self.descriptor.result {
                        if value.is_set() {
                            self.globals.set(name, value);
                        }
                    }
                    return Ok(());
                }
            };

            match resume {
                Some(Resume::At { line, receive }) => {
                    if let Some(frame) = self.stack.top_mut() {
                        frame.pc = line;
                    }
                    if let Some(receive) = receive {
                        receive(&mut self.scope(), value);
                    }
                    return Ok(());
                }
                Some(Resume::Tail { combine }) => {
                    value = combine(&self.scope(), value);
                }
                None => {
                    return Err(format!(
                        "procedure '{}' returned to a caller with no resume point",
                        returning.unwrap_or("?")
                    ));
                }
            }
        }
    }

    fn truncate(&mut self, limit: Limit) {
        let message = limit.message();
        tracing::warn!(id = self.descriptor.id, steps = self.trace.len(), %message, "trace truncated");
        let variables = match self.trace.last() {
            Some(record) => record.variables.clone(),
            None => self.view(),
        };
        let output = self.config.clip_output(&self.output);
        self.trace
            .push(StepRecord::error(variables, output, StepError::truncated(message)));
    }

    fn fail(&mut self, message: String) {
        tracing::error!(id = self.descriptor.id, %message, "step machine fault");
        self.trace.push(StepRecord::error(
            self.view(),
            self.config.clip_output(&self.output),
            StepError::engine(message),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::descriptor::{Entry, LineRule};
    use crate::snapshot::{ErrorOrigin, StepKind};

    fn counter() -> Descriptor {
        let mut descriptor = Descriptor::new(
            "count",
            "count",
            Entry {
                procedure: "main",
                line: 1,
                params: &[],
            },
        );
        descriptor.initial = [("i", Value::Int(0)), ("limit", Value::Unset)]
            .into_iter()
            .collect();
        descriptor.required = vec!["limit"];
        descriptor.rules = vec![
            LineRule::new("while i < limit").branch(|s| s.int("i") < s.int("limit"), 2, 4),
            LineRule::new("  i ← i + 1").mutate(|s| {
                let i = s.int("i");
                s.set("i", Value::Int(i + 1));
            }),
            LineRule::new("endwhile").goto(1),
            LineRule::new("output i").mutate(|s| {
                let i = s.int("i");
                s.print(i);
            }),
        ];
        descriptor
    }

    fn limit(n: i64) -> Environment {
        [("limit", Value::Int(n))].into_iter().collect()
    }

    #[test]
    fn test_loop_runs_to_finish() {
        let descriptor = counter();
        let trace = StepMachine::run(&descriptor, &limit(2), None, &TraceConfig::default());
        let lines: Vec<_> = trace.iter().map(|r| r.line).collect();
        assert_eq!(
            lines,
            vec![
                Some(1),
                Some(2),
                Some(3),
                Some(1),
                Some(2),
                Some(3),
                Some(1),
                Some(4),
                None
            ]
        );
        let last = trace.last().expect("terminal record");
        assert_eq!(last.kind, StepKind::Finished);
        assert_eq!(last.variables.get("i"), Some(&Value::Int(2)));
        assert_eq!(last.output, "2\n");
    }

    #[test]
    fn test_missing_input_is_engine_error() {
        let descriptor = counter();
        let trace = StepMachine::run(&descriptor, &Environment::new(), None, &TraceConfig::default());
        assert_eq!(trace.len(), 1);
        let error = trace.get(0).and_then(|r| r.error.as_ref()).expect("error");
        assert_eq!(error.origin, ErrorOrigin::Engine);
        assert!(error.message.contains("limit"));
    }

    #[test]
    fn test_step_limit_truncates() {
        let descriptor = counter();
        let config = TraceConfig::default().with_max_steps(5);
        let trace = StepMachine::run(&descriptor, &limit(100), None, &config);
        assert_eq!(trace.len(), 5);
        let error = trace.last().and_then(|r| r.error.as_ref()).expect("error");
        assert_eq!(error.origin, ErrorOrigin::Truncated);
    }

    #[test]
    fn test_output_overflow_on_last_line_is_truncation() {
        let descriptor = counter();
        let config = TraceConfig::default().with_max_output_bytes(2);
        let trace = StepMachine::run(&descriptor, &limit(100), None, &config);
        let last = trace.last().expect("terminal record");
        assert_eq!(last.kind, StepKind::Error);
        let error = last.error.as_ref().expect("error");
        assert_eq!(error.origin, ErrorOrigin::Truncated);
        assert!(error.message.contains("2 bytes"));
        assert_eq!(last.output, "10");
        assert_eq!(last.variables.get("i"), Some(&Value::Int(100)));
    }

    #[test]
    fn test_scope_prefers_locals() {
        let mut globals: Environment = [("n", Value::Int(1))].into_iter().collect();
        let mut locals: Environment = [("n", Value::Int(2))].into_iter().collect();
        let mut output = String::new();
        let mut scope = Scope::new(&mut globals, Some(&mut locals), &mut output, None);
        assert_eq!(scope.int("n"), 2);
        scope.set("n", Value::Int(3));
        scope.set("m", Value::Int(4));
        assert_eq!(locals.get("n"), Some(&Value::Int(3)));
        assert_eq!(globals.get("n"), Some(&Value::Int(1)));
        assert_eq!(globals.get("m"), Some(&Value::Int(4)));
    }
}
