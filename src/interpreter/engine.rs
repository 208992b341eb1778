//! Execution engine for the scripting interpreter
//!
//! The [`Interpreter`] walks the AST directly. It owns the module globals, the
//! function frame stack and the output slot, and reports every executed line to
//! a borrowed [`LineObserver`]. Statement, loop, expression and builtin
//! execution live in sibling modules as further `impl Interpreter` blocks.

use crate::config::TraceConfig;
use crate::interpreter::errors::{ExceptionKind, RuntimeError, TraceEntry};
use crate::interpreter::object::{Function, Object};
use crate::interpreter::observer::{Control, LineEvent, LineObserver, SourceUnit};
use crate::interpreter::prelude::PRELUDE;
use crate::memory::Environment;
use crate::parser::ast::Program;
use crate::parser::parse;
use crate::snapshot::capture::{console_slot, StdoutSlot};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

/// Pending non-local control transfer
#[derive(Debug, Clone)]
pub(crate) enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return(Object),
}

/// Activation record of a function call
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) name: String,
    pub(crate) unit: SourceUnit,
    pub(crate) locals: IndexMap<String, Object>,
    /// Names declared `global` in this call
    pub(crate) global_names: FxHashSet<String>,
    /// Line currently executing in this frame
    pub(crate) line: usize,
}

/// Tree-walking interpreter for the scripting subset
pub struct Interpreter<'a> {
    observer: &'a mut dyn LineObserver,
    pub(crate) globals: IndexMap<String, Object>,
    pub(crate) frames: Vec<Frame>,
    /// Comprehension variables, innermost last
    pub(crate) overlays: Vec<FxHashMap<String, Object>>,
    pub(crate) control_flow: ControlFlow,
    /// Loops enclosing the current statement within the current frame
    pub(crate) loop_depth: usize,
    stdout: StdoutSlot,
    config: TraceConfig,
    /// Globals defined by the prelude; hidden from line events while they
    /// still hold the prelude's functions
    prelude_names: FxHashSet<String>,
    module_unit: SourceUnit,
    module_line: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(observer: &'a mut dyn LineObserver, config: TraceConfig) -> Self {
        Interpreter {
            observer,
            globals: IndexMap::new(),
            frames: Vec::new(),
            overlays: Vec::new(),
            control_flow: ControlFlow::Normal,
            loop_depth: 0,
            stdout: console_slot(),
            config,
            prelude_names: FxHashSet::default(),
            module_unit: SourceUnit::User,
            module_line: 0,
        }
    }

    /// Slot program output is written through
    pub fn stdout(&self) -> &StdoutSlot {
        &self.stdout
    }

    /// Define the library functions written in the scripting language
    pub fn load_prelude(&mut self) -> Result<(), RuntimeError> {
        let program =
            parse(PRELUDE).map_err(|err| RuntimeError::syntax(&err, SourceUnit::Prelude))?;

        self.module_unit = SourceUnit::Prelude;
        let result = self.execute_module(&program);
        self.module_unit = SourceUnit::User;
        result?;

        self.prelude_names = self.globals.keys().cloned().collect();
        tracing::debug!(functions = self.prelude_names.len(), "prelude loaded");
        Ok(())
    }

    /// Run a parsed user program to completion
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.module_unit = SourceUnit::User;
        self.module_line = 0;
        self.execute_module(program)
    }

    fn execute_module(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.control_flow = ControlFlow::Normal;
        match self.execute_block(&program.body) {
            Ok(()) => Ok(()),
            Err(mut err) => {
                err.push_frame(TraceEntry {
                    unit: self.module_unit,
                    line: self.module_line,
                    scope: "<module>".to_string(),
                });
                Err(err)
            }
        }
    }

    /// Snapshot of the user-visible module globals
    pub fn global_snapshot(&self) -> Environment {
        LineEvent {
            unit: SourceUnit::User,
            line: self.module_line,
            depth: 0,
            bindings: &self.globals,
            hidden: Some(&self.prelude_names),
        }
        .snapshot()
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    // ===== Scopes =====

    pub(crate) fn current_unit(&self) -> SourceUnit {
        self.frames
            .last()
            .map_or(self.module_unit, |frame| frame.unit)
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        match self.frames.last_mut() {
            Some(frame) => frame.line = line,
            None => self.module_line = line,
        }
    }

    /// Resolve a name: comprehension variables, locals, globals, then builtins
    pub(crate) fn lookup(&self, name: &str) -> Result<Object, RuntimeError> {
        for overlay in self.overlays.iter().rev() {
            if let Some(value) = overlay.get(name) {
                return Ok(value.clone());
            }
        }
        if let Some(frame) = self.frames.last() {
            if !frame.global_names.contains(name) {
                if let Some(value) = frame.locals.get(name) {
                    return Ok(value.clone());
                }
            }
        }
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = crate::interpreter::builtins::Builtin::from_name(name) {
            return Ok(Object::Builtin(builtin));
        }
        Err(RuntimeError::name_error(name))
    }

    pub(crate) fn assign_name(&mut self, name: &str, value: Object) {
        if let Some(frame) = self.frames.last_mut() {
            if !frame.global_names.contains(name) {
                frame.locals.insert(name.to_string(), value);
                return;
            }
        }
        self.globals.insert(name.to_string(), value);
    }

    // ===== Observation =====

    /// Report a line to the observer before it executes
    pub(crate) fn fire_line(&mut self, line: usize) -> Result<(), RuntimeError> {
        let unit = self.current_unit();
        let depth = self.frames.len();
        let (bindings, hidden) = match self.frames.last() {
            Some(frame) => (&frame.locals, None),
            None => (&self.globals, Some(&self.prelude_names)),
        };
        let event = LineEvent {
            unit,
            line,
            depth,
            bindings,
            hidden,
        };

        match self.observer.on_line(&event) {
            Control::Continue => Ok(()),
            Control::Halt => Err(RuntimeError::Halted),
        }
    }

    pub(crate) fn write_output(&mut self, text: &str) {
        self.stdout.borrow_mut().write_str(text);
    }

    // ===== Calls =====

    pub(crate) fn call_object(
        &mut self,
        callee: Object,
        args: Vec<Object>,
        kwargs: Vec<(String, Object)>,
    ) -> Result<Object, RuntimeError> {
        match callee {
            Object::Function(function) => self.call_function(&function, args, kwargs),
            Object::Builtin(builtin) => self.call_builtin(builtin, args, kwargs),
            Object::BoundMethod { receiver, name } => {
                self.call_method(*receiver, &name, args, kwargs)
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Object>,
        kwargs: Vec<(String, Object)>,
    ) -> Result<Object, RuntimeError> {
        if self.frames.len() >= self.config.max_call_depth {
            return Err(RuntimeError::exception(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }

        let locals = bind_arguments(function, args, kwargs)?;
        self.frames.push(Frame {
            name: function.name().to_string(),
            unit: function.unit,
            locals,
            global_names: FxHashSet::default(),
            line: function.def.location.line,
        });
        let overlays = std::mem::take(&mut self.overlays);
        let loop_depth = std::mem::replace(&mut self.loop_depth, 0);

        let result = self.execute_block(&function.def.body);

        self.overlays = overlays;
        self.loop_depth = loop_depth;
        let frame = self.frames.pop();
        let flow = std::mem::replace(&mut self.control_flow, ControlFlow::Normal);

        match result {
            Ok(()) => match flow {
                ControlFlow::Return(value) => Ok(value),
                _ => Ok(Object::None),
            },
            Err(mut err) => {
                if let Some(frame) = frame {
                    err.push_frame(TraceEntry {
                        unit: frame.unit,
                        line: frame.line,
                        scope: frame.name,
                    });
                }
                Err(err)
            }
        }
    }
}

/// Match call arguments to parameters, in parameter order
fn bind_arguments(
    function: &Function,
    args: Vec<Object>,
    kwargs: Vec<(String, Object)>,
) -> Result<IndexMap<String, Object>, RuntimeError> {
    let name = function.name();
    let params = &function.def.params;

    if args.len() > params.len() {
        return Err(RuntimeError::type_error(format!(
            "{}() takes {} positional argument{} but {} {} given",
            name,
            params.len(),
            plural(params.len()),
            args.len(),
            if args.len() == 1 { "was" } else { "were" }
        )));
    }

    let mut bound: FxHashMap<&str, Object> = FxHashMap::default();
    for (param, arg) in params.iter().zip(args) {
        bound.insert(param.name.as_str(), arg);
    }
    for (key, value) in kwargs {
        let Some(param) = params.iter().find(|p| p.name == key) else {
            return Err(RuntimeError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                name, key
            )));
        };
        if bound.insert(param.name.as_str(), value).is_some() {
            return Err(RuntimeError::type_error(format!(
                "{}() got multiple values for argument '{}'",
                name, key
            )));
        }
    }

    let first_default = params.len() - function.defaults.len();
    let mut locals = IndexMap::with_capacity(params.len());
    let mut missing = Vec::new();
    for (i, param) in params.iter().enumerate() {
        match bound.remove(param.name.as_str()) {
            Some(value) => {
                locals.insert(param.name.clone(), value);
            }
            None if i >= first_default => {
                locals.insert(param.name.clone(), function.defaults[i - first_default].clone());
            }
            None => missing.push(format!("'{}'", param.name)),
        }
    }

    if !missing.is_empty() {
        let names = match missing.len() {
            1 => missing[0].clone(),
            n => format!("{} and {}", missing[..n - 1].join(", "), missing[n - 1]),
        };
        return Err(RuntimeError::type_error(format!(
            "{}() missing {} required positional argument{}: {}",
            name,
            missing.len(),
            plural(missing.len()),
            names
        )));
    }

    Ok(locals)
}

pub(crate) fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
