//! Statement execution
//!
//! Adds `impl Interpreter` methods for blocks, simple statements, `if` chains,
//! assignment targets and function definitions. Loops are in `loops`.
//!
//! Line events: a statement that starts a physical line fires before it runs.
//! `if` fires once per tested branch (each `elif` reports its own line);
//! loops fire from their header on every test.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{ExceptionKind, RuntimeError};
use crate::interpreter::object::{Function, Object};
use crate::interpreter::ops;
use crate::parser::ast::*;
use std::rc::Rc;

impl<'a> Interpreter<'a> {
    /// Execute statements until one transfers control
    pub(crate) fn execute_block(&mut self, body: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in body {
            self.execute_statement(stmt)?;
            if !matches!(self.control_flow, ControlFlow::Normal) {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        let line = stmt.location.line;
        self.set_line(line);

        let reports_itself = matches!(
            stmt.kind,
            StmtKind::If { .. } | StmtKind::While { .. } | StmtKind::For { .. }
        );
        if stmt.starts_line && !reports_itself {
            self.fire_line(line)?;
        }

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.evaluate(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.evaluate(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => {
                self.execute_aug_assign(target, *op, value)?;
            }
            StmtKind::If { branches, orelse } => {
                self.execute_if(branches, orelse.as_deref())?;
            }
            StmtKind::While { test, body } => self.execute_while(test, body, line)?,
            StmtKind::For { target, iter, body } => self.execute_for(target, iter, body, line)?,
            StmtKind::FunctionDef(def) => self.define_function(def)?,
            StmtKind::Return(value) => {
                if self.frames.is_empty() {
                    return Err(syntax_error("'return' outside function"));
                }
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Object::None,
                };
                self.control_flow = ControlFlow::Return(value);
            }
            StmtKind::Global(names) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.global_names.extend(names.iter().cloned());
                }
            }
            StmtKind::Assert { test, message } => {
                if !self.evaluate(test)?.is_truthy() {
                    let message = match message {
                        Some(expr) => self.evaluate(expr)?.to_display(),
                        None => String::new(),
                    };
                    return Err(RuntimeError::exception(
                        ExceptionKind::AssertionError,
                        message,
                    ));
                }
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    return Err(syntax_error("'break' outside loop"));
                }
                self.control_flow = ControlFlow::Break;
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(syntax_error("'continue' not properly in loop"));
                }
                self.control_flow = ControlFlow::Continue;
            }
            StmtKind::Pass => {}
        }

        Ok(())
    }

    fn execute_if(
        &mut self,
        branches: &[IfBranch],
        orelse: Option<&[Stmt]>,
    ) -> Result<(), RuntimeError> {
        for branch in branches {
            let line = branch.location.line;
            self.set_line(line);
            self.fire_line(line)?;
            if self.evaluate(&branch.test)?.is_truthy() {
                return self.execute_block(&branch.body);
            }
        }
        if let Some(body) = orelse {
            self.execute_block(body)?;
        }
        Ok(())
    }

    fn define_function(&mut self, def: &Rc<FunctionDef>) -> Result<(), RuntimeError> {
        let mut defaults = Vec::new();
        for param in &def.params {
            if let Some(default) = &param.default {
                defaults.push(self.evaluate(default)?);
            }
        }
        let function = Function {
            def: Rc::clone(def),
            defaults,
            unit: self.current_unit(),
        };
        self.assign_name(&def.name, Object::Function(Rc::new(function)));
        Ok(())
    }

    /// Store a value into an assignment target
    pub(crate) fn assign(&mut self, target: &Target, value: Object) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => {
                self.assign_name(name, value);
                Ok(())
            }
            Target::Index { value: container, index } => {
                let container = self.evaluate(container)?;
                let index = self.evaluate(index)?;
                ops::set_item(&container, &index, value)
            }
            Target::Tuple(targets) => {
                let items = ops::unpack(&value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
                Ok(())
            }
        }
    }

    fn execute_aug_assign(
        &mut self,
        target: &Target,
        op: BinOp,
        value: &Expr,
    ) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let rhs = self.evaluate(value)?;
                let result = ops::inplace_op(op, &current, &rhs)?;
                self.assign_name(name, result);
                Ok(())
            }
            Target::Index { value: container, index } => {
                let container = self.evaluate(container)?;
                let index = self.evaluate(index)?;
                let current = ops::get_item(&container, &index)?;
                let rhs = self.evaluate(value)?;
                let result = ops::inplace_op(op, &current, &rhs)?;
                ops::set_item(&container, &index, result)
            }
            Target::Tuple(_) => Err(syntax_error(
                "illegal expression for augmented assignment",
            )),
        }
    }
}

fn syntax_error(message: &str) -> RuntimeError {
    RuntimeError::exception(ExceptionKind::SyntaxError, message)
}
