//! Expression evaluation
//!
//! Adds `impl Interpreter` methods that reduce an [`Expr`] to an [`Object`].
//! Operator semantics are delegated to [`ops`](crate::interpreter::ops); this
//! module handles evaluation order, short-circuiting, calls and comprehension
//! scopes.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::format::format_value;
use crate::interpreter::loops::LoopIter;
use crate::interpreter::methods::bind_method;
use crate::interpreter::object::Object;
use crate::interpreter::ops;
use crate::parser::ast::*;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

impl<'a> Interpreter<'a> {
    pub(crate) fn evaluate(&mut self, expr: &Expr) -> Result<Object, RuntimeError> {
        match expr {
            Expr::Int(n) => Ok(Object::Int(*n)),
            Expr::Float(x) => Ok(Object::Float(*x)),
            Expr::Str(s) => Ok(Object::Str(s.clone())),
            Expr::Bool(b) => Ok(Object::Bool(*b)),
            Expr::None => Ok(Object::None),
            Expr::FString(parts) => self.evaluate_fstring(parts),
            Expr::Name(name) => self.lookup(name),

            Expr::List(items) => Ok(Object::new_list(self.evaluate_all(items)?)),
            Expr::Tuple(items) => Ok(Object::new_tuple(self.evaluate_all(items)?)),
            Expr::Dict(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key = self.evaluate(key_expr)?;
                    let key = key.to_key().ok_or_else(|| ops::unhashable(&key))?;
                    let value = self.evaluate(value_expr)?;
                    map.insert(key, value);
                }
                Ok(Object::new_dict(map))
            }

            Expr::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                ops::unary_op(*op, &value)
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                ops::binary_op(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.evaluate(left)?;
                let short_circuits = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Compare { first, rest } => {
                let mut left = self.evaluate(first)?;
                for (op, right_expr) in rest {
                    let right = self.evaluate(right_expr)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Object::Bool(false));
                    }
                    left = right;
                }
                Ok(Object::Bool(true))
            }
            Expr::Conditional { test, body, orelse } => {
                if self.evaluate(test)?.is_truthy() {
                    self.evaluate(body)
                } else {
                    self.evaluate(orelse)
                }
            }

            Expr::Call { func, args, kwargs } => {
                let callee = self.evaluate(func)?;
                let args = self.evaluate_all(args)?;
                let mut keywords = Vec::with_capacity(kwargs.len());
                for (name, value) in kwargs {
                    keywords.push((name.clone(), self.evaluate(value)?));
                }
                self.call_object(callee, args, keywords)
            }
            Expr::Attribute { value, name } => {
                let receiver = self.evaluate(value)?;
                bind_method(receiver, name)
            }
            Expr::Index { value, index } => {
                let container = self.evaluate(value)?;
                let index = self.evaluate(index)?;
                ops::get_item(&container, &index)
            }
            Expr::Slice {
                value,
                lower,
                upper,
                step,
            } => {
                let container = self.evaluate(value)?;
                let lower = self.evaluate_optional(lower.as_deref())?;
                let upper = self.evaluate_optional(upper.as_deref())?;
                let step = self.evaluate_optional(step.as_deref())?;
                ops::get_slice(&container, lower.as_ref(), upper.as_ref(), step.as_ref())
            }
            Expr::ListComp {
                element,
                target,
                iter,
                conditions,
            } => self.evaluate_comprehension(element, target, iter, conditions),
        }
    }

    fn evaluate_all(&mut self, exprs: &[Expr]) -> Result<Vec<Object>, RuntimeError> {
        exprs.iter().map(|expr| self.evaluate(expr)).collect()
    }

    fn evaluate_optional(&mut self, expr: Option<&Expr>) -> Result<Option<Object>, RuntimeError> {
        expr.map(|expr| self.evaluate(expr)).transpose()
    }

    fn evaluate_fstring(&mut self, parts: &[FStringPart]) -> Result<Object, RuntimeError> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Field { expr, spec } => {
                    let value = self.evaluate(expr)?;
                    match spec {
                        Some(spec) => out.push_str(&format_value(&value, spec)?),
                        None => out.push_str(&value.to_display()),
                    }
                }
            }
        }
        Ok(Object::Str(out))
    }

    /// `[element for target in iter if ...]` with its own variable scope
    fn evaluate_comprehension(
        &mut self,
        element: &Expr,
        target: &Target,
        iter: &Expr,
        conditions: &[Expr],
    ) -> Result<Object, RuntimeError> {
        // The outermost iterable belongs to the enclosing scope
        let iterable = self.evaluate(iter)?;
        let items = LoopIter::new(&iterable)?;

        self.overlays.push(FxHashMap::default());
        let result = self.collect_comprehension(items, element, target, conditions);
        self.overlays.pop();

        Ok(Object::new_list(result?))
    }

    fn collect_comprehension(
        &mut self,
        items: LoopIter,
        element: &Expr,
        target: &Target,
        conditions: &[Expr],
    ) -> Result<Vec<Object>, RuntimeError> {
        let mut out = Vec::new();
        'items: for item in items {
            self.bind_overlay(target, item)?;
            for condition in conditions {
                if !self.evaluate(condition)?.is_truthy() {
                    continue 'items;
                }
            }
            out.push(self.evaluate(element)?);
        }
        Ok(out)
    }

    fn bind_overlay(&mut self, target: &Target, value: Object) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => {
                if let Some(overlay) = self.overlays.last_mut() {
                    overlay.insert(name.clone(), value);
                }
                Ok(())
            }
            Target::Tuple(targets) => {
                let items = ops::unpack(&value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.bind_overlay(target, item)?;
                }
                Ok(())
            }
            Target::Index { .. } => self.assign(target, value),
        }
    }
}
