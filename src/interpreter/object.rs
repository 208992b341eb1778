//! Live runtime objects
//!
//! [`Object`] is the interpreter's working representation of a value. Lists and
//! dicts are shared through `Rc<RefCell<..>>` exactly like references in the
//! scripting language, so two names can alias one list. Step records never
//! hold an `Object`: [`Object::snapshot`] walks the object graph into an owned
//! [`Value`] tree, breaking cycles as it goes.

use crate::interpreter::builtins::Builtin;
use crate::interpreter::observer::SourceUnit;
use crate::memory::value::{format_real, Value};
use crate::parser::ast::FunctionDef;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

pub type ListRef = Rc<RefCell<Vec<Object>>>;
pub type DictRef = Rc<RefCell<IndexMap<DictKey, Object>>>;

/// A user-defined or prelude function
#[derive(Debug)]
pub struct Function {
    pub def: Rc<FunctionDef>,
    /// Evaluated default values, aligned with the trailing parameters
    pub defaults: Vec<Object>,
    pub unit: SourceUnit,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.def.name
    }
}

/// Containers nested deeper than this render as `[...]` like a cycle
pub const MAX_RENDER_DEPTH: usize = 100;

/// Containers open on the current rendering path
#[derive(Debug, Default)]
struct Walk {
    open: FxHashSet<*const ()>,
}

impl Walk {
    /// Open a container unless it is already open or the path is too deep
    fn enter(&mut self, id: *const ()) -> bool {
        self.open.len() < MAX_RENDER_DEPTH && self.open.insert(id)
    }

    fn leave(&mut self, id: *const ()) {
        self.open.remove(&id);
    }
}

#[derive(Debug, Clone)]
pub enum Object {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(ListRef),
    Tuple(Rc<Vec<Object>>),
    Dict(DictRef),
    Range { start: i64, stop: i64, step: i64 },
    Function(Rc<Function>),
    Builtin(Builtin),
    /// `receiver.method` awaiting a call
    BoundMethod { receiver: Box<Object>, name: String },
}

/// Hashable dict key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    None,
    Bool(bool),
    Int(i64),
    /// Non-integral float, by bit pattern
    Float(u64),
    Str(String),
    Tuple(Vec<DictKey>),
}

impl DictKey {
    pub fn to_object(&self) -> Object {
        match self {
            DictKey::None => Object::None,
            DictKey::Bool(b) => Object::Bool(*b),
            DictKey::Int(n) => Object::Int(*n),
            DictKey::Float(bits) => Object::Float(f64::from_bits(*bits)),
            DictKey::Str(s) => Object::Str(s.clone()),
            DictKey::Tuple(items) => {
                Object::Tuple(Rc::new(items.iter().map(DictKey::to_object).collect()))
            }
        }
    }

    /// Field name used when the dict is captured as a record
    fn field_name(&self) -> String {
        match self {
            DictKey::Str(s) => s.clone(),
            other => other.to_object().repr(),
        }
    }
}

impl Object {
    pub fn new_list(items: Vec<Object>) -> Object {
        Object::List(Rc::new(RefCell::new(items)))
    }

    pub fn new_tuple(items: Vec<Object>) -> Object {
        Object::Tuple(Rc::new(items))
    }

    pub fn new_dict(entries: IndexMap<DictKey, Object>) -> Object {
        Object::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn str(text: impl Into<String>) -> Object {
        Object::Str(text.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::None => "NoneType",
            Object::Bool(_) => "bool",
            Object::Int(_) => "int",
            Object::Float(_) => "float",
            Object::Str(_) => "str",
            Object::List(_) => "list",
            Object::Tuple(_) => "tuple",
            Object::Dict(_) => "dict",
            Object::Range { .. } => "range",
            Object::Function(_) => "function",
            Object::Builtin(_) => "builtin_function_or_method",
            Object::BoundMethod { .. } => "builtin_function_or_method",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Object::None => false,
            Object::Bool(b) => *b,
            Object::Int(n) => *n != 0,
            Object::Float(x) => *x != 0.0,
            Object::Str(s) => !s.is_empty(),
            Object::List(items) => !items.borrow().is_empty(),
            Object::Tuple(items) => !items.is_empty(),
            Object::Dict(entries) => !entries.borrow().is_empty(),
            Object::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
            Object::Function(_) | Object::Builtin(_) | Object::BoundMethod { .. } => true,
        }
    }

    /// Integer view of ints and bools
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Int(n) => Some(*n),
            Object::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Numeric view of ints, bools and floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Object::Float(x) => Some(*x),
            other => other.as_int().map(|n| n as f64),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Object::Int(_) | Object::Bool(_) | Object::Float(_))
    }

    pub fn to_key(&self) -> Option<DictKey> {
        match self {
            Object::None => Some(DictKey::None),
            Object::Bool(b) => Some(DictKey::Bool(*b)),
            Object::Int(n) => Some(DictKey::Int(*n)),
            Object::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 9.2e18 {
                    Some(DictKey::Int(*x as i64))
                } else {
                    Some(DictKey::Float(x.to_bits()))
                }
            }
            Object::Str(s) => Some(DictKey::Str(s.clone())),
            Object::Tuple(items) => items
                .iter()
                .map(Object::to_key)
                .collect::<Option<Vec<_>>>()
                .map(DictKey::Tuple),
            _ => None,
        }
    }

    /// Text produced by `str()` and `print`
    pub fn to_display(&self) -> String {
        match self {
            Object::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// Text produced by `repr()` and container display
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, &mut Walk::default());
        out
    }

    fn write_repr(&self, out: &mut String, walk: &mut Walk) {
        match self {
            Object::None => out.push_str("None"),
            Object::Bool(true) => out.push_str("True"),
            Object::Bool(false) => out.push_str("False"),
            Object::Int(n) => {
                let _ = write!(out, "{}", n);
            }
            Object::Float(x) => out.push_str(&format_real(*x)),
            Object::Str(s) => out.push_str(&quote_str(s)),
            Object::List(items) => {
                let id = Rc::as_ptr(items) as *const ();
                if !walk.enter(id) {
                    out.push_str("[...]");
                    return;
                }
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, walk);
                }
                out.push(']');
                walk.leave(id);
            }
            Object::Tuple(items) => {
                let id = Rc::as_ptr(items) as *const ();
                if !walk.enter(id) {
                    out.push_str("(...)");
                    return;
                }
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, walk);
                }
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
                walk.leave(id);
            }
            Object::Dict(entries) => {
                let id = Rc::as_ptr(entries) as *const ();
                if !walk.enter(id) {
                    out.push_str("{...}");
                    return;
                }
                out.push('{');
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.to_object().write_repr(out, walk);
                    out.push_str(": ");
                    value.write_repr(out, walk);
                }
                out.push('}');
                walk.leave(id);
            }
            Object::Range { start, stop, step } => {
                if *step == 1 {
                    let _ = write!(out, "range({}, {})", start, stop);
                } else {
                    let _ = write!(out, "range({}, {}, {})", start, stop, step);
                }
            }
            Object::Function(function) => {
                let _ = write!(out, "<function {}>", function.name());
            }
            Object::Builtin(builtin) => {
                let _ = write!(out, "<built-in function {}>", builtin.name());
            }
            Object::BoundMethod { receiver, name } => {
                let _ = write!(
                    out,
                    "<built-in method {} of {} object>",
                    name,
                    receiver.type_name()
                );
            }
        }
    }

    /// Deep, owned copy for a step record
    pub fn snapshot(&self) -> Value {
        self.snapshot_inner(&mut Walk::default())
    }

    fn snapshot_inner(&self, walk: &mut Walk) -> Value {
        match self {
            Object::None => Value::Unset,
            Object::Bool(b) => Value::Bool(*b),
            Object::Int(n) => Value::Int(*n),
            Object::Float(x) => Value::Real(*x),
            Object::Str(s) => Value::Str(s.clone()),
            Object::List(items) => {
                let id = Rc::as_ptr(items) as *const ();
                if !walk.enter(id) {
                    return Value::Opaque("[...]".to_string());
                }
                let values = items
                    .borrow()
                    .iter()
                    .map(|item| item.snapshot_inner(walk))
                    .collect();
                walk.leave(id);
                Value::List(values)
            }
            Object::Tuple(items) => {
                let id = Rc::as_ptr(items) as *const ();
                if !walk.enter(id) {
                    return Value::Opaque("(...)".to_string());
                }
                let values = items.iter().map(|item| item.snapshot_inner(walk)).collect();
                walk.leave(id);
                Value::List(values)
            }
            Object::Dict(entries) => {
                let id = Rc::as_ptr(entries) as *const ();
                if !walk.enter(id) {
                    return Value::Opaque("{...}".to_string());
                }
                let fields = entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| (key.field_name(), value.snapshot_inner(walk)))
                    .collect();
                walk.leave(id);
                Value::Record(fields)
            }
            other => Value::Opaque(other.repr()),
        }
    }

    /// Length for `len()`, or `None` for unsized objects
    pub fn len(&self) -> Option<usize> {
        match self {
            Object::Str(s) => Some(s.chars().count()),
            Object::List(items) => Some(items.borrow().len()),
            Object::Tuple(items) => Some(items.len()),
            Object::Dict(entries) => Some(entries.borrow().len()),
            Object::Range { start, stop, step } => Some(range_len(*start, *stop, *step)),
            _ => None,
        }
    }

    /// Identity comparison for `is`
    pub fn is_same(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::None, Object::None) => true,
            (Object::Bool(a), Object::Bool(b)) => a == b,
            (Object::Int(a), Object::Int(b)) => a == b,
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::List(a), Object::List(b)) => Rc::ptr_eq(a, b),
            (Object::Tuple(a), Object::Tuple(b)) => Rc::ptr_eq(a, b),
            (Object::Dict(a), Object::Dict(b)) => Rc::ptr_eq(a, b),
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

/// Value equality for `==`
impl PartialEq for Object {
    fn eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::None, Object::None) => true,
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::Int(a), Object::Int(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_float() == b.as_float(),
            },
            (Object::List(a), Object::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Object::Tuple(a), Object::Tuple(b)) => a == b,
            (Object::Dict(a), Object::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(key, value)| b.get(key).is_some_and(|v| v == value))
            }
            (
                Object::Range { start, stop, step },
                Object::Range {
                    start: s2,
                    stop: e2,
                    step: st2,
                },
            ) => (start, stop, step) == (s2, e2, st2),
            (a, b) => a.is_same(b),
        }
    }
}

pub fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    let len = if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    usize::try_from(len).unwrap_or(usize::MAX)
}

/// Quote a string the way the scripting language's `repr` does
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_matches_scripting_language() {
        let list = Object::new_list(vec![
            Object::Int(1),
            Object::str("a"),
            Object::Float(2.5),
            Object::None,
        ]);
        assert_eq!(list.repr(), "[1, 'a', 2.5, None]");
        assert_eq!(Object::new_tuple(vec![Object::Int(1)]).repr(), "(1,)");
        assert_eq!(Object::Float(3.0).to_display(), "3.0");
        assert_eq!(Object::str("it's").repr(), "\"it's\"");
    }

    #[test]
    fn test_self_referential_list() {
        let list = Object::new_list(vec![Object::Int(1)]);
        if let Object::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.repr(), "[1, [...]]");
        assert_eq!(
            list.snapshot(),
            Value::List(vec![Value::Int(1), Value::Opaque("[...]".to_string())])
        );
        // break the cycle so the test does not leak
        if let Object::List(items) = &list {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_deep_nesting_is_cut_off() {
        let mut nested = Object::new_list(Vec::new());
        for _ in 0..MAX_RENDER_DEPTH + 50 {
            nested = Object::new_list(vec![nested]);
        }

        let mut depth = 0;
        let mut value = nested.snapshot();
        while let Value::List(mut items) = value {
            assert_eq!(items.len(), 1);
            value = items.remove(0);
            depth += 1;
        }
        assert_eq!(depth, MAX_RENDER_DEPTH);
        assert_eq!(value, Value::Opaque("[...]".to_string()));

        let text = nested.repr();
        assert!(text.starts_with("[[[["));
        assert!(text.contains("[...]"));
        assert_eq!(text.matches('[').count(), MAX_RENDER_DEPTH + 1);
    }

    #[test]
    fn test_snapshot_is_independent_of_aliasing() {
        let list = Object::new_list(vec![Object::Int(1)]);
        let alias = list.clone();
        let before = list.snapshot();
        if let Object::List(items) = &alias {
            items.borrow_mut().push(Object::Int(2));
        }
        assert_eq!(before, Value::List(vec![Value::Int(1)]));
        assert_eq!(list.snapshot(), Value::ints(&[1, 2]));
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert_eq!(Object::Int(1), Object::Float(1.0));
        assert_eq!(Object::Bool(true), Object::Int(1));
        assert_ne!(Object::Int(1), Object::str("1"));
    }

    #[test]
    fn test_range_len() {
        assert_eq!(range_len(0, 5, 1), 5);
        assert_eq!(range_len(5, 0, -2), 3);
        assert_eq!(range_len(0, 0, 1), 0);
        assert_eq!(range_len(0, 10, 3), 4);
    }

    #[test]
    fn test_dict_snapshot_is_record() {
        let mut entries = IndexMap::new();
        entries.insert(DictKey::Str("b".to_string()), Object::Int(2));
        entries.insert(DictKey::Int(1), Object::Int(1));
        let value = Object::new_dict(entries).snapshot();
        match value {
            Value::Record(fields) => {
                let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                assert_eq!(names, ["b", "1"]);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }
}
