//! Methods of the built-in container and string types
//!
//! - list: `append pop insert extend remove index count sort reverse copy clear`
//! - str: `upper lower strip split join replace startswith endswith find isdigit format`
//! - dict: `get keys values items pop`

use crate::interpreter::engine::{plural, Interpreter};
use crate::interpreter::errors::{ExceptionKind, RuntimeError};
use crate::interpreter::format::format_value;
use crate::interpreter::loops::iterate;
use crate::interpreter::object::Object;
use crate::interpreter::ops::{compare_objects, unhashable};
use std::cmp::Ordering;

const LIST_METHODS: &[&str] = &[
    "append", "pop", "insert", "extend", "remove", "index", "count", "sort", "reverse", "copy",
    "clear",
];
const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "strip",
    "split",
    "join",
    "replace",
    "startswith",
    "endswith",
    "find",
    "isdigit",
    "format",
];
const DICT_METHODS: &[&str] = &["get", "keys", "values", "items", "pop"];

/// Resolve `receiver.name` to a bound method
pub(crate) fn bind_method(receiver: Object, name: &str) -> Result<Object, RuntimeError> {
    let known = match &receiver {
        Object::List(_) => LIST_METHODS,
        Object::Str(_) => STR_METHODS,
        Object::Dict(_) => DICT_METHODS,
        _ => &[],
    };
    if known.contains(&name) {
        Ok(Object::BoundMethod {
            receiver: Box::new(receiver),
            name: name.to_string(),
        })
    } else {
        Err(RuntimeError::exception(
            ExceptionKind::AttributeError,
            format!(
                "'{}' object has no attribute '{}'",
                receiver.type_name(),
                name
            ),
        ))
    }
}

/// Check a positional argument count; `max` of `usize::MAX` means unbounded
pub(crate) fn arity(
    method: &str,
    args: &[Object],
    min: usize,
    max: usize,
) -> Result<(), RuntimeError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("exactly {} argument{}", min, plural(min))
        } else if max == usize::MAX {
            format!("at least {} argument{}", min, plural(min))
        } else {
            format!("{} to {} arguments", min, max)
        };
        return Err(RuntimeError::type_error(format!(
            "{}() takes {} ({} given)",
            method,
            expected,
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn no_keywords(method: &str, kwargs: &[(String, Object)]) -> Result<(), RuntimeError> {
    match kwargs.first() {
        Some((key, _)) => Err(RuntimeError::type_error(format!(
            "{}() got an unexpected keyword argument '{}'",
            method, key
        ))),
        None => Ok(()),
    }
}

fn str_arg<'o>(method: &str, value: &'o Object) -> Result<&'o str, RuntimeError> {
    match value {
        Object::Str(s) => Ok(s),
        other => Err(RuntimeError::type_error(format!(
            "{}() argument must be str, not {}",
            method,
            other.type_name()
        ))),
    }
}

impl<'a> Interpreter<'a> {
    pub(crate) fn call_method(
        &mut self,
        receiver: Object,
        name: &str,
        args: Vec<Object>,
        kwargs: Vec<(String, Object)>,
    ) -> Result<Object, RuntimeError> {
        match &receiver {
            Object::List(_) => list_method(&receiver, name, args, kwargs),
            Object::Str(s) => str_method(s, name, args, kwargs),
            Object::Dict(_) => {
                no_keywords(name, &kwargs)?;
                dict_method(&receiver, name, args)
            }
            other => Err(RuntimeError::exception(
                ExceptionKind::AttributeError,
                format!("'{}' object has no attribute '{}'", other.type_name(), name),
            )),
        }
    }
}

fn list_method(
    receiver: &Object,
    name: &str,
    args: Vec<Object>,
    kwargs: Vec<(String, Object)>,
) -> Result<Object, RuntimeError> {
    let Object::List(items) = receiver else {
        return Err(RuntimeError::type_error("expected a list"));
    };
    if name != "sort" {
        no_keywords(name, &kwargs)?;
    }

    match name {
        "append" => {
            arity(name, &args, 1, 1)?;
            items.borrow_mut().extend(args);
            Ok(Object::None)
        }
        "extend" => {
            arity(name, &args, 1, 1)?;
            let extra = iterate(&args[0])?;
            items.borrow_mut().extend(extra);
            Ok(Object::None)
        }
        "insert" => {
            arity(name, &args, 2, 2)?;
            let index = args[0]
                .as_int()
                .ok_or_else(|| RuntimeError::type_error("'insert' index must be an integer"))?;
            let mut items = items.borrow_mut();
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let at = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(usize::try_from(at).unwrap_or(0), args[1].clone());
            Ok(Object::None)
        }
        "pop" => {
            arity(name, &args, 0, 1)?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(RuntimeError::index_error("pop from empty list"));
            }
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let index = match args.first() {
                Some(value) => value
                    .as_int()
                    .ok_or_else(|| RuntimeError::type_error("'pop' index must be an integer"))?,
                None => len - 1,
            };
            let at = if index < 0 { index + len } else { index };
            if at < 0 || at >= len {
                return Err(RuntimeError::index_error("pop index out of range"));
            }
            Ok(items.remove(usize::try_from(at).unwrap_or(0)))
        }
        "remove" => {
            arity(name, &args, 1, 1)?;
            let mut items = items.borrow_mut();
            match items.iter().position(|item| *item == args[0]) {
                Some(at) => {
                    items.remove(at);
                    Ok(Object::None)
                }
                None => Err(RuntimeError::value_error("list.remove(x): x not in list")),
            }
        }
        "index" => {
            arity(name, &args, 1, 1)?;
            items
                .borrow()
                .iter()
                .position(|item| *item == args[0])
                .map(|at| Object::Int(i64::try_from(at).unwrap_or(i64::MAX)))
                .ok_or_else(|| {
                    RuntimeError::value_error(format!("{} is not in list", args[0].repr()))
                })
        }
        "count" => {
            arity(name, &args, 1, 1)?;
            let count = items.borrow().iter().filter(|item| **item == args[0]).count();
            Ok(Object::Int(i64::try_from(count).unwrap_or(i64::MAX)))
        }
        "sort" => {
            arity(name, &args, 0, 0)?;
            let mut reverse = false;
            for (key, value) in &kwargs {
                match key.as_str() {
                    "reverse" => reverse = value.is_truthy(),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "sort() got an unexpected keyword argument '{}'",
                            other
                        )))
                    }
                }
            }
            let mut sorted = items.borrow().clone();
            sort_objects(&mut sorted, reverse)?;
            *items.borrow_mut() = sorted;
            Ok(Object::None)
        }
        "reverse" => {
            arity(name, &args, 0, 0)?;
            items.borrow_mut().reverse();
            Ok(Object::None)
        }
        "copy" => {
            arity(name, &args, 0, 0)?;
            Ok(Object::new_list(items.borrow().clone()))
        }
        "clear" => {
            arity(name, &args, 0, 0)?;
            items.borrow_mut().clear();
            Ok(Object::None)
        }
        other => Err(no_attribute("list", other)),
    }
}

/// Stable sort with a fallible comparison
pub(crate) fn sort_objects(items: &mut [Object], reverse: bool) -> Result<(), RuntimeError> {
    let mut failure = None;
    items.sort_by(|a, b| match compare_objects(a, b) {
        Ok(ordering) if reverse => ordering.reverse(),
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn str_method(
    s: &str,
    name: &str,
    args: Vec<Object>,
    kwargs: Vec<(String, Object)>,
) -> Result<Object, RuntimeError> {
    if name == "format" {
        return Ok(Object::Str(str_format(s, &args, &kwargs)?));
    }
    no_keywords(name, &kwargs)?;

    match name {
        "upper" => {
            arity(name, &args, 0, 0)?;
            Ok(Object::str(s.to_uppercase()))
        }
        "lower" => {
            arity(name, &args, 0, 0)?;
            Ok(Object::str(s.to_lowercase()))
        }
        "strip" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                Some(Object::None) | None => Ok(Object::str(s.trim())),
                Some(chars) => {
                    let chars: Vec<char> = str_arg(name, chars)?.chars().collect();
                    Ok(Object::str(s.trim_matches(|c| chars.contains(&c))))
                }
            }
        }
        "split" => {
            arity(name, &args, 0, 1)?;
            let parts: Vec<Object> = match args.first() {
                Some(Object::None) | None => s.split_whitespace().map(Object::str).collect(),
                Some(sep) => {
                    let sep = str_arg(name, sep)?;
                    if sep.is_empty() {
                        return Err(RuntimeError::value_error("empty separator"));
                    }
                    s.split(sep).map(Object::str).collect()
                }
            };
            Ok(Object::new_list(parts))
        }
        "join" => {
            arity(name, &args, 1, 1)?;
            let mut pieces = Vec::new();
            for (i, item) in iterate(&args[0])?.iter().enumerate() {
                match item {
                    Object::Str(piece) => pieces.push(piece.clone()),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            i,
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Object::Str(pieces.join(s)))
        }
        "replace" => {
            arity(name, &args, 2, 2)?;
            let from = str_arg(name, &args[0])?;
            let to = str_arg(name, &args[1])?;
            Ok(Object::str(s.replace(from, to)))
        }
        "startswith" => {
            arity(name, &args, 1, 1)?;
            Ok(Object::Bool(s.starts_with(str_arg(name, &args[0])?)))
        }
        "endswith" => {
            arity(name, &args, 1, 1)?;
            Ok(Object::Bool(s.ends_with(str_arg(name, &args[0])?)))
        }
        "find" => {
            arity(name, &args, 1, 1)?;
            let needle = str_arg(name, &args[0])?;
            let position = s
                .find(needle)
                .map(|byte| s[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Ok(Object::Int(position))
        }
        "isdigit" => {
            arity(name, &args, 0, 0)?;
            Ok(Object::Bool(
                !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
            ))
        }
        other => Err(no_attribute("str", other)),
    }
}

/// `"{} {name:>5}".format(...)`
fn str_format(
    template: &str,
    args: &[Object],
    kwargs: &[(String, Object)],
) -> Result<String, RuntimeError> {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    let mut next_auto = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c);
                }
                if !closed {
                    return Err(RuntimeError::value_error(
                        "expected '}' before end of string",
                    ));
                }
                let (key, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let value = if key.is_empty() {
                    let value = args.get(next_auto);
                    next_auto += 1;
                    value
                } else if let Ok(index) = key.parse::<usize>() {
                    args.get(index)
                } else {
                    kwargs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
                };
                let value = value.ok_or_else(|| {
                    if key.is_empty() || key.parse::<usize>().is_ok() {
                        RuntimeError::index_error(
                            "Replacement index out of range for positional args tuple",
                        )
                    } else {
                        RuntimeError::exception(ExceptionKind::KeyError, format!("'{}'", key))
                    }
                })?;
                out.push_str(&format_value(value, spec)?);
            }
            '}' => {
                return Err(RuntimeError::value_error(
                    "Single '}' encountered in format string",
                ))
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn dict_method(receiver: &Object, name: &str, args: Vec<Object>) -> Result<Object, RuntimeError> {
    let Object::Dict(entries) = receiver else {
        return Err(RuntimeError::type_error("expected a dict"));
    };

    match name {
        "get" => {
            arity(name, &args, 1, 2)?;
            let key = args[0].to_key().ok_or_else(|| unhashable(&args[0]))?;
            let default = args.get(1).cloned().unwrap_or(Object::None);
            Ok(entries.borrow().get(&key).cloned().unwrap_or(default))
        }
        "keys" => {
            arity(name, &args, 0, 0)?;
            Ok(Object::new_list(
                entries.borrow().keys().map(|k| k.to_object()).collect(),
            ))
        }
        "values" => {
            arity(name, &args, 0, 0)?;
            Ok(Object::new_list(entries.borrow().values().cloned().collect()))
        }
        "items" => {
            arity(name, &args, 0, 0)?;
            Ok(Object::new_list(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| Object::new_tuple(vec![k.to_object(), v.clone()]))
                    .collect(),
            ))
        }
        "pop" => {
            arity(name, &args, 1, 2)?;
            let key = args[0].to_key().ok_or_else(|| unhashable(&args[0]))?;
            match entries.borrow_mut().shift_remove(&key) {
                Some(value) => Ok(value),
                None => args.get(1).cloned().ok_or_else(|| {
                    RuntimeError::exception(ExceptionKind::KeyError, args[0].repr())
                }),
            }
        }
        other => Err(no_attribute("dict", other)),
    }
}

fn no_attribute(type_name: &str, name: &str) -> RuntimeError {
    RuntimeError::exception(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute '{}'", type_name, name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_format_positional_and_named() {
        let args = vec![Object::Int(1), Object::str("x")];
        let kwargs = vec![("n".to_string(), Object::Float(2.5))];
        let text = str_format("{} {}|{0}|{n:.1f}|{{}}", &args, &kwargs).unwrap();
        assert_eq!(text, "1 x|1|2.5|{}");
    }

    #[test]
    fn test_unknown_attribute() {
        let err = bind_method(Object::Int(1), "append").unwrap_err();
        assert_eq!(err.kind(), Some(ExceptionKind::AttributeError));
        assert!(bind_method(Object::new_list(Vec::new()), "append").is_ok());
    }

    #[test]
    fn test_sort_reports_mixed_types() {
        let mut items = vec![Object::Int(2), Object::str("a")];
        assert!(sort_objects(&mut items, false).is_err());
        let mut items = vec![Object::Int(3), Object::Int(1), Object::Int(2)];
        sort_objects(&mut items, true).unwrap();
        assert_eq!(Object::new_list(items).repr(), "[3, 2, 1]");
    }
}
