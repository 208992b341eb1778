//! Built-in function implementations
//!
//! Builtins are resolved by name after globals, so a program may shadow them.
//! Functions that are easy to express in the scripting language itself (`abs`,
//! `sum`, `any`, ...) live in the prelude instead.
//!
//! # Supported Built-ins
//!
//! - Output: `print(*args, sep=' ', end='\n')`
//! - Conversions: `int float str bool list tuple dict repr format bin oct hex ord chr`
//! - Sequences: `len range enumerate zip sorted min max`
//! - Numbers: `round`

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{ExceptionKind, RuntimeError};
use crate::interpreter::format::format_value;
use crate::interpreter::loops::iterate;
use crate::interpreter::methods::{arity, no_keywords, sort_objects};
use crate::interpreter::object::Object;
use crate::interpreter::ops::{compare_objects, unhashable};
use indexmap::IndexMap;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Range,
    Int,
    Float,
    Str,
    Bool,
    List,
    Tuple,
    Dict,
    Min,
    Max,
    Sorted,
    Round,
    Enumerate,
    Zip,
    Ord,
    Chr,
    Bin,
    Oct,
    Hex,
    Format,
    Repr,
}

const ALL: &[Builtin] = &[
    Builtin::Print,
    Builtin::Len,
    Builtin::Range,
    Builtin::Int,
    Builtin::Float,
    Builtin::Str,
    Builtin::Bool,
    Builtin::List,
    Builtin::Tuple,
    Builtin::Dict,
    Builtin::Min,
    Builtin::Max,
    Builtin::Sorted,
    Builtin::Round,
    Builtin::Enumerate,
    Builtin::Zip,
    Builtin::Ord,
    Builtin::Chr,
    Builtin::Bin,
    Builtin::Oct,
    Builtin::Hex,
    Builtin::Format,
    Builtin::Repr,
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        ALL.iter().copied().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Dict => "dict",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sorted => "sorted",
            Builtin::Round => "round",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::Ord => "ord",
            Builtin::Chr => "chr",
            Builtin::Bin => "bin",
            Builtin::Oct => "oct",
            Builtin::Hex => "hex",
            Builtin::Format => "format",
            Builtin::Repr => "repr",
        }
    }
}

impl<'a> Interpreter<'a> {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Object>,
        kwargs: Vec<(String, Object)>,
    ) -> Result<Object, RuntimeError> {
        let name = builtin.name();
        match builtin {
            Builtin::Print => self.builtin_print(args, kwargs),
            Builtin::Sorted => builtin_sorted(args, kwargs),
            Builtin::Enumerate => builtin_enumerate(args, kwargs),
            Builtin::Dict => builtin_dict(args, kwargs),
            _ => {
                no_keywords(name, &kwargs)?;
                call_simple(builtin, args)
            }
        }
    }

    fn builtin_print(
        &mut self,
        args: Vec<Object>,
        kwargs: Vec<(String, Object)>,
    ) -> Result<Object, RuntimeError> {
        let mut sep = " ".to_string();
        let mut end = "\n".to_string();
        for (key, value) in kwargs {
            let slot = match key.as_str() {
                "sep" => &mut sep,
                "end" => &mut end,
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "'{}' is an invalid keyword argument for print()",
                        other
                    )))
                }
            };
            match value {
                Object::None => {}
                Object::Str(s) => *slot = s,
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "{} must be None or a string, not {}",
                        key,
                        other.type_name()
                    )))
                }
            }
        }

        let text = args
            .iter()
            .map(Object::to_display)
            .collect::<Vec<_>>()
            .join(&sep);
        self.write_output(&text);
        self.write_output(&end);
        Ok(Object::None)
    }
}

fn call_simple(builtin: Builtin, args: Vec<Object>) -> Result<Object, RuntimeError> {
    let name = builtin.name();
    match builtin {
        Builtin::Len => {
            arity(name, &args, 1, 1)?;
            let len = args[0].len().ok_or_else(|| {
                RuntimeError::type_error(format!(
                    "object of type '{}' has no len()",
                    args[0].type_name()
                ))
            })?;
            Ok(Object::Int(i64::try_from(len).unwrap_or(i64::MAX)))
        }
        Builtin::Range => builtin_range(&args),
        Builtin::Int => builtin_int(&args),
        Builtin::Float => builtin_float(&args),
        Builtin::Str => {
            arity(name, &args, 0, 1)?;
            Ok(Object::Str(
                args.first().map(Object::to_display).unwrap_or_default(),
            ))
        }
        Builtin::Bool => {
            arity(name, &args, 0, 1)?;
            Ok(Object::Bool(args.first().is_some_and(Object::is_truthy)))
        }
        Builtin::List => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                Some(iterable) => Ok(Object::new_list(iterate(iterable)?)),
                None => Ok(Object::new_list(Vec::new())),
            }
        }
        Builtin::Tuple => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                Some(iterable) => Ok(Object::new_tuple(iterate(iterable)?)),
                None => Ok(Object::new_tuple(Vec::new())),
            }
        }
        Builtin::Min => extreme(name, args, Ordering::Less),
        Builtin::Max => extreme(name, args, Ordering::Greater),
        Builtin::Round => builtin_round(&args),
        Builtin::Zip => {
            let columns = args.iter().map(iterate).collect::<Result<Vec<_>, _>>()?;
            let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
            let zipped = (0..rows)
                .map(|row| Object::new_tuple(columns.iter().map(|c| c[row].clone()).collect()))
                .collect();
            Ok(Object::new_list(zipped))
        }
        Builtin::Ord => {
            arity(name, &args, 1, 1)?;
            let Object::Str(s) = &args[0] else {
                return Err(RuntimeError::type_error(format!(
                    "ord() expected string of length 1, but {} found",
                    args[0].type_name()
                )));
            };
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Object::Int(i64::from(u32::from(c)))),
                _ => Err(RuntimeError::type_error(format!(
                    "ord() expected a character, but string of length {} found",
                    s.chars().count()
                ))),
            }
        }
        Builtin::Chr => {
            arity(name, &args, 1, 1)?;
            let code = integer_arg(&args[0])?;
            u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .map(|c| Object::Str(c.to_string()))
                .ok_or_else(|| RuntimeError::value_error("chr() arg not in range(0x110000)"))
        }
        Builtin::Bin | Builtin::Oct | Builtin::Hex => {
            arity(name, &args, 1, 1)?;
            let n = integer_arg(&args[0])?;
            let magnitude = n.unsigned_abs();
            let digits = match builtin {
                Builtin::Bin => format!("0b{:b}", magnitude),
                Builtin::Oct => format!("0o{:o}", magnitude),
                _ => format!("0x{:x}", magnitude),
            };
            let sign = if n < 0 { "-" } else { "" };
            Ok(Object::Str(format!("{}{}", sign, digits)))
        }
        Builtin::Format => {
            arity(name, &args, 1, 2)?;
            let spec = match args.get(1) {
                Some(Object::Str(spec)) => spec.as_str(),
                Some(other) => {
                    return Err(RuntimeError::type_error(format!(
                        "format() argument 2 must be str, not {}",
                        other.type_name()
                    )))
                }
                None => "",
            };
            Ok(Object::Str(format_value(&args[0], spec)?))
        }
        Builtin::Repr => {
            arity(name, &args, 1, 1)?;
            Ok(Object::Str(args[0].repr()))
        }
        Builtin::Print | Builtin::Sorted | Builtin::Enumerate | Builtin::Dict => Err(
            RuntimeError::type_error(format!("{}() cannot be called this way", name)),
        ),
    }
}

/// Integer argument where floats are rejected, as for `range()` and `chr()`
fn integer_arg(value: &Object) -> Result<i64, RuntimeError> {
    value.as_int().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

fn builtin_range(args: &[Object]) -> Result<Object, RuntimeError> {
    arity("range", args, 1, 3)?;
    let values = args.iter().map(integer_arg).collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match values.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => (0, 0, 1),
    };
    if step == 0 {
        return Err(RuntimeError::value_error("range() arg 3 must not be zero"));
    }
    Ok(Object::Range { start, stop, step })
}

fn builtin_int(args: &[Object]) -> Result<Object, RuntimeError> {
    arity("int", args, 0, 2)?;
    let Some(value) = args.first() else {
        return Ok(Object::Int(0));
    };

    if let Some(base) = args.get(1) {
        let base = integer_arg(base)?;
        let Object::Str(text) = value else {
            return Err(RuntimeError::type_error(
                "int() can't convert non-string with explicit base",
            ));
        };
        if !(2..=36).contains(&base) && base != 0 {
            return Err(RuntimeError::value_error("int() base must be >= 2 and <= 36, or 0"));
        }
        return parse_int(text, base as u32);
    }

    match value {
        Object::Int(n) => Ok(Object::Int(*n)),
        Object::Bool(b) => Ok(Object::Int(i64::from(*b))),
        Object::Float(x) => {
            if x.is_nan() {
                return Err(RuntimeError::value_error("cannot convert float NaN to integer"));
            }
            if x.is_infinite() {
                return Err(RuntimeError::exception(
                    ExceptionKind::OverflowError,
                    "cannot convert float infinity to integer",
                ));
            }
            let truncated = x.trunc();
            if truncated < -9.223_372_036_854_776e18 || truncated >= 9.223_372_036_854_776e18 {
                return Err(RuntimeError::overflow());
            }
            Ok(Object::Int(truncated as i64))
        }
        Object::Str(text) => parse_int(text, 10),
        other => Err(RuntimeError::type_error(format!(
            "int() argument must be a string or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

/// Parse an integer literal the way `int(text, base)` does
fn parse_int(text: &str, base: u32) -> Result<Object, RuntimeError> {
    let invalid = || {
        RuntimeError::value_error(format!(
            "invalid literal for int() with base {}: {}",
            base,
            crate::interpreter::object::quote_str(text)
        ))
    };

    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let lower = unsigned.to_ascii_lowercase();
    let prefixed = |prefix: &str, radix: u32| {
        (base == radix || base == 0)
            .then(|| lower.strip_prefix(prefix))
            .flatten()
            .map(|rest| (rest.to_string(), radix))
    };
    let (digits, radix) = prefixed("0x", 16)
        .or_else(|| prefixed("0o", 8))
        .or_else(|| prefixed("0b", 2))
        .unwrap_or((lower.clone(), if base == 0 { 10 } else { base }));

    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__")
    {
        return Err(invalid());
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = u64::from_str_radix(&digits, radix).map_err(|err| {
        if matches!(err.kind(), std::num::IntErrorKind::PosOverflow) {
            RuntimeError::overflow()
        } else {
            invalid()
        }
    })?;

    let value = if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    };
    value.map(Object::Int).ok_or_else(RuntimeError::overflow)
}

fn builtin_float(args: &[Object]) -> Result<Object, RuntimeError> {
    arity("float", args, 0, 1)?;
    match args.first() {
        None => Ok(Object::Float(0.0)),
        Some(Object::Str(text)) => {
            let cleaned = text.trim().replace('_', "");
            cleaned.parse::<f64>().map(Object::Float).map_err(|_| {
                RuntimeError::value_error(format!(
                    "could not convert string to float: {}",
                    crate::interpreter::object::quote_str(text)
                ))
            })
        }
        Some(value) => value.as_float().map(Object::Float).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                value.type_name()
            ))
        }),
    }
}

fn builtin_round(args: &[Object]) -> Result<Object, RuntimeError> {
    arity("round", args, 1, 2)?;
    let digits = match args.get(1) {
        None | Some(Object::None) => None,
        Some(value) => Some(integer_arg(value)?),
    };

    match (&args[0], digits) {
        (Object::Int(n), _) => Ok(Object::Int(*n)),
        (Object::Bool(b), _) => Ok(Object::Int(i64::from(*b))),
        (Object::Float(x), None) => {
            let rounded = x.round_ties_even();
            if !rounded.is_finite() {
                return Err(RuntimeError::exception(
                    ExceptionKind::OverflowError,
                    "cannot convert float infinity to integer",
                ));
            }
            if rounded.abs() >= 9.223_372_036_854_776e18 {
                return Err(RuntimeError::overflow());
            }
            Ok(Object::Int(rounded as i64))
        }
        (Object::Float(x), Some(digits)) => {
            let digits = i32::try_from(digits.clamp(-308, 308)).unwrap_or(0);
            let scale = 10f64.powi(digits);
            let rounded = (x * scale).round_ties_even() / scale;
            Ok(Object::Float(if rounded.is_finite() { rounded } else { *x }))
        }
        (other, _) => Err(RuntimeError::type_error(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

/// `min` / `max` over one iterable or several arguments; the first extreme wins
fn extreme(name: &str, args: Vec<Object>, wanted: Ordering) -> Result<Object, RuntimeError> {
    arity(name, &args, 1, usize::MAX)?;
    let candidates = if args.len() == 1 {
        iterate(&args[0])?
    } else {
        args
    };

    let mut best: Option<Object> = None;
    for item in candidates {
        best = match best {
            None => Some(item),
            Some(current) => {
                if compare_objects(&item, &current)? == wanted {
                    Some(item)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.ok_or_else(|| RuntimeError::value_error(format!("{}() arg is an empty sequence", name)))
}

fn builtin_sorted(args: Vec<Object>, kwargs: Vec<(String, Object)>) -> Result<Object, RuntimeError> {
    arity("sorted", &args, 1, 1)?;
    let mut reverse = false;
    for (key, value) in &kwargs {
        match key.as_str() {
            "reverse" => reverse = value.is_truthy(),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "sorted() got an unexpected keyword argument '{}'",
                    other
                )))
            }
        }
    }
    let mut items = iterate(&args[0])?;
    sort_objects(&mut items, reverse)?;
    Ok(Object::new_list(items))
}

fn builtin_enumerate(
    args: Vec<Object>,
    kwargs: Vec<(String, Object)>,
) -> Result<Object, RuntimeError> {
    arity("enumerate", &args, 1, 2)?;
    let mut start = match args.get(1) {
        Some(value) => integer_arg(value)?,
        None => 0,
    };
    for (key, value) in &kwargs {
        match key.as_str() {
            "start" if args.len() == 1 => start = integer_arg(value)?,
            other => {
                return Err(RuntimeError::type_error(format!(
                    "enumerate() got an unexpected keyword argument '{}'",
                    other
                )))
            }
        }
    }

    let mut pairs = Vec::new();
    for item in iterate(&args[0])? {
        pairs.push(Object::new_tuple(vec![Object::Int(start), item]));
        start = start.checked_add(1).ok_or_else(RuntimeError::overflow)?;
    }
    Ok(Object::new_list(pairs))
}

fn builtin_dict(args: Vec<Object>, kwargs: Vec<(String, Object)>) -> Result<Object, RuntimeError> {
    arity("dict", &args, 0, 1)?;
    let mut entries = IndexMap::new();

    match args.first() {
        Some(Object::Dict(source)) => {
            entries.extend(source.borrow().iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Some(iterable) => {
            for (i, pair) in iterate(iterable)?.iter().enumerate() {
                let items = iterate(pair).map_err(|_| {
                    RuntimeError::type_error(format!(
                        "cannot convert dictionary update sequence element #{} to a sequence",
                        i
                    ))
                })?;
                let [key, value] = <[Object; 2]>::try_from(items).map_err(|items| {
                    RuntimeError::value_error(format!(
                        "dictionary update sequence element #{} has length {}; 2 is required",
                        i,
                        items.len()
                    ))
                })?;
                let key_id = key.to_key().ok_or_else(|| unhashable(&key))?;
                entries.insert(key_id, value);
            }
        }
        None => {}
    }
    for (key, value) in kwargs {
        entries.insert(crate::interpreter::object::DictKey::Str(key), value);
    }
    Ok(Object::new_dict(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: Builtin, args: Vec<Object>) -> Result<Object, RuntimeError> {
        call_simple(builtin, args)
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Builtin::from_name("len"), Some(Builtin::Len));
        assert_eq!(Builtin::from_name("printf"), None);
        for builtin in ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(*builtin));
        }
    }

    #[test]
    fn test_int_parsing() {
        assert_eq!(call(Builtin::Int, vec![Object::str(" 42 ")]).unwrap(), Object::Int(42));
        assert_eq!(
            call(Builtin::Int, vec![Object::str("ff"), Object::Int(16)]).unwrap(),
            Object::Int(255)
        );
        assert_eq!(
            call(Builtin::Int, vec![Object::str("0b101"), Object::Int(0)]).unwrap(),
            Object::Int(5)
        );
        assert_eq!(call(Builtin::Int, vec![Object::Float(-3.9)]).unwrap(), Object::Int(-3));
        let err = call(Builtin::Int, vec![Object::str("3.5")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ValueError: invalid literal for int() with base 10: '3.5'"
        );
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(call(Builtin::Round, vec![Object::Float(2.5)]).unwrap(), Object::Int(2));
        assert_eq!(call(Builtin::Round, vec![Object::Float(3.5)]).unwrap(), Object::Int(4));
        assert_eq!(
            call(Builtin::Round, vec![Object::Float(3.14159), Object::Int(2)]).unwrap(),
            Object::Float(3.14)
        );
    }

    #[test]
    fn test_min_max() {
        let xs = Object::new_list(vec![Object::Int(3), Object::Int(1), Object::Int(2)]);
        assert_eq!(call(Builtin::Min, vec![xs.clone()]).unwrap(), Object::Int(1));
        assert_eq!(call(Builtin::Max, vec![xs]).unwrap(), Object::Int(3));
        assert_eq!(
            call(Builtin::Max, vec![Object::Int(1), Object::Float(2.5)]).unwrap(),
            Object::Float(2.5)
        );
        let err = call(Builtin::Min, vec![Object::new_list(Vec::new())]).unwrap_err();
        assert!(err.to_string().contains("empty sequence"));
    }

    #[test]
    fn test_number_text() {
        assert_eq!(call(Builtin::Bin, vec![Object::Int(-5)]).unwrap(), Object::str("-0b101"));
        assert_eq!(call(Builtin::Hex, vec![Object::Int(255)]).unwrap(), Object::str("0xff"));
        assert_eq!(call(Builtin::Chr, vec![Object::Int(65)]).unwrap(), Object::str("A"));
        assert_eq!(call(Builtin::Ord, vec![Object::str("a")]).unwrap(), Object::Int(97));
    }

    #[test]
    fn test_range_arguments() {
        assert!(call(Builtin::Range, vec![Object::Float(1.0)]).is_err());
        assert!(call(Builtin::Range, vec![Object::Int(0), Object::Int(5), Object::Int(0)]).is_err());
        let r = call(Builtin::Range, vec![Object::Int(5)]).unwrap();
        assert_eq!(r.len(), Some(5));
    }

    #[test]
    fn test_dict_from_pairs() {
        let pairs = Object::new_list(vec![Object::new_tuple(vec![Object::str("a"), Object::Int(1)])]);
        let dict = builtin_dict(vec![pairs], vec![("b".to_string(), Object::Int(2))]).unwrap();
        assert_eq!(dict.repr(), "{'a': 1, 'b': 2}");
    }
}
