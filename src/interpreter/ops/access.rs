//! Subscripts, slices, item assignment and unpacking

use crate::interpreter::errors::{ExceptionKind, RuntimeError};
use crate::interpreter::loops::iterate;
use crate::interpreter::object::{range_len, Object};
use crate::interpreter::ops::binary::unhashable;

pub fn get_item(container: &Object, index: &Object) -> Result<Object, RuntimeError> {
    match container {
        Object::List(items) => {
            let items = items.borrow();
            let i = normalize_index(index, items.len(), "list")?;
            Ok(items[i].clone())
        }
        Object::Tuple(items) => {
            let i = normalize_index(index, items.len(), "tuple")?;
            Ok(items[i].clone())
        }
        Object::Str(s) => {
            let len = s.chars().count();
            let i = normalize_index(index, len, "string")?;
            Ok(s
                .chars()
                .nth(i)
                .map(|c| Object::Str(c.to_string()))
                .unwrap_or(Object::None))
        }
        Object::Range { start, stop, step } => {
            let i = normalize_index(index, range_len(*start, *stop, *step), "range object")?;
            let value = i64::try_from(i)
                .ok()
                .and_then(|i| i.checked_mul(*step))
                .and_then(|offset| start.checked_add(offset))
                .ok_or_else(RuntimeError::overflow)?;
            Ok(Object::Int(value))
        }
        Object::Dict(entries) => {
            let key = index.to_key().ok_or_else(|| unhashable(index))?;
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| RuntimeError::exception(ExceptionKind::KeyError, index.repr()))
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

pub fn set_item(container: &Object, index: &Object, value: Object) -> Result<(), RuntimeError> {
    match container {
        Object::List(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let i = normalize_index(index, len, "list assignment")?;
            items[i] = value;
            Ok(())
        }
        Object::Dict(entries) => {
            let key = index.to_key().ok_or_else(|| unhashable(index))?;
            entries.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// Resolve a possibly negative index against `len`
fn normalize_index(index: &Object, len: usize, what: &str) -> Result<usize, RuntimeError> {
    let Some(n) = index.as_int() else {
        let owner = what.split(' ').next().unwrap_or(what);
        return Err(RuntimeError::type_error(format!(
            "{} indices must be integers or slices, not {}",
            owner,
            index.type_name()
        )));
    };
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let i = if n < 0 { n + len } else { n };
    if i < 0 || i >= len {
        return Err(RuntimeError::index_error(format!("{} index out of range", what)));
    }
    usize::try_from(i).map_err(|_| RuntimeError::index_error(format!("{} index out of range", what)))
}

pub fn get_slice(
    container: &Object,
    lower: Option<&Object>,
    upper: Option<&Object>,
    step: Option<&Object>,
) -> Result<Object, RuntimeError> {
    let lower = slice_bound(lower)?;
    let upper = slice_bound(upper)?;
    let step = slice_bound(step)?;

    match container {
        Object::List(items) => {
            let items = items.borrow();
            let picked = slice_indices(items.len(), lower, upper, step)?
                .into_iter()
                .map(|i| items[i].clone())
                .collect();
            Ok(Object::new_list(picked))
        }
        Object::Tuple(items) => {
            let picked = slice_indices(items.len(), lower, upper, step)?
                .into_iter()
                .map(|i| items[i].clone())
                .collect();
            Ok(Object::new_tuple(picked))
        }
        Object::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let picked = slice_indices(chars.len(), lower, upper, step)?
                .into_iter()
                .map(|i| chars[i])
                .collect::<String>();
            Ok(Object::Str(picked))
        }
        Object::Range { .. } => {
            let items = iterate(container)?;
            let picked = slice_indices(items.len(), lower, upper, step)?
                .into_iter()
                .map(|i| items[i].clone())
                .collect();
            Ok(Object::new_list(picked))
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn slice_bound(bound: Option<&Object>) -> Result<Option<i64>, RuntimeError> {
    match bound {
        None | Some(Object::None) => Ok(None),
        Some(value) => value.as_int().map(Some).ok_or_else(|| {
            RuntimeError::type_error(
                "slice indices must be integers or None or have an __index__ method",
            )
        }),
    }
}

/// Positions selected by `[lower:upper:step]` on a sequence of length `len`
fn slice_indices(
    len: usize,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, RuntimeError> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(RuntimeError::value_error("slice step cannot be zero"));
    }

    let mut picked = Vec::new();
    if step > 0 {
        let clamp = |v: i64| {
            if v < 0 {
                (v + len).max(0)
            } else {
                v.min(len)
            }
        };
        let start = lower.map_or(0, clamp);
        let stop = upper.map_or(len, clamp);
        let mut i = start;
        while i < stop {
            picked.push(i as usize);
            i = i.saturating_add(step);
        }
    } else {
        let clamp = |v: i64| {
            if v < 0 {
                (v + len).max(-1)
            } else {
                v.min(len - 1)
            }
        };
        let start = lower.map_or(len - 1, clamp);
        let stop = upper.map_or(-1, clamp);
        let mut i = start;
        while i > stop {
            picked.push(i as usize);
            i = i.saturating_add(step);
        }
    }
    Ok(picked)
}

/// Split an iterable into exactly `expected` items for tuple assignment
pub fn unpack(value: &Object, expected: usize) -> Result<Vec<Object>, RuntimeError> {
    let items = match value {
        Object::List(_)
        | Object::Tuple(_)
        | Object::Str(_)
        | Object::Dict(_)
        | Object::Range { .. } => iterate(value)?,
        other => {
            return Err(RuntimeError::type_error(format!(
                "cannot unpack non-iterable {} object",
                other.type_name()
            )))
        }
    };

    if items.len() > expected {
        return Err(RuntimeError::value_error(format!(
            "too many values to unpack (expected {})",
            expected
        )));
    }
    if items.len() < expected {
        return Err(RuntimeError::value_error(format!(
            "not enough values to unpack (expected {}, got {})",
            expected,
            items.len()
        )));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[i64]) -> Object {
        Object::new_list(items.iter().map(|n| Object::Int(*n)).collect())
    }

    #[test]
    fn test_negative_index() {
        let xs = list(&[1, 2, 3]);
        assert_eq!(get_item(&xs, &Object::Int(-1)).unwrap(), Object::Int(3));
        let err = get_item(&xs, &Object::Int(3)).unwrap_err();
        assert_eq!(err.kind(), Some(ExceptionKind::IndexError));
        assert!(err.to_string().contains("list index out of range"));
    }

    #[test]
    fn test_slices() {
        let xs = list(&[0, 1, 2, 3, 4]);
        let s = |lo: Option<i64>, hi: Option<i64>, st: Option<i64>| {
            let lo = lo.map(Object::Int);
            let hi = hi.map(Object::Int);
            let st = st.map(Object::Int);
            get_slice(&xs, lo.as_ref(), hi.as_ref(), st.as_ref())
                .unwrap()
                .repr()
        };
        assert_eq!(s(Some(1), Some(3), None), "[1, 2]");
        assert_eq!(s(None, None, Some(-1)), "[4, 3, 2, 1, 0]");
        assert_eq!(s(Some(-2), None, None), "[3, 4]");
        assert_eq!(s(None, None, Some(2)), "[0, 2, 4]");
        assert_eq!(s(Some(3), Some(0), Some(-1)), "[3, 2, 1]");
        assert_eq!(s(Some(10), None, None), "[]");
    }

    #[test]
    fn test_string_slice_and_index() {
        let word = Object::str("apple");
        assert_eq!(get_item(&word, &Object::Int(1)).unwrap(), Object::str("p"));
        let tail = get_slice(&word, Some(&Object::Int(3)), None, None).unwrap();
        assert_eq!(tail, Object::str("le"));
    }

    #[test]
    fn test_unpack_counts() {
        let pair = list(&[1, 2]);
        assert_eq!(unpack(&pair, 2).unwrap().len(), 2);
        assert!(unpack(&pair, 3)
            .unwrap_err()
            .to_string()
            .contains("not enough values to unpack"));
        assert!(unpack(&Object::Int(1), 2).is_err());
    }

    #[test]
    fn test_missing_dict_key() {
        let dict = Object::new_dict(Default::default());
        let err = get_item(&dict, &Object::str("k")).unwrap_err();
        assert_eq!(err.kind(), Some(ExceptionKind::KeyError));
        assert!(err.to_string().ends_with("'k'"));
    }
}
