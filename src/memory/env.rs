//! Variable environment captured at each step

use super::value::Value;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

static UNSET: Value = Value::Unset;

/// Name → value bindings in declaration order.
///
/// Rebinding an existing name keeps its original position, so the variable
/// table in a viewer does not reshuffle while stepping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    vars: IndexMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            vars: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Lookup that treats a missing binding as [`Value::Unset`]
    pub fn value(&self, name: &str) -> &Value {
        self.vars.get(name).unwrap_or(&UNSET)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.vars.get_mut(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Bindings ordered by name
    pub fn sorted(&self) -> Vec<(&String, &Value)> {
        let mut entries: Vec<_> = self.vars.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Overlay `other` onto this environment, replacing shared names in place.
    pub fn merge(&mut self, other: &Environment) {
        for (name, value) in other.iter() {
            self.vars.insert(name.clone(), value.clone());
        }
    }

    /// Deep copy for storage in a step record.
    ///
    /// [`Value`] owns its whole subtree, so the copy shares nothing with `self`.
    pub fn snapshot(&self) -> Environment {
        self.clone()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Environment {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Environment {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.vars.len()))?;
        for (name, value) in &self.vars {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebinding_keeps_declared_order() {
        let mut env = Environment::new();
        env.set("z", Value::Int(1));
        env.set("a", Value::Int(2));
        env.set("z", Value::Int(3));

        let names: Vec<_> = env.names().collect();
        assert_eq!(names, vec!["z", "a"]);
        assert_eq!(env.value("z"), &Value::Int(3));
        assert_eq!(env.value("missing"), &Value::Unset);

        let sorted: Vec<_> = env.sorted().into_iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(sorted, vec!["a", "z"]);
    }

    #[test]
    fn test_snapshot_survives_mutation() {
        let mut env: Environment = [("queue", Value::ints(&[1]))].into_iter().collect();
        let before = env.snapshot();
        env.get_mut("queue")
            .and_then(Value::as_list_mut)
            .unwrap()
            .push(Value::Int(2));
        assert_eq!(before.value("queue"), &Value::ints(&[1]));
        assert_eq!(env.value("queue"), &Value::ints(&[1, 2]));
    }
}
