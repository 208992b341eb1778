//! Algorithm descriptors
//!
//! A [`Descriptor`] is a data table: one [`LineRule`] per displayed pseudocode
//! line. Each rule carries an optional state mutation and a [`Flow`] that picks
//! the next line. Descriptors are authored once, validated when the library is
//! built, and never mutated afterwards.
//!
//! Lines are numbered from 1. [`PAST_END`] is the only transfer target allowed
//! outside `1..=len`; it ends the run.

use crate::machine::runner::Scope;
use crate::memory::{Environment, Value};
use thiserror::Error;

/// Transfer target meaning "run is complete"
pub const PAST_END: usize = usize::MAX;

/// State change applied when a line executes
pub type Mutator = fn(&mut Scope<'_>);
/// Boolean condition of a branch line
pub type Predicate = fn(&Scope<'_>) -> bool;
/// Multi-way decision returning one of the declared targets
pub type Decider = fn(&Scope<'_>) -> usize;
/// Computes a value from the current scope (return values, call arguments)
pub type Evaluator = fn(&Scope<'_>) -> Value;
/// Builds the locals of a called procedure's frame
pub type Binder = fn(&Scope<'_>) -> Environment;
/// Stores a callee's return value into the caller's scope
pub type Receiver = fn(&mut Scope<'_>, Value);
/// Folds a callee's return value into the caller's own return value
pub type Combiner = fn(&Scope<'_>, Value) -> Value;

/// How a caller continues once its callee returns
#[derive(Clone, Copy)]
pub enum Resume {
    /// Continue at `line`, optionally handing the return value to `receive`
    At {
        line: usize,
        receive: Option<Receiver>,
    },
    /// Return immediately with `combine(caller scope, returned value)`
    Tail { combine: Combiner },
}

impl Resume {
    pub fn at(line: usize) -> Self {
        Resume::At {
            line,
            receive: None,
        }
    }

    pub fn receiving(line: usize, receive: Receiver) -> Self {
        Resume::At {
            line,
            receive: Some(receive),
        }
    }

    pub fn tail(combine: Combiner) -> Self {
        Resume::Tail { combine }
    }
}

/// Selects the line that executes after the current one
#[derive(Clone, Copy)]
pub enum Flow {
    Next,
    Goto(usize),
    Branch {
        test: Predicate,
        then: usize,
        otherwise: usize,
    },
    Decide {
        decide: Decider,
        targets: &'static [usize],
    },
    Call {
        procedure: &'static str,
        entry: usize,
        bind: Binder,
        resume: Resume,
    },
    Return {
        value: Option<Evaluator>,
    },
    End,
}

/// One displayed line and its behaviour
#[derive(Clone, Copy)]
pub struct LineRule {
    pub text: &'static str,
    pub mutate: Option<Mutator>,
    pub flow: Flow,
}

impl LineRule {
    /// A line that changes nothing and falls through
    pub fn new(text: &'static str) -> Self {
        LineRule {
            text,
            mutate: None,
            flow: Flow::Next,
        }
    }

    pub fn mutate(mut self, mutate: Mutator) -> Self {
        self.mutate = Some(mutate);
        self
    }

    pub fn goto(mut self, line: usize) -> Self {
        self.flow = Flow::Goto(line);
        self
    }

    pub fn branch(mut self, test: Predicate, then: usize, otherwise: usize) -> Self {
        self.flow = Flow::Branch {
            test,
            then,
            otherwise,
        };
        self
    }

    pub fn decide(mut self, decide: Decider, targets: &'static [usize]) -> Self {
        self.flow = Flow::Decide { decide, targets };
        self
    }

    pub fn call(
        mut self,
        procedure: &'static str,
        entry: usize,
        bind: Binder,
        resume: Resume,
    ) -> Self {
        self.flow = Flow::Call {
            procedure,
            entry,
            bind,
            resume,
        };
        self
    }

    pub fn returns(mut self, value: Evaluator) -> Self {
        self.flow = Flow::Return { value: Some(value) };
        self
    }

    /// Return from the current procedure without a value
    pub fn leave(mut self) -> Self {
        self.flow = Flow::Return { value: None };
        self
    }

    pub fn end(mut self) -> Self {
        self.flow = Flow::End;
        self
    }

    /// Every line number this rule may transfer to
    fn targets(&self) -> Vec<usize> {
        match self.flow {
            Flow::Next | Flow::Return { .. } | Flow::End => Vec::new(),
            Flow::Goto(line) => vec![line],
            Flow::Branch {
                then, otherwise, ..
            } => vec![then, otherwise],
            Flow::Decide { targets, .. } => targets.to_vec(),
            Flow::Call { entry, resume, .. } => match resume {
                Resume::At { line, .. } => vec![entry, line],
                Resume::Tail { .. } => vec![entry],
            },
        }
    }
}

/// Where the first frame starts
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub procedure: &'static str,
    pub line: usize,
    /// Initial bindings moved from the globals into the first frame
    pub params: &'static [&'static str],
}

/// A named set of input values, like an answer option's test case
#[derive(Debug, Clone)]
pub struct Preset {
    pub label: &'static str,
    pub values: Environment,
}

impl Preset {
    pub fn new<I>(label: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        Preset {
            label,
            values: values.into_iter().collect(),
        }
    }
}

/// An alternative reading of the blank lines in a fill-in question
#[derive(Debug, Clone, Copy)]
pub struct Variant {
    pub id: &'static str,
    pub label: &'static str,
}

/// Whether the viewer may step backwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Navigation {
    #[default]
    Bidirectional,
    ForwardOnly,
}

/// Data table for one algorithm
#[derive(Clone)]
pub struct Descriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub rules: Vec<LineRule>,
    pub entry: Entry,
    pub initial: Environment,
    pub required: Vec<&'static str>,
    pub presets: Vec<Preset>,
    pub variants: Vec<Variant>,
    pub default_variant: Option<&'static str>,
    pub navigation: Navigation,
    /// Global that receives the outermost procedure's return value
    pub result: Option<&'static str>,
}

impl Descriptor {
    pub fn new(id: &'static str, title: &'static str, entry: Entry) -> Self {
        Descriptor {
            id,
            title,
            rules: Vec::new(),
            entry,
            initial: Environment::new(),
            required: Vec::new(),
            presets: Vec::new(),
            variants: Vec::new(),
            default_variant: None,
            navigation: Navigation::Bidirectional,
            result: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule for 1-based `line`
    pub fn rule(&self, line: usize) -> Option<&LineRule> {
        line.checked_sub(1).and_then(|index| self.rules.get(index))
    }

    /// Displayed pseudocode, one entry per line
    pub fn program(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.text)
    }

    pub fn preset(&self, label: &str) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.label == label)
    }

    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.id == id)
    }

    /// Whether any line pushes a frame
    pub fn uses_calls(&self) -> bool {
        self.rules
            .iter()
            .any(|rule| matches!(rule.flow, Flow::Call { .. }))
    }

    /// Required keys not set in `bindings`
    pub fn missing(&self, bindings: &Environment) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|key| !bindings.value(key).is_set())
            .collect()
    }

    /// Check that every transfer target exists and every required key can be
    /// supplied.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let len = self.len();
        if len == 0 {
            return Err(DescriptorError::EmptyProgram { id: self.id });
        }
        let in_range = |line: usize| (1..=len).contains(&line);

        if !in_range(self.entry.line) {
            return Err(DescriptorError::TargetOutOfRange {
                id: self.id,
                line: 0,
                target: self.entry.line,
            });
        }
        for (index, rule) in self.rules.iter().enumerate() {
            for target in rule.targets() {
                if target != PAST_END && !in_range(target) {
                    return Err(DescriptorError::TargetOutOfRange {
                        id: self.id,
                        line: index + 1,
                        target,
                    });
                }
            }
        }

        for param in self.entry.params {
            if !self.initial.contains(param) {
                return Err(DescriptorError::UnknownParam {
                    id: self.id,
                    name: param,
                });
            }
        }

        for key in &self.required {
            let in_initial = self.initial.contains(key);
            let in_presets =
                !self.presets.is_empty() && self.presets.iter().all(|p| p.values.contains(key));
            if !in_initial && !in_presets {
                return Err(DescriptorError::UnsatisfiableKey {
                    id: self.id,
                    key,
                });
            }
        }

        if let Some(default) = self.default_variant {
            if self.variant(default).is_none() {
                return Err(DescriptorError::UnknownVariant {
                    id: self.id,
                    variant: default,
                });
            }
        }
        Ok(())
    }
}

/// Authoring mistakes caught when the library is built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("{id}: program has no lines")]
    EmptyProgram { id: &'static str },

    #[error("{id}: line {line} transfers to line {target}, which does not exist")]
    TargetOutOfRange {
        id: &'static str,
        line: usize,
        target: usize,
    },

    #[error("{id}: required key '{key}' is neither initial nor in every preset")]
    UnsatisfiableKey { id: &'static str, key: &'static str },

    #[error("{id}: entry parameter '{name}' has no initial binding")]
    UnknownParam { id: &'static str, name: &'static str },

    #[error("{id}: default variant '{variant}' is not declared")]
    UnknownVariant {
        id: &'static str,
        variant: &'static str,
    },

    #[error("algorithm id '{id}' is registered twice")]
    DuplicateId { id: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Entry {
        Entry {
            procedure: "main",
            line: 1,
            params: &[],
        }
    }

    #[test]
    fn test_validate_accepts_past_end() {
        let mut descriptor = Descriptor::new("ok", "ok", entry());
        descriptor.rules = vec![
            LineRule::new("a").branch(|_| true, 2, PAST_END),
            LineRule::new("b").goto(1),
        ];
        assert_eq!(descriptor.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_target() {
        let mut descriptor = Descriptor::new("bad", "bad", entry());
        descriptor.rules = vec![LineRule::new("a").goto(5)];
        assert_eq!(
            descriptor.validate(),
            Err(DescriptorError::TargetOutOfRange {
                id: "bad",
                line: 1,
                target: 5
            })
        );
    }

    #[test]
    fn test_validate_rejects_unsatisfiable_key() {
        let mut descriptor = Descriptor::new("keys", "keys", entry());
        descriptor.rules = vec![LineRule::new("a")];
        descriptor.required = vec!["num"];
        descriptor.presets = vec![
            Preset::new("one", [("num", Value::Int(1))]),
            Preset::new("two", [("other", Value::Int(2))]),
        ];
        assert!(matches!(
            descriptor.validate(),
            Err(DescriptorError::UnsatisfiableKey { key: "num", .. })
        ));

        descriptor.initial.set("num", Value::Unset);
        assert_eq!(descriptor.validate(), Ok(()));
    }

    #[test]
    fn test_missing_reports_unset_keys() {
        let mut descriptor = Descriptor::new("m", "m", entry());
        descriptor.required = vec!["a", "b"];
        let bindings: Environment = [("a", Value::Int(1)), ("b", Value::Unset)]
            .into_iter()
            .collect();
        assert_eq!(descriptor.missing(&bindings), vec!["b"]);
    }
}
