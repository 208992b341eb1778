//! Per-line observation hook
//!
//! The interpreter calls [`LineObserver::on_line`] before each statement that
//! starts a physical line, and before every loop-header and `elif` test. The
//! observer sees the bindings of the active scope and decides whether
//! execution may continue.

use crate::interpreter::object::Object;
use crate::memory::Environment;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// Which source text a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceUnit {
    /// The program being traced
    User,
    /// Library functions written in the scripting language
    Prelude,
}

impl SourceUnit {
    /// File name shown in tracebacks
    pub fn file_name(self) -> &'static str {
        match self {
            SourceUnit::User => "<string>",
            SourceUnit::Prelude => "<prelude>",
        }
    }
}

/// What the observer wants the interpreter to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Halt,
}

/// A line about to execute, with read access to the active scope
pub struct LineEvent<'a> {
    pub unit: SourceUnit,
    pub line: usize,
    /// Number of active function frames
    pub depth: usize,
    pub(crate) bindings: &'a IndexMap<String, Object>,
    pub(crate) hidden: Option<&'a FxHashSet<String>>,
}

impl<'a> LineEvent<'a> {
    /// Names visible to the user: dunder names and untouched library
    /// definitions are excluded
    pub fn visible(&self) -> impl Iterator<Item = (&'a String, &'a Object)> {
        let bindings = self.bindings;
        let hidden = self.hidden;
        bindings.iter().filter(move |(name, object)| {
            !(name.starts_with("__") && name.ends_with("__"))
                && !is_library_binding(hidden, name, object)
        })
    }

    /// Owned copy of the visible bindings
    pub fn snapshot(&self) -> Environment {
        self.visible()
            .map(|(name, object)| (name.clone(), object.snapshot()))
            .collect::<Environment>()
    }
}

/// A library name still bound to the library's own function. Rebinding the
/// name in user code makes it an ordinary variable again.
fn is_library_binding(hidden: Option<&FxHashSet<String>>, name: &str, object: &Object) -> bool {
    match object {
        Object::Function(function) => {
            function.unit == SourceUnit::Prelude
                && function.name() == name
                && hidden.is_some_and(|names| names.contains(name))
        }
        _ => false,
    }
}

/// Hook invoked by the interpreter once per executed line
pub trait LineObserver {
    fn on_line(&mut self, event: &LineEvent<'_>) -> Control;
}
