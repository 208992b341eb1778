//! Procedure frames for descriptors that call other procedures

use crate::machine::descriptor::Resume;
use crate::memory::{Environment, Value};

/// One active procedure invocation
#[derive(Clone)]
pub struct Frame {
    pub procedure: &'static str,
    /// Line this frame executes next
    pub pc: usize,
    pub locals: Environment,
    /// Set on the caller while a callee is running
    pub resume: Option<Resume>,
}

impl Frame {
    pub fn new(procedure: &'static str, pc: usize, locals: Environment) -> Self {
        Frame {
            procedure,
            pc,
            locals,
            resume: None,
        }
    }

    /// Record shown inside the `callStack` variable
    fn to_value(&self) -> Value {
        let mut fields = vec![
            ("procedure".to_string(), Value::str(self.procedure)),
            ("line".to_string(), Value::Int(self.pc as i64)),
        ];
        fields.extend(
            self.locals
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        Value::record(fields)
    }
}

/// Explicit call stack; the last frame is the one executing
#[derive(Clone, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        FrameStack { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames outermost first, as a list of records
    pub fn to_value(&self) -> Value {
        Value::List(self.frames.iter().map(Frame::to_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_value_lists_outermost_first() {
        let mut stack = FrameStack::new();
        stack.push(Frame::new("order", 6, [("n", Value::Int(1))].into_iter().collect()));
        stack.push(Frame::new("order", 5, [("n", Value::Int(2))].into_iter().collect()));

        let Value::List(frames) = stack.to_value() else {
            panic!("expected a list");
        };
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].field("n"), Some(Value::Int(1)));
        assert_eq!(frames[1].field("line"), Some(Value::Int(5)));
        assert_eq!(frames[1].field("procedure"), Some(Value::str("order")));
    }
}
